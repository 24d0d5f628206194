use anyhow::{Context, Result};
use pdf_annotator_core::{Annotator, AppConfig};
use tracing::info;

/// Global application state
///
/// Read-only after startup; requests share it through an `Arc`.
pub struct AppState {
    /// Configuration the server was started with
    pub config: AppConfig,
    /// Annotator with the stamp font already loaded
    pub annotator: Annotator,
}

impl AppState {
    /// Build the state, loading the stamp font once.
    pub fn new(config: AppConfig) -> Result<Self> {
        let annotator = Annotator::from_style(config.stamp.clone())
            .context("Failed to load stamp font")?;

        info!(
            "Stamping with {} at {}pt, default layout {}",
            annotator.renderer().font().name(),
            config.stamp.font_size,
            config.default_layout
        );

        Ok(Self { config, annotator })
    }
}
