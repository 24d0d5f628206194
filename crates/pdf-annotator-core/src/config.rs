use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;
use crate::pdf::PageLayout;

/// Fill color for the stamped name
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Components clamped to the 0.0-1.0 range PDF colour operators expect.
    pub fn clamped(&self) -> (f32, f32, f32) {
        (
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::black()
    }
}

/// How the name is drawn on each page.
///
/// Offsets are measured from the top-right corner of the page as the reader
/// sees it (after `/Rotate` is applied). The text is right-aligned on the
/// anchor point and its baseline sits on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampStyle {
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default = "default_offset")]
    pub right_offset: f32,

    #[serde(default = "default_offset")]
    pub top_offset: f32,

    #[serde(default)]
    pub text_color: TextColor,

    /// TrueType font to embed instead of the built-in Helvetica
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

const fn default_font_size() -> f32 {
    15.0
}

const fn default_offset() -> f32 {
    40.0
}

impl Default for StampStyle {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            right_offset: default_offset(),
            top_offset: default_offset(),
            text_color: TextColor::default(),
            font_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Layout preselected in the form
    #[serde(default)]
    pub default_layout: PageLayout,

    /// Maximum upload size in megabytes
    #[serde(default = "default_upload_limit_mb")]
    pub upload_limit_mb: usize,

    /// Stamp appearance
    #[serde(default)]
    pub stamp: StampStyle,
}

const fn default_upload_limit_mb() -> usize {
    50
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_layout: PageLayout::default(),
            upload_limit_mb: default_upload_limit_mb(),
            stamp: StampStyle::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-annotator/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-annotator").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values that would produce an unreadable or off-page stamp.
    pub fn validate(&self) -> Result<(), Error> {
        let stamp = &self.stamp;

        if !(stamp.font_size.is_finite() && stamp.font_size > 0.0) {
            return Err(Error::ConfigInvalid {
                field: "stamp.font_size".to_string(),
                reason: format!("must be positive, got {}", stamp.font_size),
            });
        }

        for (field, value) in [
            ("stamp.right_offset", stamp.right_offset),
            ("stamp.top_offset", stamp.top_offset),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::ConfigInvalid {
                    field: field.to_string(),
                    reason: format!("must not be negative, got {value}"),
                });
            }
        }

        if self.upload_limit_mb == 0 {
            return Err(Error::ConfigInvalid {
                field: "upload_limit_mb".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Upload limit in bytes, for the web layer's body limit.
    pub const fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// A layout option for the form's radio group
#[derive(Debug, Clone)]
pub struct LayoutOption {
    /// Value submitted by the form (1 or 2)
    pub value: u8,
    /// Short label
    pub label: &'static str,
    /// When to pick this layout
    pub hint: &'static str,
}

/// Layouts offered by the form, in display order.
pub fn layout_options() -> Vec<LayoutOption> {
    PageLayout::ALL
        .iter()
        .map(|layout| LayoutOption {
            value: layout.id(),
            label: layout.label(),
            hint: layout.hint(),
        })
        .collect()
}
