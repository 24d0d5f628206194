use thiserror::Error;

/// Unified error type for pdf-annotator-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - PDF operations (opening, merging, saving)
/// - Input problems (layout selector, empty name list)
/// - Stamp font loading and encoding
/// - Configuration operations (loading, validation)
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// The PDF parsed but contains no pages
    #[error("PDF has no pages")]
    PdfNoPages,

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to create or merge a name overlay
    #[error("failed to create PDF overlay: {0}")]
    PdfOverlay(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Input Errors
    // ==========================================================================
    /// Layout selector other than 1 (round robin) or 2 (grouped)
    #[error("invalid layout option: {0}")]
    InvalidLayout(String),

    /// No names to stamp
    #[error("name list is empty")]
    NoNames,

    // ==========================================================================
    // Font Errors
    // ==========================================================================
    /// Failed to load or parse the stamp font
    #[error("failed to load font: {0}")]
    FontLoad(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },
}

impl Error {
    /// Whether the error was caused by the uploaded document or form input
    /// rather than by the server.
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::PdfOpen(_) | Self::PdfNoPages | Self::InvalidLayout(_) | Self::NoNames
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
