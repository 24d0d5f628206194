//! PDF Annotator Core Library
//!
//! Stamps a list of names onto copies of every page of a PDF:
//! - Source document loading and page geometry
//! - Name overlays (Helvetica or an embedded TrueType font)
//! - Merging overlays onto pages
//! - Round-robin and grouped page layouts

pub mod config;
pub mod error;
pub mod names;
pub mod pdf;
pub mod util;

pub use config::{AppConfig, LayoutOption, StampStyle, TextColor, layout_options};
pub use error::{Error, Result};
pub use names::NameList;
pub use pdf::{
    Annotator, OverlayRenderer, PageGeometry, PageLayout, PageSlot, Rotation, SourceDocument,
    StampFont,
};

/// Convenience function: parse `pdf_bytes`, stamp `names` and return the result.
///
/// Loads the font named by `style.font_path` on every call; long-running
/// callers should build an [`Annotator`] once instead.
pub fn annotate_pdf(
    pdf_bytes: impl Into<Vec<u8>>,
    names: &NameList,
    layout: PageLayout,
    style: &StampStyle,
) -> Result<Vec<u8>> {
    if names.is_empty() {
        return Err(Error::NoNames);
    }
    let source = SourceDocument::from_bytes(pdf_bytes)?;
    Annotator::from_style(style.clone())?.annotate(&source, names, layout)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_layout, PageLayout::RoundRobin);
        assert_eq!(config.upload_limit_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_annotate_pdf_checks_names_first() {
        // Names are checked before the bytes are parsed
        let err = annotate_pdf(
            b"not a pdf".to_vec(),
            &NameList::default(),
            PageLayout::Grouped,
            &StampStyle::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoNames));
    }
}
