mod annotate;
mod document;
pub mod font;
pub mod geometry;
pub mod layout;
pub mod overlay;

pub use annotate::Annotator;
pub use document::SourceDocument;
pub use font::{StampFont, TrueTypeFont};
pub use geometry::{PageGeometry, Rotation};
pub use layout::{PageLayout, PageSlot};
pub use overlay::{OverlayRenderer, import_overlay, stamp_page};
