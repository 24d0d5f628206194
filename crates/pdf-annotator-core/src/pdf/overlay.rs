//! Name overlays and merging them onto pages.
//!
//! # Overlay Strategy
//!
//! 1. Render the name into a standalone one-page document whose media box
//!    matches the target page. The text is positioned in the page's displayed
//!    frame and a `cm` maps it back onto the unrotated media box, so it reads
//!    upright once the viewer applies `/Rotate`.
//! 2. Import that page into the target document as a Form XObject.
//! 3. On each target page, wrap the existing content in `q … Q` (so any
//!    unbalanced graphics state cannot leak) and append `q /StampN Do Q`.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use super::font::StampFont;
use super::geometry::PageGeometry;
use crate::config::StampStyle;
use crate::error::{Error, Result};

/// Resource name of the stamp font inside the overlay page.
const FONT_RESOURCE: &str = "FStamp";

/// Prefix for the XObject resource name on stamped pages.
const XOBJECT_PREFIX: &str = "Stamp";

/// Renders a name into a single-page overlay document.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: StampStyle,
    font: StampFont,
}

impl OverlayRenderer {
    pub const fn new(style: StampStyle, font: StampFont) -> Self {
        Self { style, font }
    }

    /// Create a renderer, loading the font named by `style.font_path`.
    pub fn from_style(style: StampStyle) -> Result<Self> {
        let font = StampFont::load(style.font_path.as_deref())?;
        Ok(Self::new(style, font))
    }

    pub const fn font(&self) -> &StampFont {
        &self.font
    }

    /// Start point of the text in the displayed frame.
    ///
    /// The text ends `right_offset` points left of the right edge and its
    /// baseline sits `top_offset` points below the top edge.
    pub fn anchor(&self, text: &str, geometry: &PageGeometry) -> (f32, f32) {
        let (width, height) = geometry.display_size();
        let text_width = self.font.string_width(text, self.style.font_size);
        (
            width - self.style.right_offset - text_width,
            height - self.style.top_offset,
        )
    }

    /// Content stream drawing `text` for a page with `geometry`.
    pub fn content(&self, text: &str, geometry: &PageGeometry) -> Content {
        let [a, b, c, d, e, f] = geometry.display_transform();
        let (x, y) = self.anchor(text, geometry);
        let (r, g, bl) = self.style.text_color.clamped();

        Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![a.into(), b.into(), c.into(), d.into(), e.into(), f.into()],
                ),
                Operation::new("rg", vec![r.into(), g.into(), bl.into()]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), self.style.font_size.into()],
                ),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new("Tj", vec![self.font.encode(text)]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        }
    }

    /// Render `text` as a one-page document sized to `geometry`.
    pub fn render(&self, text: &str, geometry: &PageGeometry) -> Result<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = self.font.install(&mut doc, text)?;

        let content_bytes = self
            .content(text, geometry)
            .encode()
            .map_err(|e| Error::PdfOverlay(format!("Failed to encode overlay content: {e}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let resources = Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(FONT_RESOURCE, Object::Reference(font_id))])),
        )]);

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", geometry.media_box_object()),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));

        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        debug!(
            "Rendered overlay for {:?} ({}x{} rotate {})",
            text,
            geometry.width(),
            geometry.height(),
            geometry.rotation.degrees()
        );

        Ok(doc)
    }
}

/// Import the overlay's page into `target` as a Form XObject.
///
/// Returns the XObject id, which can be stamped onto any number of pages.
pub fn import_overlay(target: &mut Document, overlay: &Document) -> Result<ObjectId> {
    let mut overlay = overlay.clone();
    overlay.renumber_objects_with(target.max_id + 1);

    let page_id = overlay
        .get_pages()
        .into_values()
        .next()
        .ok_or_else(|| Error::PdfOverlay("Overlay has no page".to_string()))?;

    let content = overlay
        .get_page_content(page_id)
        .map_err(|e| Error::PdfOverlay(format!("Failed to read overlay content: {e}")))?;
    let content_ids = overlay.get_page_contents(page_id);

    let page = overlay
        .get_dictionary(page_id)
        .map_err(|e| Error::PdfOverlay(format!("Failed to get overlay page: {e}")))?;
    let resources = resolve_dict(&overlay, page.get(b"Resources").ok()).unwrap_or_default();
    let bbox = page
        .get(b"MediaBox")
        .cloned()
        .unwrap_or_else(|_| PageGeometry::default().media_box_object());

    let max_id = overlay.max_id;
    for (object_id, object) in overlay.objects {
        if content_ids.contains(&object_id) {
            continue;
        }
        match object.type_name().unwrap_or(b"") {
            b"Catalog" | b"Pages" | b"Page" => {}
            _ => {
                target.objects.insert(object_id, object);
            }
        }
    }
    target.max_id = target.max_id.max(max_id);

    let form = Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Form".to_vec())),
        ("FormType", Object::Integer(1)),
        ("BBox", bbox),
        ("Resources", Object::Dictionary(resources)),
    ]);

    Ok(target.add_object(Stream::new(form, content)))
}

/// Draw the Form XObject `form_id` on top of the page's existing content.
pub fn stamp_page(doc: &mut Document, page_id: ObjectId, form_id: ObjectId) -> Result<()> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    // Resources may be shared between pages or indirect; the page gets its own copy.
    let mut resources = resolve_dict(doc, page.get(b"Resources").ok()).unwrap_or_default();
    let mut xobjects = resolve_dict(doc, resources.get(b"XObject").ok()).unwrap_or_default();
    let existing_contents = page.get(b"Contents").ok().cloned();

    let name = (0..)
        .map(|i| format!("{XOBJECT_PREFIX}{i}"))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| XOBJECT_PREFIX.to_string());

    xobjects.set(name.as_bytes(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let stamp_id = doc.add_object(Stream::new(
        Dictionary::new(),
        format!("Q\nq /{name} Do Q\n").into_bytes(),
    ));

    let mut contents = vec![Object::Reference(open_id)];
    contents.extend(content_streams(doc, existing_contents));
    contents.push(Object::Reference(stamp_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));

    Ok(())
}

/// Flatten a page's `/Contents` into stream references.
///
/// `/Contents` is a stream reference, an array of them, or a reference to
/// such an array.
fn content_streams(doc: &Document, contents: Option<Object>) -> Vec<Object> {
    match contents {
        Some(Object::Array(arr)) => arr,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(_) => vec![Object::Reference(id)],
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Resolve an object that should be a dictionary, following a reference.
fn resolve_dict(doc: &Document, obj: Option<&Object>) -> Option<Dictionary> {
    match obj? {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}
