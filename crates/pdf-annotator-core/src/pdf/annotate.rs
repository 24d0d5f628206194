//! Batch annotation: one stamped copy of the source per name, assembled
//! into a single document in layout order.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use super::document::SourceDocument;
use super::font::share_font_programs;
use super::geometry::{PageGeometry, flatten_inherited};
use super::layout::{PageLayout, PageSlot};
use super::overlay::{OverlayRenderer, import_overlay, stamp_page};
use crate::config::StampStyle;
use crate::error::{Error, Result};
use crate::names::NameList;
use crate::util::pdf_int;

/// Stamps names onto copies of a source document.
#[derive(Debug, Clone)]
pub struct Annotator {
    renderer: OverlayRenderer,
}

/// The source document stamped with one name.
struct StampedCopy {
    doc: Document,
}

impl Annotator {
    pub const fn new(renderer: OverlayRenderer) -> Self {
        Self { renderer }
    }

    /// Create an annotator, loading the font configured in `style`.
    pub fn from_style(style: StampStyle) -> Result<Self> {
        OverlayRenderer::from_style(style).map(Self::new)
    }

    pub const fn renderer(&self) -> &OverlayRenderer {
        &self.renderer
    }

    /// Stamp every name onto every page and return the assembled PDF.
    pub fn annotate(
        &self,
        source: &SourceDocument,
        names: &NameList,
        layout: PageLayout,
    ) -> Result<Vec<u8>> {
        if names.is_empty() {
            return Err(Error::NoNames);
        }

        let page_count = source.page_count();
        info!(
            "Annotating {} ({} pages) with {} names, layout {}: {} output pages",
            source.content_id(),
            page_count,
            names.len(),
            layout,
            layout.output_page_count(page_count, names.len())
        );

        let copies = names
            .iter()
            .map(|name| self.stamp_copy(source, name))
            .collect::<Result<Vec<_>>>()?;

        let slots = layout.plan(page_count, names.len());
        let output = assemble(copies, &slots)?;

        info!(
            "Assembled {} pages ({} bytes) for {}",
            slots.len(),
            output.len(),
            source.content_id()
        );

        Ok(output)
    }

    /// Reopen the source and stamp `name` onto each of its pages.
    fn stamp_copy(&self, source: &SourceDocument, name: &str) -> Result<StampedCopy> {
        let mut doc = source.reopen()?;
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        // One overlay per distinct page geometry; usually a single one.
        let mut forms: Vec<(PageGeometry, ObjectId)> = Vec::new();

        for (index, page_id) in page_ids.into_iter().enumerate() {
            flatten_inherited(&mut doc, page_id)?;
            let geometry = source.geometry(index)?;

            let form_id = if let Some((_, id)) = forms.iter().find(|(g, _)| *g == geometry) {
                *id
            } else {
                let overlay = self.renderer.render(name, &geometry)?;
                let id = import_overlay(&mut doc, &overlay)?;
                forms.push((geometry, id));
                id
            };

            stamp_page(&mut doc, page_id, form_id)?;
        }

        debug!("Stamped {:?} with {} overlay(s)", name, forms.len());
        Ok(StampedCopy { doc })
    }
}

/// Merge the stamped copies into one document with pages in `slots` order.
fn assemble(copies: Vec<StampedCopy>, slots: &[PageSlot]) -> Result<Vec<u8>> {
    let mut document = Document::with_version("1.5");
    let mut max_id: u32 = 1;
    let mut copy_pages: Vec<Vec<ObjectId>> = Vec::with_capacity(copies.len());

    for StampedCopy { mut doc } in copies {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        copy_pages.push(doc.get_pages().into_values().collect());

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Outlines" | b"Outline" => {}
                _ => {
                    document.objects.insert(object_id, object);
                }
            }
        }
    }

    document.max_id = max_id - 1;
    let pages_id = document.new_object_id();

    let mut kids = Vec::with_capacity(slots.len());
    let mut previous: Option<ObjectId> = None;

    for slot in slots {
        let page_id = match *slot {
            PageSlot::Stamped { name, page } => {
                let page_id = copy_pages
                    .get(name)
                    .and_then(|pages| pages.get(page))
                    .copied()
                    .ok_or_else(|| {
                        Error::PdfOverlay(format!("No stamped copy for name {name} page {page}"))
                    })?;
                set_parent(&mut document, page_id, pages_id)?;
                page_id
            }
            PageSlot::Blank { .. } => {
                let media_box = previous
                    .and_then(|id| document.get_dictionary(id).ok())
                    .and_then(|page| page.get(b"MediaBox").ok().cloned())
                    .unwrap_or_else(|| PageGeometry::default().media_box_object());
                document.add_object(Dictionary::from_iter([
                    ("Type", Object::Name(b"Page".to_vec())),
                    ("Parent", Object::Reference(pages_id)),
                    ("MediaBox", media_box),
                    ("Resources", Object::Dictionary(Dictionary::new())),
                ]))
            }
        };
        previous = Some(page_id);
        kids.push(Object::Reference(page_id));
    }

    let count = pdf_int(kids.len());
    document.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = document.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    document.trailer.set("Root", Object::Reference(catalog_id));

    let shared = share_font_programs(&mut document);
    if shared > 0 {
        debug!("Dropped {} duplicate font programs", shared);
    }

    document.compress();

    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save annotated PDF: {e}")))?;

    Ok(output)
}

fn set_parent(document: &mut Document, page_id: ObjectId, pages_id: ObjectId) -> Result<()> {
    let page = document
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::Lopdf(format!("Failed to get page {page_id:?}: {e}")))?;
    page.set("Parent", Object::Reference(pages_id));
    Ok(())
}
