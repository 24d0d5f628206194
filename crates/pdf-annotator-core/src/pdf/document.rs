use std::sync::Arc;

use lopdf::Document;

use super::geometry::PageGeometry;
use crate::error::{Error, Result};

/// An uploaded PDF, validated once and reopened for each name.
pub struct SourceDocument {
    /// The raw PDF bytes, reparsed for every stamped copy
    bytes: Arc<Vec<u8>>,
    /// Geometry of each page, in page order
    geometries: Vec<PageGeometry>,
    /// MD5 hex of the bytes, for correlating log lines
    content_id: String,
}

impl SourceDocument {
    /// Open a PDF from bytes.
    ///
    /// Fails if the bytes do not parse or the document has no pages.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let doc = Document::load_mem(&bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        let geometries = doc
            .get_pages()
            .into_values()
            .map(|page_id| PageGeometry::from_page(&doc, page_id))
            .collect::<Result<Vec<_>>>()?;

        if geometries.is_empty() {
            return Err(Error::PdfNoPages);
        }

        let content_id = format!("{:x}", md5::compute(&bytes));

        Ok(Self {
            bytes: Arc::new(bytes),
            geometries,
            content_id,
        })
    }

    /// Get number of pages
    pub fn page_count(&self) -> usize {
        self.geometries.len()
    }

    /// Geometry of page `page_num` (0-indexed).
    pub fn geometry(&self, page_num: usize) -> Result<PageGeometry> {
        self.geometries
            .get(page_num)
            .copied()
            .ok_or(Error::PdfInvalidPage {
                page: page_num,
                total: self.geometries.len(),
            })
    }

    /// Parse a fresh, unmodified copy of the document.
    pub fn reopen(&self) -> Result<Document> {
        Document::load_mem(&self.bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to reopen document: {e}")))
    }

    /// MD5 hex digest of the document bytes.
    pub fn content_id(&self) -> &str {
        &self.content_id
    }
}

impl Clone for SourceDocument {
    /// Only the `Arc` to the bytes is cloned, not the bytes themselves.
    fn clone(&self) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            geometries: self.geometries.clone(),
            content_id: self.content_id.clone(),
        }
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("page_count", &self.page_count())
            .field("content_id", &self.content_id)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::geometry::Rotation;
    use lopdf::{Dictionary, Object};

    fn pdf_with_rotations(rotations: &[i64]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = rotations
            .iter()
            .map(|&rotate| {
                Object::Reference(doc.add_object(Dictionary::from_iter([
                    ("Type", Object::Name(b"Page".to_vec())),
                    ("Parent", Object::Reference(pages_id)),
                    ("MediaBox", Object::Array(vec![0.into(), 0.into(), 300.into(), 400.into()])),
                    ("Rotate", Object::Integer(rotate)),
                ])))
            })
            .collect();
        let count = i64::try_from(kids.len()).unwrap();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count)),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap();
        output
    }

    #[test]
    fn test_from_bytes_reads_geometry() {
        let doc = SourceDocument::from_bytes(pdf_with_rotations(&[0, 90, 270])).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.geometry(1).unwrap().rotation, Rotation::Deg90);
        assert_eq!(doc.geometry(2).unwrap().rotation, Rotation::Deg270);
        assert_eq!(doc.geometry(0).unwrap().media_box, [0.0, 0.0, 300.0, 400.0]);
    }

    #[test]
    fn test_geometry_out_of_range() {
        let doc = SourceDocument::from_bytes(pdf_with_rotations(&[0])).unwrap();
        let err = doc.geometry(1).unwrap_err();
        assert!(matches!(err, Error::PdfInvalidPage { page: 1, total: 1 }));
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = SourceDocument::from_bytes(b"hello, not a pdf".to_vec()).unwrap_err();
        assert!(matches!(err, Error::PdfOpen(_)));
    }

    #[test]
    fn test_rejects_empty_document() {
        let err = SourceDocument::from_bytes(pdf_with_rotations(&[])).unwrap_err();
        assert!(matches!(err, Error::PdfNoPages));
    }

    #[test]
    fn test_reopen_is_independent() {
        let doc = SourceDocument::from_bytes(pdf_with_rotations(&[0, 0])).unwrap();
        let mut first = doc.reopen().unwrap();
        first.delete_pages(&[1]);
        let second = doc.reopen().unwrap();
        assert_eq!(first.get_pages().len(), 1);
        assert_eq!(second.get_pages().len(), 2);
    }

    #[test]
    fn test_content_id_is_stable() {
        let bytes = pdf_with_rotations(&[0]);
        let a = SourceDocument::from_bytes(bytes.clone()).unwrap();
        let b = SourceDocument::from_bytes(bytes).unwrap();
        assert_eq!(a.content_id(), b.content_id());
        assert_eq!(a.content_id().len(), 32);
    }
}
