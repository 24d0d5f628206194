//! Page size and orientation.
//!
//! # Coordinate System
//!
//! PDF user space has its origin at the bottom-left of the media box with
//! Y increasing upward. A page's `/Rotate` entry turns the page clockwise for
//! display, so "top-right corner" depends on the rotation. Stamps are laid
//! out in the *displayed* frame (what the reader sees, origin bottom-left,
//! width and height swapped for quarter turns) and mapped back to user space
//! with [`PageGeometry::display_transform`].

use lopdf::{Document, Object, ObjectId};
use tracing::warn;

use crate::error::{Error, Result};

/// US Letter, used when a page declares no media box anywhere in its tree.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page attributes that may be inherited from ancestor `Pages` nodes.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Limit on `Parent` hops, against malformed trees with cycles.
const MAX_TREE_DEPTH: usize = 32;

/// Clockwise display rotation of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalise a `/Rotate` value. Returns `None` unless it is a multiple of 90.
    pub const fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    const fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Media box and rotation of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// `[llx, lly, urx, ury]`, normalised so that `llx <= urx` and `lly <= ury`.
    pub media_box: [f32; 4],
    pub rotation: Rotation,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            media_box: DEFAULT_MEDIA_BOX,
            rotation: Rotation::Deg0,
        }
    }
}

impl PageGeometry {
    pub fn new(media_box: [f32; 4], rotation: Rotation) -> Self {
        let [x0, y0, x1, y1] = media_box;
        Self {
            media_box: [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)],
            rotation,
        }
    }

    /// Read the geometry of `page_id`, following inherited attributes.
    pub fn from_page(doc: &Document, page_id: ObjectId) -> Result<Self> {
        let media_box = inherited_attribute(doc, page_id, b"MediaBox")?
            .and_then(|obj| rect(doc, obj))
            .unwrap_or(DEFAULT_MEDIA_BOX);

        let rotation = match inherited_attribute(doc, page_id, b"Rotate")? {
            Some(obj) => match resolve(doc, obj).and_then(|o| o.as_i64().ok()) {
                Some(degrees) => Rotation::from_degrees(degrees).unwrap_or_else(|| {
                    warn!("Page {:?} has unsupported /Rotate {}, using 0", page_id, degrees);
                    Rotation::Deg0
                }),
                None => Rotation::Deg0,
            },
            None => Rotation::Deg0,
        };

        Ok(Self::new(media_box, rotation))
    }

    /// Media box width in user space.
    pub fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    /// Media box height in user space.
    pub fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }

    /// Width and height as the reader sees the page.
    pub fn display_size(&self) -> (f32, f32) {
        if self.rotation.is_quarter_turn() {
            (self.height(), self.width())
        } else {
            (self.width(), self.height())
        }
    }

    /// `cm` operands mapping the displayed frame onto user space.
    pub fn display_transform(&self) -> [f32; 6] {
        let [llx, lly, urx, ury] = self.media_box;
        match self.rotation {
            Rotation::Deg0 => [1.0, 0.0, 0.0, 1.0, llx, lly],
            Rotation::Deg90 => [0.0, 1.0, -1.0, 0.0, urx, lly],
            Rotation::Deg180 => [-1.0, 0.0, 0.0, -1.0, urx, ury],
            Rotation::Deg270 => [0.0, -1.0, 1.0, 0.0, llx, ury],
        }
    }

    /// Media box as PDF array operands.
    pub fn media_box_object(&self) -> Object {
        Object::Array(self.media_box.iter().map(|&v| Object::Real(v)).collect())
    }
}

/// Copy inheritable attributes from ancestor `Pages` nodes onto the page.
///
/// Needed before a page is moved under a new page tree, where the old
/// ancestors no longer apply.
pub fn flatten_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    {
        let page = page_dict(doc, page_id)?;
        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(doc, page_id, key)? {
                inherited.push((key, value.clone()));
            }
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::Lopdf(format!("Failed to get page {page_id:?}: {e}")))?;
    for (key, value) in inherited {
        page.set(key, value);
    }

    Ok(())
}

/// Look up `key` on the page, then on each ancestor.
fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut node = page_dict(doc, page_id)?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }
        let Ok(Object::Reference(parent_id)) = node.get(b"Parent") else {
            return Ok(None);
        };
        match doc.get_object(*parent_id).and_then(Object::as_dict) {
            Ok(parent) => node = parent,
            Err(_) => return Ok(None),
        }
    }

    Ok(None)
}

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&lopdf::Dictionary> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| Error::Lopdf(format!("Failed to get page {page_id:?}: {e}")))
}

/// Follow one level of indirection.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn rect(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let Object::Array(arr) = resolve(doc, obj)? else {
        return None;
    };
    if arr.len() != 4 {
        return None;
    }
    let values: Vec<f32> = arr
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(number))
        .collect();
    <[f32; 4]>::try_from(values).ok()
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        #[allow(clippy::cast_precision_loss)]
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
