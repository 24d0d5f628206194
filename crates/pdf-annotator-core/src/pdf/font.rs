//! Fonts for the name stamp.
//!
//! Two options:
//! - **Helvetica** (default): one of the PDF base-14 fonts, so nothing is
//!   embedded. Text is encoded as WinAnsi; widths come from the standard AFM
//!   metrics so the stamp can be right-aligned.
//! - **TrueType**: a font file loaded at startup and embedded as a composite
//!   font, for names outside Latin-1.
//!
//! # Embedded Font Structure
//!
//! - **Type0 font** with Identity-H encoding, referencing:
//!   - **CIDFontType2**: glyph widths (`W`) and a reference to:
//!     - **FontDescriptor** and **FontFile2** (the TrueType program)
//!   - **ToUnicode CMap**: glyph IDs back to Unicode for copy/paste

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{Face, GlyphId};

use crate::error::{Error, Result};

/// Byte used for characters WinAnsi cannot represent.
const WIN_ANSI_FALLBACK: u8 = b'?';

/// Helvetica widths (1/1000 em) for codes 32..=126.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica widths (1/1000 em) for codes 160..=255.
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// Font used to draw the stamp.
#[derive(Debug, Clone, Default)]
pub enum StampFont {
    #[default]
    Helvetica,
    TrueType(TrueTypeFont),
}

impl StampFont {
    /// Built-in Helvetica, or the TrueType font at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => TrueTypeFont::from_file(path).map(Self::TrueType),
            None => Ok(Self::Helvetica),
        }
    }

    /// Width of `text` in points at `font_size`.
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = match self {
            Self::Helvetica => win_ansi_encode(text)
                .into_iter()
                .map(|b| u32::from(helvetica_width(b)))
                .sum(),
            Self::TrueType(font) => font.text_width_units(text),
        };
        #[allow(clippy::cast_precision_loss)]
        let units = units as f32;
        units * font_size / 1000.0
    }

    /// `Tj` operand for `text` in this font's encoding.
    pub fn encode(&self, text: &str) -> Object {
        match self {
            Self::Helvetica => Object::String(win_ansi_encode(text), StringFormat::Literal),
            Self::TrueType(font) => Object::String(font.glyph_bytes(text), StringFormat::Hexadecimal),
        }
    }

    /// Add the font dictionary (and any embedded data) to `doc`.
    ///
    /// `text` is the string that will be drawn; the embedded font only carries
    /// widths and Unicode mappings for its glyphs.
    pub fn install(&self, doc: &mut Document, text: &str) -> Result<ObjectId> {
        match self {
            Self::Helvetica => Ok(doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(b"Helvetica".to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ]))),
            Self::TrueType(font) => font.embed(doc, text),
        }
    }

    /// `BaseFont` name written into the PDF.
    pub fn name(&self) -> &str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::TrueType(font) => font.base_font(),
        }
    }
}

/// Encode text as WinAnsi (cp1252) bytes.
fn win_ansi_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(c)).unwrap_or(WIN_ANSI_FALLBACK),
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '–' => 0x96,
            '—' => 0x97,
            _ => WIN_ANSI_FALLBACK,
        })
        .collect()
}

fn helvetica_width(code: u8) -> u16 {
    match code {
        32..=126 => HELVETICA_ASCII[usize::from(code - 32)],
        160..=255 => HELVETICA_LATIN1[usize::from(code - 160)],
        0x80 | 0x96 => 556,
        0x91 | 0x92 => 222,
        0x93 | 0x94 => 333,
        0x97 => 1000,
        _ => 278,
    }
}

/// A TrueType font program kept in memory.
#[derive(Clone)]
pub struct TrueTypeFont {
    data: Arc<Vec<u8>>,
    /// PostScript name, used as BaseFont
    base_font: String,
}

impl TrueTypeFont {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::FontLoad(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let base_font = {
            let face = Face::parse(&data, 0)
                .map_err(|e| Error::FontLoad(format!("Failed to parse font: {e}")))?;
            face.names()
                .into_iter()
                .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
                .and_then(|n| n.to_string())
                .map(|n| n.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "StampFont".to_string())
        };

        Ok(Self {
            data: Arc::new(data),
            base_font,
        })
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    /// Parsed once in `from_bytes`, so re-parsing the same bytes succeeds.
    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    fn text_width_units(&self, text: &str) -> u32 {
        let Some(face) = self.face() else {
            return 0;
        };
        let upem = u32::from(face.units_per_em().max(1));
        text.chars()
            .map(|c| {
                let gid = face.glyph_index(c).unwrap_or(GlyphId(0));
                u32::from(face.glyph_hor_advance(gid).unwrap_or(0)) * 1000 / upem
            })
            .sum()
    }

    /// Big-endian glyph IDs, two bytes per character (Identity-H).
    fn glyph_bytes(&self, text: &str) -> Vec<u8> {
        let Some(face) = self.face() else {
            return Vec::new();
        };
        text.chars()
            .flat_map(|c| face.glyph_index(c).map_or(0, |g| g.0).to_be_bytes())
            .collect()
    }

    fn embed(&self, doc: &mut Document, text: &str) -> Result<ObjectId> {
        let face = self
            .face()
            .ok_or_else(|| Error::FontLoad("Font data no longer parses".to_string()))?;
        let upem = i64::from(face.units_per_em().max(1));

        // Glyphs actually drawn, with their width and source character
        let mut used: BTreeMap<u16, (i64, char)> = BTreeMap::new();
        for c in text.chars() {
            let gid = face.glyph_index(c).map_or(0, |g| g.0);
            let advance = i64::from(face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0));
            used.entry(gid).or_insert((advance * 1000 / upem, c));
        }

        let mut file_dict = Dictionary::new();
        file_dict.set("Length1", Object::Integer(i64::try_from(self.data.len()).unwrap_or(i64::MAX)));
        let font_file_id = doc.add_object(Stream::new(file_dict, self.data.to_vec()).with_compression(true));

        let bbox = face.global_bounding_box();
        let descriptor_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(self.base_font.as_bytes().to_vec())),
            ("Flags", Object::Integer(32)),
            (
                "FontBBox",
                Object::Array(vec![
                    Object::Integer(i64::from(bbox.x_min)),
                    Object::Integer(i64::from(bbox.y_min)),
                    Object::Integer(i64::from(bbox.x_max)),
                    Object::Integer(i64::from(bbox.y_max)),
                ]),
            ),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(i64::from(face.ascender()))),
            ("Descent", Object::Integer(i64::from(face.descender()))),
            (
                "CapHeight",
                Object::Integer(i64::from(face.capital_height().unwrap_or_else(|| face.ascender()))),
            ),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference(font_file_id)),
        ]));

        let widths: Vec<Object> = used
            .iter()
            .flat_map(|(&gid, &(width, _))| {
                [
                    Object::Integer(i64::from(gid)),
                    Object::Array(vec![Object::Integer(width)]),
                ]
            })
            .collect();

        let cid_font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(self.base_font.as_bytes().to_vec())),
            (
                "CIDSystemInfo",
                Object::Dictionary(Dictionary::from_iter([
                    ("Registry", Object::string_literal("Adobe")),
                    ("Ordering", Object::string_literal("Identity")),
                    ("Supplement", Object::Integer(0)),
                ])),
            ),
            ("FontDescriptor", Object::Reference(descriptor_id)),
            ("W", Object::Array(widths)),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]));

        let cmap = to_unicode_cmap(used.iter().map(|(&gid, &(_, c))| (gid, c)));
        let to_unicode_id = doc.add_object(Stream::new(Dictionary::new(), cmap.into_bytes()));

        Ok(doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(self.base_font.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ])))
    }
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("base_font", &self.base_font)
            .field("bytes_len", &self.data.len())
            .finish()
    }
}

/// Point every `FontFile2` at a single copy of each distinct font program
/// and drop the duplicates. Returns how many streams were removed.
///
/// Each stamped copy embeds the program again; after the copies are merged
/// they are all byte-identical.
pub(crate) fn share_font_programs(doc: &mut Document) -> usize {
    let descriptors: Vec<(ObjectId, ObjectId)> = doc
        .objects
        .iter()
        .filter(|(_, object)| matches!(object.type_name(), Ok(b"FontDescriptor")))
        .filter_map(|(&id, object)| {
            let file_id = object.as_dict().ok()?.get(b"FontFile2").ok()?.as_reference().ok()?;
            Some((id, file_id))
        })
        .collect();

    let mut by_digest: HashMap<[u8; 16], ObjectId> = HashMap::new();
    let mut shared: HashMap<ObjectId, ObjectId> = HashMap::new();
    for &(_, file_id) in &descriptors {
        if shared.contains_key(&file_id) {
            continue;
        }
        let Ok(stream) = doc.get_object(file_id).and_then(Object::as_stream) else {
            continue;
        };
        let keep = *by_digest
            .entry(md5::compute(&stream.content).0)
            .or_insert(file_id);
        shared.insert(file_id, keep);
    }

    for (descriptor_id, file_id) in descriptors {
        let Some(&keep) = shared.get(&file_id).filter(|&&keep| keep != file_id) else {
            continue;
        };
        if let Ok(descriptor) = doc.get_object_mut(descriptor_id).and_then(Object::as_dict_mut) {
            descriptor.set("FontFile2", Object::Reference(keep));
        }
    }

    let mut removed = 0;
    for (file_id, keep) in shared {
        if file_id != keep && doc.objects.remove(&file_id).is_some() {
            removed += 1;
        }
    }
    removed
}

/// ToUnicode CMap with one `bfchar` entry per glyph.
fn to_unicode_cmap(glyphs: impl Iterator<Item = (u16, char)>) -> String {
    let entries: Vec<(u16, char)> = glyphs.collect();

    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    // bfchar blocks hold at most 100 entries
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for &(gid, c) in chunk {
            let mut utf16 = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut utf16)
                .iter()
                .fold(String::new(), |mut acc, unit| {
                    let _ = write!(acc, "{unit:04X}");
                    acc
                });
            let _ = writeln!(cmap, "<{gid:04X}> <{hex}>");
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_width_of_ascii() {
        let font = StampFont::Helvetica;
        // "Kitty" = K(667) i(222) t(278) t(278) y(500) = 1945
        let width = font.string_width("Kitty", 10.0);
        assert!((width - 19.45).abs() < 1e-3, "{width}");
    }

    #[test]
    fn test_helvetica_accented_matches_base_letter() {
        let font = StampFont::Helvetica;
        assert!((font.string_width("é", 15.0) - font.string_width("e", 15.0)).abs() < f32::EPSILON);
        assert!((font.string_width("Ñ", 15.0) - font.string_width("N", 15.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(win_ansi_encode("Zoë"), vec![b'Z', b'o', 0xEB]);
        assert_eq!(win_ansi_encode("a–b"), vec![b'a', 0x96, b'b']);
        // Vietnamese letters outside cp1252
        assert_eq!(win_ansi_encode("Đ"), vec![WIN_ANSI_FALLBACK]);
    }

    #[test]
    fn test_helvetica_encode_is_literal() {
        let operand = StampFont::Helvetica.encode("Micky");
        assert!(matches!(
            operand,
            Object::String(ref bytes, StringFormat::Literal) if bytes == b"Micky"
        ));
    }

    #[test]
    fn test_helvetica_install() {
        let mut doc = Document::with_version("1.5");
        let id = StampFont::Helvetica.install(&mut doc, "Kitty").unwrap();
        let dict = doc.get_dictionary(id).unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
        assert_eq!(dict.get(b"Encoding").unwrap().as_name().unwrap(), b"WinAnsiEncoding");
    }

    #[test]
    fn test_load_defaults_to_helvetica() {
        assert!(matches!(StampFont::load(None).unwrap(), StampFont::Helvetica));
    }

    #[test]
    fn test_truetype_rejects_garbage() {
        let err = TrueTypeFont::from_bytes(b"definitely not a font".to_vec()).unwrap_err();
        assert!(matches!(err, Error::FontLoad(_)));
    }

    #[test]
    fn test_truetype_missing_file() {
        let err = StampFont::load(Some(Path::new("/nonexistent/font.ttf"))).unwrap_err();
        assert!(matches!(err, Error::FontLoad(_)));
    }

    #[test]
    fn test_to_unicode_cmap_entries() {
        let cmap = to_unicode_cmap([(0x0024, 'A'), (0x01F3, 'Đ')].into_iter());
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<01F3> <0110>"));
    }

    const DEJAVU: &[u8] = include_bytes!("../../tests/fixtures/DejaVuSans-ExtraLight.ttf");

    fn dejavu() -> TrueTypeFont {
        TrueTypeFont::from_bytes(DEJAVU.to_vec()).unwrap()
    }

    #[test]
    fn test_truetype_base_font_from_name_table() {
        assert_eq!(StampFont::TrueType(dejavu()).name(), "DejaVuSansExtraLight");
        assert_eq!(StampFont::Helvetica.name(), "Helvetica");
    }

    #[test]
    fn test_truetype_encode_is_glyph_ids() {
        let face = Face::parse(DEJAVU, 0).unwrap();
        let text = "Văn ễ";
        let expected: Vec<u8> = text
            .chars()
            .flat_map(|c| face.glyph_index(c).unwrap().0.to_be_bytes())
            .collect();

        let operand = StampFont::TrueType(dejavu()).encode(text);
        assert!(matches!(
            operand,
            Object::String(ref bytes, StringFormat::Hexadecimal) if *bytes == expected
        ));
        assert_eq!(expected.len(), text.chars().count() * 2);
    }

    #[test]
    fn test_truetype_width_uses_advances() {
        let font = StampFont::TrueType(dejavu());
        let one = font.string_width("An", 15.0);
        let two = font.string_width("AnAn", 15.0);
        assert!(one > 0.0);
        assert!((two - 2.0 * one).abs() < 1e-3);
    }

    #[test]
    fn test_truetype_embed_structure() {
        let mut doc = Document::with_version("1.5");
        let font_id = StampFont::TrueType(dejavu()).install(&mut doc, "Nguyễn Văn An").unwrap();

        let type0 = doc.get_dictionary(font_id).unwrap();
        assert_eq!(type0.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(type0.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");

        let descendants = type0.get(b"DescendantFonts").unwrap().as_array().unwrap();
        assert_eq!(descendants.len(), 1);
        let cid_font = doc.get_dictionary(descendants[0].as_reference().unwrap()).unwrap();
        assert_eq!(cid_font.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType2");
        assert_eq!(cid_font.get(b"CIDToGIDMap").unwrap().as_name().unwrap(), b"Identity");

        // One (gid [width]) pair per distinct glyph: N g u y ễ n space V ă A
        let widths = cid_font.get(b"W").unwrap().as_array().unwrap();
        assert_eq!(widths.len(), 2 * 10);

        let descriptor_id = cid_font.get(b"FontDescriptor").unwrap().as_reference().unwrap();
        let descriptor = doc.get_dictionary(descriptor_id).unwrap();
        let file_id = descriptor.get(b"FontFile2").unwrap().as_reference().unwrap();
        let program = doc.get_object(file_id).unwrap().as_stream().unwrap();
        assert_eq!(program.content.len(), DEJAVU.len());

        let to_unicode_id = type0.get(b"ToUnicode").unwrap().as_reference().unwrap();
        let cmap = doc.get_object(to_unicode_id).unwrap().as_stream().unwrap();
        let cmap = String::from_utf8(cmap.content.clone()).unwrap();
        assert!(cmap.contains("10 beginbfchar"));
        let gid = Face::parse(DEJAVU, 0).unwrap().glyph_index('ễ').unwrap().0;
        assert!(cmap.contains(&format!("<{gid:04X}> <1EC5>")));
    }

    #[test]
    fn test_share_font_programs() {
        let font = StampFont::TrueType(dejavu());
        let mut doc = Document::with_version("1.5");
        let first = font.install(&mut doc, "Kitty").unwrap();
        let second = font.install(&mut doc, "Micky").unwrap();

        assert_eq!(share_font_programs(&mut doc), 1);

        let program_of = |font_id: ObjectId| {
            let type0 = doc.get_dictionary(font_id).unwrap();
            let cid_id = type0.get(b"DescendantFonts").unwrap().as_array().unwrap()[0]
                .as_reference()
                .unwrap();
            let cid_font = doc.get_dictionary(cid_id).unwrap();
            let descriptor_id = cid_font.get(b"FontDescriptor").unwrap().as_reference().unwrap();
            doc.get_dictionary(descriptor_id)
                .unwrap()
                .get(b"FontFile2")
                .unwrap()
                .as_reference()
                .unwrap()
        };
        let shared = program_of(first);
        assert_eq!(program_of(second), shared);
        assert!(doc.get_object(shared).unwrap().as_stream().is_ok());

        let programs = doc
            .objects
            .values()
            .filter(|object| object.as_stream().is_ok_and(|s| s.dict.has(b"Length1")))
            .count();
        assert_eq!(programs, 1);
    }

    #[test]
    fn test_share_font_programs_without_truetype() {
        let mut doc = Document::with_version("1.5");
        StampFont::Helvetica.install(&mut doc, "Kitty").unwrap();
        assert_eq!(share_font_programs(&mut doc), 0);
    }
}
