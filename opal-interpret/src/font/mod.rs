//! PDF font handling: font dictionaries, encodings, widths and embedded
//! TrueType programs.

mod encoding;
mod outline;
pub mod ttf;

use crate::font::encoding::SimpleEncoding;
use crate::font::ttf::TrueTypeFont;
use kurbo::{Affine, BezPath};
use log::warn;
use opal_syntax::object::dict::keys::{
    BASE_FONT, DESCENDANT_FONTS, ENCODING, FIRST_CHAR, FONT_DESCRIPTOR, FONT_FILE2, FONT_FILE3,
    MISSING_WIDTH, SUBTYPE, WIDTHS,
};
use opal_syntax::object::{Array, Dict, Name, Number, Object, Stream};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// The error produced when an embedded font program cannot be parsed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FontError {
    /// A required sfnt table is absent.
    MissingTable(&'static [u8; 4]),
    /// A table exists but is too short or inconsistent.
    Malformed(&'static str),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::MissingTable(tag) => {
                write!(f, "required table {} is missing", String::from_utf8_lossy(*tag))
            }
            FontError::Malformed(what) => write!(f, "malformed font program: {what}"),
        }
    }
}

impl std::error::Error for FontError {}

/// Where glyph advance widths come from.
enum WidthSource {
    /// `/FirstChar` + `/Widths` of a simple font, in glyph-space units
    /// (thousandths of text space).
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing: Option<f32>,
    },
    /// The `/W` map of a CID font, keyed by CID.
    Cid {
        widths: FxHashMap<u32, f32>,
        default: f32,
    },
    /// Fall back to the font program's `hmtx` table.
    Metrics,
}

struct FontInner {
    program: Option<TrueTypeFont>,
    widths: WidthSource,
    encoding: SimpleEncoding,
    /// Type0 fonts with an Identity CID encoding use two-byte codes that
    /// map straight to glyph ids.
    two_byte: bool,
    base_name: Vec<u8>,
}

/// A font ready for glyph lookup, outlining and advance computation.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct Font(Arc<FontInner>);

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Font({})", String::from_utf8_lossy(&self.0.base_name))
    }
}

impl Font {
    /// Load a font from its PDF font dictionary.
    ///
    /// Returns `None` when the dictionary is unusable; fonts without an
    /// embedded TrueType program still load, so that text advances stay
    /// correct, but produce no outlines.
    pub fn load(dict: &Dict<'_>) -> Option<Font> {
        let subtype = dict.get::<Name>(SUBTYPE)?;
        let base_name = dict
            .get::<Name>(BASE_FONT)
            .map(|n| n.as_ref().to_vec())
            .unwrap_or_default();

        if subtype.as_ref() == b"Type0" {
            Self::load_type0(dict, base_name)
        } else {
            Self::load_simple(dict, base_name)
        }
    }

    fn load_simple(dict: &Dict<'_>, base_name: Vec<u8>) -> Option<Font> {
        let encoding = match dict.get::<Object>(ENCODING) {
            Some(Object::Name(name)) => encoding_from_name(&name),
            Some(Object::Dict(enc_dict)) => {
                // Differences arrays are not applied; the base encoding
                // still gets the high block right.
                if enc_dict.contains_key(b"Differences") {
                    warn!("ignoring /Differences of font encoding");
                }

                enc_dict
                    .get::<Name>(b"BaseEncoding")
                    .map(|n| encoding_from_name(&n))
                    .unwrap_or_default()
            }
            _ => SimpleEncoding::default(),
        };

        let descriptor = dict.get::<Dict>(FONT_DESCRIPTOR);
        let program = descriptor.as_ref().and_then(load_program);

        let widths = match (
            dict.get::<u32>(FIRST_CHAR),
            dict.get::<Array>(WIDTHS),
        ) {
            (Some(first_char), Some(widths)) => WidthSource::Simple {
                first_char,
                widths: widths.iter::<f32>().map(|w| w / 1000.0).collect(),
                missing: descriptor
                    .as_ref()
                    .and_then(|d| d.get::<f32>(MISSING_WIDTH))
                    .map(|w| w / 1000.0),
            },
            _ => WidthSource::Metrics,
        };

        Some(Font(Arc::new(FontInner {
            program,
            widths,
            encoding,
            two_byte: false,
            base_name,
        })))
    }

    fn load_type0(dict: &Dict<'_>, base_name: Vec<u8>) -> Option<Font> {
        match dict.get::<Name>(ENCODING) {
            Some(name) if name.as_ref().starts_with(b"Identity") => {}
            Some(name) => {
                warn!(
                    "unsupported Type0 encoding {}, assuming Identity",
                    name.as_str()
                );
            }
            None => warn!("Type0 font without /Encoding, assuming Identity"),
        }

        let descendant = dict.get::<Array>(DESCENDANT_FONTS)?.get::<Dict>(0)?;

        match descendant.get::<Object>(b"CIDToGIDMap") {
            Some(Object::Name(n)) if n.as_ref() == b"Identity" => {}
            Some(Object::Stream(_)) => {
                warn!("CIDToGIDMap streams are unsupported, assuming Identity");
            }
            _ => {}
        }

        let descriptor = descendant.get::<Dict>(FONT_DESCRIPTOR);
        let program = descriptor.as_ref().and_then(load_program);

        let default = descendant.get::<f32>(b"DW").unwrap_or(1000.0) / 1000.0;
        let widths = WidthSource::Cid {
            widths: parse_cid_widths(descendant.get::<Array>(b"W")),
            default,
        };

        Some(Font(Arc::new(FontInner {
            program,
            widths,
            encoding: SimpleEncoding::default(),
            two_byte: true,
            base_name,
        })))
    }

    /// Whether codes are two bytes wide.
    pub fn is_two_byte(&self) -> bool {
        self.0.two_byte
    }

    /// Split a show-text string into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.0.two_byte {
            bytes
                .chunks(2)
                .map(|c| {
                    if c.len() == 2 {
                        u32::from(u16::from_be_bytes([c[0], c[1]]))
                    } else {
                        u32::from(c[0])
                    }
                })
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        }
    }

    /// Map a character code to a glyph id.
    pub fn glyph_id(&self, code: u32) -> u16 {
        if self.0.two_byte {
            // Identity CID encoding: the code is the CID is the glyph id.
            return code as u16;
        }

        let Some(program) = &self.0.program else {
            return 0;
        };

        let unicode = self.0.encoding.to_unicode(code as u8);
        let gid = program.glyph_id(unicode);

        if gid != 0 {
            return gid;
        }

        // Symbol fonts commonly map their codes into the F000 private-use
        // block.
        if program.has_symbol_cmap() {
            let gid = program.glyph_id(0xF000 + (code & 0xFF));

            if gid != 0 {
                return gid;
            }
        }

        0
    }

    /// The advance width of a code, in text-space units per unit font
    /// size.
    pub fn advance(&self, code: u32, glyph_id: u16) -> f32 {
        match &self.0.widths {
            WidthSource::Simple {
                first_char,
                widths,
                missing,
            } => match code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
            {
                Some(w) => *w,
                None => missing.unwrap_or_else(|| self.metrics_advance(glyph_id)),
            },
            WidthSource::Cid { widths, default } => {
                widths.get(&code).copied().unwrap_or(*default)
            }
            WidthSource::Metrics => self.metrics_advance(glyph_id),
        }
    }

    fn metrics_advance(&self, glyph_id: u16) -> f32 {
        match &self.0.program {
            Some(program) => {
                f32::from(program.advance(glyph_id)) / f32::from(program.units_per_em())
            }
            // A plausible default for text with no width information at
            // all.
            None => 0.5,
        }
    }

    /// The glyph outline scaled to a one-unit em square.
    pub fn outline(&self, glyph_id: u16) -> Option<BezPath> {
        let program = self.0.program.as_ref()?;

        let mut path = outline::glyph_path(program, glyph_id)?;
        let upem = f64::from(program.units_per_em());
        path.apply_affine(Affine::scale(1.0 / upem));

        Some(path)
    }

    /// The embedded font program, if one was parsed.
    pub fn program(&self) -> Option<&TrueTypeFont> {
        self.0.program.as_ref()
    }

    /// The `/BaseFont` name.
    pub fn base_name(&self) -> &[u8] {
        &self.0.base_name
    }
}

fn encoding_from_name(name: &Name) -> SimpleEncoding {
    match name.as_ref() {
        b"WinAnsiEncoding" => SimpleEncoding::WinAnsi,
        b"MacRomanEncoding" => {
            warn!("MacRomanEncoding is approximated by Latin-1");

            SimpleEncoding::Latin1
        }
        _ => SimpleEncoding::Latin1,
    }
}

fn load_program(descriptor: &Dict<'_>) -> Option<TrueTypeFont> {
    let stream = match descriptor.get::<Stream>(FONT_FILE2) {
        Some(stream) => stream,
        None => {
            if descriptor.contains_key(FONT_FILE3) || descriptor.contains_key(b"FontFile") {
                warn!("font program is not TrueType, glyphs will not render");
            } else {
                warn!("font has no embedded program, glyphs will not render");
            }

            return None;
        }
    };

    let data = match stream.decoded() {
        Ok(data) => data,
        Err(e) => {
            warn!("failed to decode embedded font program: {e}");

            return None;
        }
    };

    match TrueTypeFont::parse(data) {
        Ok(program) => Some(program),
        Err(e) => {
            warn!("failed to parse embedded font program: {e}");

            None
        }
    }
}

/// Parse a CID `/W` array: `c [w1 w2 …]` runs and `c1 c2 w` ranges, in
/// thousandths.
fn parse_cid_widths(array: Option<Array<'_>>) -> FxHashMap<u32, f32> {
    let mut map = FxHashMap::default();

    let Some(array) = array else {
        return map;
    };

    let items: Vec<Object> = array.iter::<Object>().collect();
    let mut i = 0;

    while i < items.len() {
        let Some(first) = items[i].clone().into_number().map(num_u32) else {
            break;
        };

        match items.get(i + 1) {
            Some(Object::Array(widths)) => {
                for (offset, w) in widths.iter::<f32>().enumerate() {
                    map.insert(first + offset as u32, w / 1000.0);
                }

                i += 2;
            }
            Some(Object::Number(last)) => {
                let last = num_u32(*last);

                let Some(w) = items
                    .get(i + 2)
                    .and_then(|o| o.clone().into_f32())
                else {
                    break;
                };

                for cid in first..=last.min(first + 65535) {
                    map.insert(cid, w / 1000.0);
                }

                i += 3;
            }
            _ => break,
        }
    }

    map
}

fn num_u32(n: Number) -> u32 {
    n.as_i64().clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use crate::font::{parse_cid_widths, Font};
    use opal_syntax::object::{Array, Dict};
    use opal_syntax::reader::Readable;

    #[test]
    fn cid_width_runs() {
        let arr = Array::from_bytes(b"[1 [500 600] 10 12 750]").unwrap();
        let map = parse_cid_widths(Some(arr));

        assert_eq!(map.get(&1), Some(&0.5));
        assert_eq!(map.get(&2), Some(&0.6));
        assert_eq!(map.get(&10), Some(&0.75));
        assert_eq!(map.get(&12), Some(&0.75));
        assert_eq!(map.get(&3), None);
    }

    #[test]
    fn simple_font_widths() {
        let dict = Dict::from_bytes(
            b"<< /Type /Font /Subtype /TrueType /BaseFont /Test /FirstChar 65 /Widths [500 600 700] >>",
        )
        .unwrap();

        let font = Font::load(&dict).unwrap();

        assert!(!font.is_two_byte());
        assert_eq!(font.advance(65, 0), 0.5);
        assert_eq!(font.advance(67, 0), 0.7);
        // Out of range without metrics: the fallback default.
        assert_eq!(font.advance(200, 0), 0.5);
    }

    #[test]
    fn codes_two_byte() {
        let dict = Dict::from_bytes(
            b"<< /Type /Font /Subtype /Type0 /Encoding /Identity-H /DescendantFonts [<< /Subtype /CIDFontType2 >>] >>",
        )
        .unwrap();

        let font = Font::load(&dict).unwrap();

        assert!(font.is_two_byte());
        assert_eq!(font.codes(&[0x01, 0x02, 0x00, 0x41]), vec![0x0102, 0x41]);
        assert_eq!(font.glyph_id(0x0102), 0x0102);
    }

    #[test]
    fn missing_subtype() {
        let dict = Dict::from_bytes(b"<< /Type /Font >>").unwrap();
        assert!(Font::load(&dict).is_none());
    }
}
