//! A TrueType (sfnt) table parser.
//!
//! Parses the tables a renderer needs (`head`, `maxp`, `hhea`, `hmtx`,
//! `cmap`, `loca`, `glyf`) plus the optional `name`, `OS/2`, `post` and
//! `kern` tables. Tables are decoded eagerly into owned values except for
//! `glyf`, whose glyphs are parsed on demand.

pub(crate) mod cmap;
pub(crate) mod glyf;

use crate::font::FontError;
use cmap::Cmap;
use log::warn;
use opal_syntax::byte_reader::Reader;
use rustc_hash::FxHashMap;
use std::ops::Range;

/// A parsed TrueType font program.
pub struct TrueTypeFont {
    data: Vec<u8>,
    units_per_em: u16,
    num_glyphs: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
    loca: Vec<u32>,
    glyf: Range<usize>,
    /// `(advance, left side bearing)` for the first `numberOfHMetrics`
    /// glyphs; the rest share the last advance.
    h_metrics: Vec<(u16, i16)>,
    cmap: Option<Cmap>,
    kern: FxHashMap<(u16, u16), i16>,
    os2: Option<Os2>,
    post: Option<Post>,
    family_name: Option<String>,
}

/// The subset of `OS/2` the renderer cares about.
#[derive(Debug, Clone, Copy)]
pub struct Os2 {
    /// `usWeightClass`.
    pub weight_class: u16,
    /// `sxHeight`, present from version 2 on.
    pub x_height: Option<i16>,
    /// `sCapHeight`, present from version 2 on.
    pub cap_height: Option<i16>,
}

/// The subset of `post` the renderer cares about.
#[derive(Debug, Clone, Copy)]
pub struct Post {
    /// The italic angle in degrees, counter-clockwise from vertical.
    pub italic_angle: f32,
    /// Whether the font is monospaced.
    pub is_fixed_pitch: bool,
}

impl TrueTypeFont {
    /// Parse a font program.
    pub fn parse(data: Vec<u8>) -> Result<TrueTypeFont, FontError> {
        let tables = table_directory(&data)?;

        let table = |tag: &[u8; 4]| -> Option<&[u8]> {
            tables.get(tag).map(|range| &data[range.clone()])
        };
        let required = |tag: &'static [u8; 4]| -> Result<&[u8], FontError> {
            table(tag).ok_or(FontError::MissingTable(tag))
        };

        // head
        let head = required(b"head")?;
        if head.len() < 54 {
            return Err(FontError::Malformed("head table too short"));
        }
        let units_per_em = be_u16(head, 18).unwrap_or(1000).max(1);
        let long_loca = be_i16(head, 50).unwrap_or(0) != 0;

        // maxp
        let maxp = required(b"maxp")?;
        let num_glyphs = be_u16(maxp, 4).ok_or(FontError::Malformed("maxp table too short"))?;

        // hhea
        let hhea = required(b"hhea")?;
        if hhea.len() < 36 {
            return Err(FontError::Malformed("hhea table too short"));
        }
        let ascender = be_i16(hhea, 4).unwrap_or(0);
        let descender = be_i16(hhea, 6).unwrap_or(0);
        let line_gap = be_i16(hhea, 8).unwrap_or(0);
        let num_h_metrics = be_u16(hhea, 34).unwrap_or(0);

        // hmtx
        let hmtx = required(b"hmtx")?;
        let mut h_metrics = Vec::with_capacity(usize::from(num_h_metrics));
        {
            let mut r = Reader::new(hmtx);
            for _ in 0..num_h_metrics {
                let advance = match r.read_u16() {
                    Some(a) => a,
                    None => break,
                };
                let lsb = r.read_i16().unwrap_or(0);
                h_metrics.push((advance, lsb));
            }
        }
        if h_metrics.is_empty() {
            return Err(FontError::Malformed("hmtx table has no metrics"));
        }

        // loca
        let loca_data = required(b"loca")?;
        let loca = parse_loca(loca_data, num_glyphs, long_loca);

        // glyf
        let glyf = tables
            .get(b"glyf")
            .cloned()
            .ok_or(FontError::MissingTable(b"glyf"))?;

        // cmap
        let cmap = match table(b"cmap") {
            Some(cmap_data) => cmap::parse(cmap_data),
            None => {
                warn!("font has no cmap table, character lookup will fail");

                None
            }
        };

        let kern = table(b"kern").map(parse_kern).unwrap_or_default();
        let os2 = table(b"OS/2").and_then(parse_os2);
        let post = table(b"post").and_then(parse_post);
        let family_name = table(b"name").and_then(parse_family_name);

        Ok(TrueTypeFont {
            data,
            units_per_em,
            num_glyphs,
            ascender,
            descender,
            line_gap,
            loca,
            glyf,
            h_metrics,
            cmap,
            kern,
            os2,
            post,
            family_name,
        })
    }

    /// The design grid resolution.
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// The number of glyphs.
    pub fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }

    /// The typographic ascender in font units.
    pub fn ascender(&self) -> i16 {
        self.ascender
    }

    /// The typographic descender in font units (negative below baseline).
    pub fn descender(&self) -> i16 {
        self.descender
    }

    /// The additional line gap in font units.
    pub fn line_gap(&self) -> i16 {
        self.line_gap
    }

    /// The `OS/2` metrics, if the table is present.
    pub fn os2(&self) -> Option<Os2> {
        self.os2
    }

    /// The `post` info, if the table is present.
    pub fn post(&self) -> Option<Post> {
        self.post
    }

    /// The family name, if a `name` table carries one.
    pub fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    /// Map a Unicode code point to a glyph id; 0 (`.notdef`) when
    /// unmapped.
    pub fn glyph_id(&self, code_point: u32) -> u16 {
        self.cmap.as_ref().map(|c| c.lookup(code_point)).unwrap_or(0)
    }

    /// Whether the selected cmap subtable is a (3, 0) symbol encoding.
    pub fn has_symbol_cmap(&self) -> bool {
        self.cmap.as_ref().map(|c| c.is_symbol()).unwrap_or(false)
    }

    /// The advance width of a glyph in font units.
    pub fn advance(&self, glyph_id: u16) -> u16 {
        let idx = usize::from(glyph_id).min(self.h_metrics.len() - 1);

        self.h_metrics[idx].0
    }

    /// The kerning adjustment between two glyphs in font units.
    pub fn kerning(&self, left: u16, right: u16) -> i16 {
        self.kern.get(&(left, right)).copied().unwrap_or(0)
    }

    /// The raw glyph description for a glyph id. `None` for out-of-range
    /// ids and unparseable data; empty glyphs yield `Glyph::Empty`.
    pub(crate) fn glyph(&self, glyph_id: u16) -> Option<glyf::Glyph> {
        let idx = usize::from(glyph_id);

        if idx + 1 >= self.loca.len() {
            return None;
        }

        let start = self.loca[idx] as usize;
        let end = self.loca[idx + 1] as usize;

        // Equal consecutive offsets mean an empty glyph (e.g. space).
        if start >= end {
            return Some(glyf::Glyph::Empty);
        }

        let glyf_data = self.data.get(self.glyf.clone())?;
        let glyph_data = glyf_data.get(start..end.min(glyf_data.len()))?;

        glyf::parse_glyph(glyph_data)
    }
}

fn table_directory(data: &[u8]) -> Result<FxHashMap<[u8; 4], Range<usize>>, FontError> {
    let mut r = Reader::new(data);

    let version = r.read_u32().ok_or(FontError::Malformed("missing offset table"))?;

    // 0x00010000, 'OTTO' and 'true' all mark sfnt containers. CFF-flavored
    // 'OTTO' fonts still carry the metric tables, but their outlines are
    // out of scope; the caller fails later when `glyf` is absent.
    if version != 0x0001_0000 && version != u32::from_be_bytes(*b"OTTO") && version != u32::from_be_bytes(*b"true") {
        return Err(FontError::Malformed("not an sfnt container"));
    }

    let num_tables = r.read_u16().ok_or(FontError::Malformed("missing table count"))?;
    // searchRange, entrySelector, rangeShift.
    let _ = r.skip_bytes(6);

    let mut tables = FxHashMap::default();

    for _ in 0..num_tables {
        let tag_bytes = match r.read_bytes(4) {
            Some(t) => t,
            None => break,
        };
        let _checksum = r.read_u32();
        let offset = r.read_u32().unwrap_or(0) as usize;
        let length = r.read_u32().unwrap_or(0) as usize;

        let end = offset.saturating_add(length).min(data.len());

        if offset < end {
            let tag = [tag_bytes[0], tag_bytes[1], tag_bytes[2], tag_bytes[3]];
            tables.insert(tag, offset..end);
        }
    }

    Ok(tables)
}

fn parse_loca(data: &[u8], num_glyphs: u16, long: bool) -> Vec<u32> {
    let count = usize::from(num_glyphs) + 1;
    let mut offsets = Vec::with_capacity(count);
    let mut r = Reader::new(data);

    for _ in 0..count {
        let offset = if long {
            match r.read_u32() {
                Some(o) => o,
                None => break,
            }
        } else {
            match r.read_u16() {
                // Short offsets store half the real value.
                Some(o) => u32::from(o) * 2,
                None => break,
            }
        };

        offsets.push(offset);
    }

    offsets
}

fn parse_kern(data: &[u8]) -> FxHashMap<(u16, u16), i16> {
    let mut pairs = FxHashMap::default();
    let mut r = Reader::new(data);

    let Some(_version) = r.read_u16() else {
        return pairs;
    };
    let n_tables = r.read_u16().unwrap_or(0);

    for _ in 0..n_tables {
        let subtable_start = r.offset();

        let _sub_version = r.read_u16();
        let length = r.read_u16().unwrap_or(0) as usize;
        let coverage = r.read_u16().unwrap_or(0);

        let format = coverage >> 8;
        let horizontal = coverage & 0x0001 != 0;

        if format == 0 && horizontal {
            let n_pairs = r.read_u16().unwrap_or(0);
            // searchRange, entrySelector, rangeShift.
            let _ = r.skip_bytes(6);

            for _ in 0..n_pairs {
                let (Some(left), Some(right), Some(value)) =
                    (r.read_u16(), r.read_u16(), r.read_i16())
                else {
                    return pairs;
                };

                pairs.insert((left, right), value);
            }
        } else {
            // Skip subtables of other formats.
            if length == 0 || subtable_start + length > data.len() {
                break;
            }

            r.jump(subtable_start + length);
        }
    }

    pairs
}

fn parse_os2(data: &[u8]) -> Option<Os2> {
    let version = be_u16(data, 0)?;
    let weight_class = be_u16(data, 4)?;

    let (x_height, cap_height) = if version >= 2 {
        (be_i16(data, 86), be_i16(data, 88))
    } else {
        (None, None)
    };

    Some(Os2 {
        weight_class,
        x_height,
        cap_height,
    })
}

fn parse_post(data: &[u8]) -> Option<Post> {
    // italicAngle is 16.16 fixed-point.
    let angle_raw = be_u32(data, 4)? as i32;
    let is_fixed_pitch = be_u32(data, 12)? != 0;

    Some(Post {
        italic_angle: angle_raw as f32 / 65536.0,
        is_fixed_pitch,
    })
}

fn parse_family_name(data: &[u8]) -> Option<String> {
    let count = be_u16(data, 2)?;
    let string_offset = usize::from(be_u16(data, 4)?);

    let mut best: Option<String> = None;

    for i in 0..usize::from(count) {
        let rec = 6 + i * 12;

        let platform = be_u16(data, rec)?;
        let encoding = be_u16(data, rec + 2)?;
        let _language = be_u16(data, rec + 4)?;
        let name_id = be_u16(data, rec + 6)?;
        let length = usize::from(be_u16(data, rec + 8)?);
        let offset = usize::from(be_u16(data, rec + 10)?);

        if name_id != 1 {
            continue;
        }

        let bytes = data.get(string_offset + offset..string_offset + offset + length)?;

        match (platform, encoding) {
            // Windows Unicode BMP: UTF-16BE.
            (3, 1) | (0, _) => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();

                return Some(String::from_utf16_lossy(&units));
            }
            // Macintosh Roman, close enough to ASCII for family names.
            (1, 0) => {
                best = Some(bytes.iter().map(|b| char::from(*b)).collect());
            }
            _ => {}
        }
    }

    best
}

#[inline]
pub(crate) fn be_u16(data: &[u8], offset: usize) -> Option<u16> {
    let b = data.get(offset..offset + 2)?;

    Some(u16::from_be_bytes([b[0], b[1]]))
}

#[inline]
pub(crate) fn be_i16(data: &[u8], offset: usize) -> Option<i16> {
    be_u16(data, offset).map(|v| v as i16)
}

#[inline]
pub(crate) fn be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let b = data.get(offset..offset + 4)?;

    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}
