//! The `cmap` table: character-to-glyph mapping.

use crate::font::ttf::{be_u16, be_u32};
use log::warn;

/// A decoded cmap subtable.
pub(crate) struct Cmap {
    kind: Kind,
    /// Whether the chosen subtable is the Windows (3, 0) symbol encoding.
    symbol: bool,
}

enum Kind {
    /// Segment mapping to delta values.
    Format4 {
        end_codes: Vec<u16>,
        start_codes: Vec<u16>,
        id_deltas: Vec<i16>,
        id_range_offsets: Vec<u16>,
        glyph_ids: Vec<u16>,
    },
    /// Trimmed table mapping.
    Format6 { first_code: u16, glyph_ids: Vec<u16> },
    /// Segmented coverage, full Unicode range.
    Format12 { groups: Vec<(u32, u32, u32)> },
}

impl Cmap {
    pub(crate) fn is_symbol(&self) -> bool {
        self.symbol
    }

    /// Map a code point to a glyph id, 0 when unmapped.
    pub(crate) fn lookup(&self, code_point: u32) -> u16 {
        match &self.kind {
            Kind::Format4 {
                end_codes,
                start_codes,
                id_deltas,
                id_range_offsets,
                glyph_ids,
            } => {
                let Ok(code) = u16::try_from(code_point) else {
                    return 0;
                };

                // Binary search for the first segment whose end code is
                // >= the code.
                let seg = end_codes.partition_point(|end| *end < code);

                if seg >= end_codes.len() || start_codes[seg] > code {
                    return 0;
                }

                if id_range_offsets[seg] == 0 {
                    (i32::from(code) + i32::from(id_deltas[seg])) as u16
                } else {
                    // The range offset is a byte offset from the segment's
                    // own slot in the idRangeOffset array into the glyph id
                    // array, which follows it directly.
                    let seg_count = end_codes.len();
                    let idx = usize::from(id_range_offsets[seg]) / 2
                        + usize::from(code - start_codes[seg]);

                    // Relative to the start of glyphIdArray instead of the
                    // slot: subtract the slots remaining after this one.
                    let Some(idx) = idx.checked_sub(seg_count - seg) else {
                        return 0;
                    };

                    match glyph_ids.get(idx) {
                        Some(0) | None => 0,
                        Some(gid) => (i32::from(*gid) + i32::from(id_deltas[seg])) as u16,
                    }
                }
            }
            Kind::Format6 {
                first_code,
                glyph_ids,
            } => {
                let Ok(code) = u16::try_from(code_point) else {
                    return 0;
                };

                match code.checked_sub(*first_code) {
                    Some(idx) => glyph_ids.get(usize::from(idx)).copied().unwrap_or(0),
                    None => 0,
                }
            }
            Kind::Format12 { groups } => {
                let group = groups.partition_point(|(_, end, _)| *end < code_point);

                match groups.get(group) {
                    Some((start, _, start_gid)) if *start <= code_point => {
                        (start_gid + (code_point - start)) as u16
                    }
                    _ => 0,
                }
            }
        }
    }
}

/// Parse the cmap table, choosing the best subtable: Unicode platforms
/// first, then Windows BMP/full-Unicode, then the Windows symbol
/// encoding, then Macintosh Roman. Format 12 beats format 4.
pub(crate) fn parse(data: &[u8]) -> Option<Cmap> {
    let num_subtables = be_u16(data, 2)?;

    let mut best: Option<(u32, u32, bool)> = None;

    for i in 0..usize::from(num_subtables) {
        let rec = 4 + i * 8;

        let platform = be_u16(data, rec)?;
        let encoding = be_u16(data, rec + 2)?;
        let offset = be_u32(data, rec + 4)? as usize;

        if offset >= data.len() {
            continue;
        }

        let format = be_u16(data, offset)?;
        let symbol = platform == 3 && encoding == 0;

        let platform_score: u32 = match (platform, encoding) {
            (0, _) => 40,
            (3, 10) => 35,
            (3, 1) => 30,
            (3, 0) => 20,
            (1, 0) => 10,
            _ => 1,
        };

        let format_score: u32 = match format {
            12 => 3,
            4 => 2,
            6 => 1,
            _ => 0,
        };

        if format_score == 0 {
            continue;
        }

        let score = platform_score * 10 + format_score;

        if best.map(|(s, _, _)| s < score).unwrap_or(true) {
            best = Some((score, offset as u32, symbol));
        }
    }

    let (_, offset, symbol) = best?;
    let subtable = &data[offset as usize..];

    let kind = match be_u16(subtable, 0)? {
        4 => parse_format4(subtable),
        6 => parse_format6(subtable),
        12 => parse_format12(subtable),
        other => {
            warn!("unsupported cmap subtable format {other}");

            None
        }
    }?;

    Some(Cmap { kind, symbol })
}

fn parse_format4(data: &[u8]) -> Option<Kind> {
    let seg_count_x2 = usize::from(be_u16(data, 6)?);
    let seg_count = seg_count_x2 / 2;

    if seg_count == 0 {
        return None;
    }

    let end_base = 14;
    let start_base = end_base + seg_count_x2 + 2;
    let delta_base = start_base + seg_count_x2;
    let range_base = delta_base + seg_count_x2;
    let glyph_ids_base = range_base + seg_count_x2;

    let mut end_codes = Vec::with_capacity(seg_count);
    let mut start_codes = Vec::with_capacity(seg_count);
    let mut id_deltas = Vec::with_capacity(seg_count);
    let mut id_range_offsets = Vec::with_capacity(seg_count);

    for i in 0..seg_count {
        end_codes.push(be_u16(data, end_base + i * 2)?);
        start_codes.push(be_u16(data, start_base + i * 2)?);
        id_deltas.push(be_u16(data, delta_base + i * 2)? as i16);
        id_range_offsets.push(be_u16(data, range_base + i * 2)?);
    }

    let glyph_ids = data
        .get(glyph_ids_base..)
        .unwrap_or(&[])
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();

    Some(Kind::Format4 {
        end_codes,
        start_codes,
        id_deltas,
        id_range_offsets,
        glyph_ids,
    })
}

fn parse_format6(data: &[u8]) -> Option<Kind> {
    let first_code = be_u16(data, 6)?;
    let entry_count = usize::from(be_u16(data, 8)?);

    let mut glyph_ids = Vec::with_capacity(entry_count);

    for i in 0..entry_count {
        glyph_ids.push(be_u16(data, 10 + i * 2)?);
    }

    Some(Kind::Format6 {
        first_code,
        glyph_ids,
    })
}

fn parse_format12(data: &[u8]) -> Option<Kind> {
    let num_groups = be_u32(data, 12)? as usize;

    let mut groups = Vec::with_capacity(num_groups.min(1 << 16));

    for i in 0..num_groups {
        let rec = 16 + i * 12;

        let start = be_u32(data, rec)?;
        let end = be_u32(data, rec + 4)?;
        let start_gid = be_u32(data, rec + 8)?;

        groups.push((start, end, start_gid));
    }

    Some(Kind::Format12 { groups })
}

#[cfg(test)]
mod tests {
    use crate::font::ttf::cmap::parse;

    fn push16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    fn push32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    /// A format 4 subtable with two mapped segments: one using idDelta
    /// only, one going through the glyph id array.
    fn format4_table() -> Vec<u8> {
        let mut sub = vec![];

        // Segments: [0x41..0x44] via delta, [0x61..0x62] via range
        // offset, plus the required 0xFFFF terminator.
        let seg_count: u16 = 3;

        push16(&mut sub, 4); // format
        push16(&mut sub, 0); // length, fixed up below
        push16(&mut sub, 0); // language
        push16(&mut sub, seg_count * 2);
        push16(&mut sub, 4); // searchRange
        push16(&mut sub, 1); // entrySelector
        push16(&mut sub, 2); // rangeShift

        // endCode
        push16(&mut sub, 0x44);
        push16(&mut sub, 0x62);
        push16(&mut sub, 0xFFFF);
        push16(&mut sub, 0); // reservedPad
        // startCode
        push16(&mut sub, 0x41);
        push16(&mut sub, 0x61);
        push16(&mut sub, 0xFFFF);
        // idDelta: 'A' (0x41) maps to glyph 1.
        push16(&mut sub, (1i16 - 0x41) as u16);
        push16(&mut sub, 0);
        push16(&mut sub, 1);
        // idRangeOffset: segment 1 points into the glyph id array. Its
        // slot is 2 slots before the array start, so an offset of 4 bytes
        // selects the array's first entry for startCode.
        push16(&mut sub, 0);
        push16(&mut sub, 4);
        push16(&mut sub, 0);
        // glyphIdArray: glyphs for 0x61 and 0x62.
        push16(&mut sub, 20);
        push16(&mut sub, 21);

        let len = sub.len() as u16;
        sub[2..4].copy_from_slice(&len.to_be_bytes());

        let mut table = vec![];
        push16(&mut table, 0); // version
        push16(&mut table, 1); // one subtable
        push16(&mut table, 3); // windows
        push16(&mut table, 1); // bmp
        push32(&mut table, 12); // offset
        table.extend_from_slice(&sub);

        table
    }

    #[test]
    fn format4_delta_segment() {
        let cmap = parse(&format4_table()).unwrap();

        assert_eq!(cmap.lookup(0x41), 1);
        assert_eq!(cmap.lookup(0x42), 2);
        assert_eq!(cmap.lookup(0x44), 4);
    }

    #[test]
    fn format4_range_offset_segment() {
        let cmap = parse(&format4_table()).unwrap();

        assert_eq!(cmap.lookup(0x61), 20);
        assert_eq!(cmap.lookup(0x62), 21);
    }

    #[test]
    fn format4_unmapped() {
        let cmap = parse(&format4_table()).unwrap();

        assert_eq!(cmap.lookup(0x40), 0);
        assert_eq!(cmap.lookup(0x45), 0);
        assert_eq!(cmap.lookup(0x10000), 0);
    }

    #[test]
    fn format12() {
        let mut sub = vec![];
        push16(&mut sub, 12); // format
        push16(&mut sub, 0); // reserved
        push32(&mut sub, 16 + 12); // length
        push32(&mut sub, 0); // language
        push32(&mut sub, 1); // one group
        push32(&mut sub, 0x1F600); // start
        push32(&mut sub, 0x1F602); // end
        push32(&mut sub, 7); // start glyph

        let mut table = vec![];
        push16(&mut table, 0);
        push16(&mut table, 1);
        push16(&mut table, 3);
        push16(&mut table, 10);
        push32(&mut table, 12);
        table.extend_from_slice(&sub);

        let cmap = parse(&table).unwrap();

        assert_eq!(cmap.lookup(0x1F600), 7);
        assert_eq!(cmap.lookup(0x1F602), 9);
        assert_eq!(cmap.lookup(0x1F603), 0);
        assert_eq!(cmap.lookup(0x41), 0);
    }

    #[test]
    fn format6() {
        let mut sub = vec![];
        push16(&mut sub, 6); // format
        push16(&mut sub, 0); // length
        push16(&mut sub, 0); // language
        push16(&mut sub, 0x30); // first code
        push16(&mut sub, 2); // entry count
        push16(&mut sub, 5);
        push16(&mut sub, 6);

        let mut table = vec![];
        push16(&mut table, 0);
        push16(&mut table, 1);
        push16(&mut table, 1); // macintosh
        push16(&mut table, 0);
        push32(&mut table, 12);
        table.extend_from_slice(&sub);

        let cmap = parse(&table).unwrap();

        assert_eq!(cmap.lookup(0x30), 5);
        assert_eq!(cmap.lookup(0x31), 6);
        assert_eq!(cmap.lookup(0x32), 0);
        assert_eq!(cmap.lookup(0x2F), 0);
    }

    #[test]
    fn symbol_flag() {
        let mut table = vec![];
        push16(&mut table, 0);
        push16(&mut table, 1);
        push16(&mut table, 3); // windows
        push16(&mut table, 0); // symbol
        push32(&mut table, 12);

        // Minimal format 6 subtable.
        push16(&mut table, 6);
        push16(&mut table, 0);
        push16(&mut table, 0);
        push16(&mut table, 0xF041);
        push16(&mut table, 1);
        push16(&mut table, 9);

        let cmap = parse(&table).unwrap();

        assert!(cmap.is_symbol());
        assert_eq!(cmap.lookup(0xF041), 9);
    }
}
