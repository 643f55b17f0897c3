//! The Flate and LZW filters, and the predictor post-pass they share.

use crate::filter::FilterError;
use crate::object::dict::keys::{
    BITS_PER_COMPONENT, COLORS, COLUMNS, EARLY_CHANGE, PREDICTOR,
};
use crate::object::Dict;
use log::warn;

/// Decode parameters shared by Flate and LZW.
pub(crate) struct PredictorParams {
    predictor: u8,
    colors: u8,
    bits_per_component: u8,
    columns: usize,
    early_change: bool,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: true,
        }
    }
}

impl PredictorParams {
    fn from_dict(dict: &Dict<'_>) -> Self {
        Self {
            predictor: dict.get::<u8>(PREDICTOR).unwrap_or(1),
            colors: dict.get::<u8>(COLORS).unwrap_or(1),
            bits_per_component: dict.get::<u8>(BITS_PER_COMPONENT).unwrap_or(8),
            columns: dict.get::<usize>(COLUMNS).unwrap_or(1),
            early_change: dict.get::<u8>(EARLY_CHANGE).map(|e| e != 0).unwrap_or(true),
        }
    }

    fn from_opt(dict: Option<&Dict<'_>>) -> Self {
        dict.map(Self::from_dict).unwrap_or_default()
    }

    fn bytes_per_pixel(&self) -> usize {
        let bits = usize::from(self.colors) * usize::from(self.bits_per_component);
        bits.div_ceil(8).max(1)
    }

    fn row_length(&self) -> usize {
        let bits = self.columns * usize::from(self.colors) * usize::from(self.bits_per_component);
        bits.div_ceil(8)
    }
}

pub(crate) mod flate {
    use super::{apply_predictor, PredictorParams};
    use crate::filter::FilterError;
    use crate::object::Dict;
    use log::warn;

    /// Zlib-inflate `data`, falling back to a raw deflate stream when the
    /// zlib header is absent. Truncated streams yield their partial output.
    pub(crate) fn decode(data: &[u8], parms: Option<&Dict<'_>>) -> Result<Vec<u8>, FilterError> {
        let decoded = inflate(data).ok_or(FilterError::Decode)?;
        let params = PredictorParams::from_opt(parms);

        apply_predictor(decoded, &params)
    }

    fn inflate(data: &[u8]) -> Option<Vec<u8>> {
        match miniz_oxide::inflate::decompress_to_vec_zlib(data) {
            Ok(out) => Some(out),
            Err(e) if !e.output.is_empty() => {
                warn!("flate stream is truncated, keeping partial output");

                Some(e.output)
            }
            Err(_) => match miniz_oxide::inflate::decompress_to_vec(data) {
                Ok(out) => Some(out),
                Err(e) if !e.output.is_empty() => {
                    warn!("raw deflate stream is truncated, keeping partial output");

                    Some(e.output)
                }
                Err(_) => None,
            },
        }
    }
}

pub(crate) mod lzw {
    use super::{apply_predictor, PredictorParams};
    use crate::filter::FilterError;
    use crate::object::Dict;
    use bitreader::BitReader;

    const CLEAR_TABLE: usize = 256;
    const EOD: usize = 257;
    const FIRST_CODE: usize = 258;
    const MAX_ENTRIES: usize = 4096;

    /// Decode LZW data with variable-width codes of 9 to 12 bits.
    pub(crate) fn decode(data: &[u8], parms: Option<&Dict<'_>>) -> Result<Vec<u8>, FilterError> {
        let params = PredictorParams::from_opt(parms);
        let decoded = decode_impl(data, params.early_change).ok_or(FilterError::Decode)?;

        apply_predictor(decoded, &params)
    }

    fn decode_impl(data: &[u8], early_change: bool) -> Option<Vec<u8>> {
        let mut table = Table::new(early_change);
        let mut reader = BitReader::new(data);
        let mut out = vec![];
        let mut prev: Option<usize> = None;

        loop {
            let code = match reader.read_u16(table.code_width()) {
                Ok(code) => usize::from(code),
                // Streams frequently end without an explicit EOD marker.
                Err(_) => return Some(out),
            };

            match code {
                CLEAR_TABLE => {
                    table.clear();
                    prev = None;
                }
                EOD => return Some(out),
                code => {
                    if let Some(entry) = table.get(code) {
                        out.extend_from_slice(entry);

                        if let Some(prev) = prev {
                            let first = table.get(code)?[0];
                            table.register(prev, first)?;
                        }
                    } else if code == table.next_code() {
                        // The one-step-ahead case: the new entry is the
                        // previous sequence plus its own first byte.
                        let prev = prev?;
                        let first = table.get(prev)?[0];
                        let entry = table.register(prev, first)?;
                        out.extend_from_slice(entry);
                    } else {
                        return None;
                    }

                    prev = Some(code);
                }
            }
        }
    }

    struct Table {
        early_change: bool,
        entries: Vec<Vec<u8>>,
    }

    impl Table {
        fn new(early_change: bool) -> Self {
            let mut entries: Vec<Vec<u8>> = (0u8..=255).map(|b| vec![b]).collect();
            // Placeholders for the clear and EOD codes.
            entries.push(vec![]);
            entries.push(vec![]);

            Self {
                early_change,
                entries,
            }
        }

        fn clear(&mut self) {
            self.entries.truncate(FIRST_CODE);
        }

        fn next_code(&self) -> usize {
            self.entries.len()
        }

        fn get(&self, code: usize) -> Option<&[u8]> {
            if code == CLEAR_TABLE || code == EOD || code >= self.entries.len() {
                return None;
            }

            Some(&self.entries[code])
        }

        fn register(&mut self, prev: usize, byte: u8) -> Option<&[u8]> {
            if self.entries.len() >= MAX_ENTRIES {
                // Table is full; conforming encoders emit a clear code
                // before this happens, so just ignore the insert.
                return self.get(prev);
            }

            let prev_entry = self.get(prev)?;
            let mut entry = Vec::with_capacity(prev_entry.len() + 1);
            entry.extend_from_slice(prev_entry);
            entry.push(byte);
            self.entries.push(entry);

            self.entries.last().map(|v| &**v)
        }

        fn code_width(&self) -> u8 {
            let adjusted = self.entries.len() + usize::from(self.early_change);

            if adjusted >= 2048 {
                12
            } else if adjusted >= 1024 {
                11
            } else if adjusted >= 512 {
                10
            } else {
                9
            }
        }
    }
}

/// Apply the TIFF or PNG predictor declared in the decode parameters.
fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    match params.predictor {
        1 => Ok(data),
        2 => apply_tiff_predictor(data, params),
        10..=15 => apply_png_predictor(data, params),
        other => {
            warn!("unknown predictor {other}, leaving data untouched");

            Ok(data)
        }
    }
}

/// TIFF predictor 2: horizontal differencing per sample. Only 8-bit
/// components are supported; other depths pass through unchanged.
fn apply_tiff_predictor(mut data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    if params.bits_per_component != 8 {
        warn!(
            "tiff predictor with {} bits per component is unsupported",
            params.bits_per_component
        );

        return Ok(data);
    }

    let colors = usize::from(params.colors);
    let row_len = params.row_length();

    if row_len == 0 {
        return Ok(data);
    }

    for row in data.chunks_mut(row_len) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }

    Ok(data)
}

/// PNG predictors: every row is prefixed by a filter-type byte selecting
/// None, Sub, Up, Average or Paeth, applied at byte granularity with a
/// distance of one pixel.
fn apply_png_predictor(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, FilterError> {
    let bpp = params.bytes_per_pixel();
    let row_len = params.row_length();
    let total_row_len = row_len + 1;

    if row_len == 0 || data.len() % total_row_len != 0 {
        warn!("png-predicted data does not divide into rows");

        return Err(FilterError::Decode);
    }

    let num_rows = data.len() / total_row_len;
    let mut out = Vec::with_capacity(num_rows * row_len);
    let mut prev_row = vec![0u8; row_len];

    for in_row in data.chunks_exact(total_row_len) {
        let filter_type = in_row[0];
        let in_data = &in_row[1..];
        let mut row = vec![0u8; row_len];

        for i in 0..row_len {
            let raw = in_data[i];
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            row[i] = match filter_type {
                0 => raw,
                1 => raw.wrapping_add(left),
                2 => raw.wrapping_add(up),
                3 => raw.wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => raw.wrapping_add(paeth(left, up, up_left)),
                other => {
                    warn!("invalid png filter type {other}");

                    return Err(FilterError::Decode);
                }
            };
        }

        out.extend_from_slice(&row);
        prev_row = row;
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_predictor, paeth, PredictorParams};
    use crate::filter::lzw_flate::{flate, lzw};

    #[test]
    fn decode_lzw() {
        // The worked example from the specification: "-----A---B".
        let input = [0x80, 0x0B, 0x60, 0x50, 0x22, 0x0C, 0x0C, 0x85, 0x01];
        let decoded = lzw::decode(&input, None).unwrap();

        assert_eq!(decoded, vec![45, 45, 45, 45, 45, 65, 45, 45, 45, 66]);
    }

    #[test]
    fn decode_flate_zlib() {
        let input = [
            0x78, 0x9c, 0xf3, 0x48, 0xcd, 0xc9, 0xc9, 0x07, 0x00, 0x05, 0x8c, 0x01, 0xf5,
        ];

        assert_eq!(flate::decode(&input, None).unwrap(), b"Hello");
    }

    #[test]
    fn decode_flate_raw() {
        let input = [0xf3, 0x48, 0xcd, 0xc9, 0xc9, 0x07, 0x00];

        assert_eq!(flate::decode(&input, None).unwrap(), b"Hello");
    }

    #[test]
    fn flate_roundtrip() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&data, 6);

        assert_eq!(flate::decode(&compressed, None).unwrap(), data);
    }

    #[test]
    fn flate_garbage() {
        assert!(flate::decode(&[0x01, 0x02], None).is_err());
    }

    fn params(predictor: u8, colors: u8, columns: usize) -> PredictorParams {
        PredictorParams {
            predictor,
            colors,
            bits_per_component: 8,
            columns,
            early_change: true,
        }
    }

    #[test]
    fn tiff_predictor() {
        // Two rows of three samples, horizontally differenced.
        let input = vec![10, 5, 5, 1, 2, 3];
        let out = apply_predictor(input, &params(2, 1, 3)).unwrap();

        assert_eq!(out, vec![10, 15, 20, 1, 3, 6]);
    }

    /// Apply the PNG row filter `ft` to `plane`, producing predictor input.
    fn png_encode(plane: &[u8], ft: u8, row_len: usize, bpp: usize) -> Vec<u8> {
        let mut out = vec![];
        let mut prev = vec![0u8; row_len];

        for row in plane.chunks(row_len) {
            out.push(ft);

            for i in 0..row_len {
                let left = if i >= bpp { row[i - bpp] } else { 0 };
                let up = prev[i];
                let up_left = if i >= bpp { prev[i - bpp] } else { 0 };

                let predicted = match ft {
                    0 => 0,
                    1 => left,
                    2 => up,
                    3 => (((u16::from(left) + u16::from(up)) / 2) as u8),
                    4 => paeth(left, up, up_left),
                    _ => unreachable!(),
                };

                out.push(row[i].wrapping_sub(predicted));
            }

            prev = row.to_vec();
        }

        out
    }

    #[test]
    fn png_predictor_roundtrip() {
        // A 4x3 RGB plane with some structure in it.
        let plane: Vec<u8> = (0..36u32).map(|i| (i * 37 % 256) as u8).collect();

        for (predictor, ft) in [(10, 0), (11, 1), (12, 2), (13, 3), (14, 4)] {
            let encoded = png_encode(&plane, ft, 12, 3);
            let out = apply_predictor(encoded, &params(predictor, 3, 4)).unwrap();

            assert_eq!(out, plane, "predictor {predictor}");
        }
    }

    #[test]
    fn png_predictor_sub() {
        // Row of [1, 2, 3] stored as deltas under the Sub filter.
        let input = vec![1, 1, 1, 1];
        let out = apply_predictor(input, &params(11, 1, 3)).unwrap();

        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn png_predictor_bad_row_length() {
        assert!(apply_predictor(vec![0, 1, 2], &params(12, 1, 3)).is_err());
    }
}

