//! Decoding stream filters.

pub(crate) mod ascii_85;
pub(crate) mod ascii_hex;
pub(crate) mod lzw_flate;
pub(crate) mod run_length;

use crate::object::Dict;
use log::warn;
use std::fmt;

/// A stream filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `/ASCIIHexDecode`.
    AsciiHex,
    /// `/ASCII85Decode`.
    Ascii85,
    /// `/LZWDecode`.
    Lzw,
    /// `/FlateDecode`.
    Flate,
    /// `/RunLengthDecode`.
    RunLength,
    /// `/DCTDecode`. Passed through opaquely.
    Dct,
    /// `/JPXDecode`. Passed through opaquely.
    Jpx,
    /// `/CCITTFaxDecode`. Passed through opaquely.
    CcittFax,
    /// `/Crypt`. Only the `/Identity` form is meaningful here.
    Crypt,
}

/// The error produced when a filter chain cannot be applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A filter name is not one of the defined filters.
    Unsupported,
    /// The data does not decode under the declared filter.
    Decode,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Unsupported => write!(f, "unsupported stream filter"),
            FilterError::Decode => write!(f, "stream data failed to decode"),
        }
    }
}

impl std::error::Error for FilterError {}

impl Filter {
    /// Map a filter name (including the inline-image abbreviations) to a
    /// filter.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ASCIIHexDecode" | b"AHx" => Some(Filter::AsciiHex),
            b"ASCII85Decode" | b"A85" => Some(Filter::Ascii85),
            b"LZWDecode" | b"LZW" => Some(Filter::Lzw),
            b"FlateDecode" | b"Fl" => Some(Filter::Flate),
            b"RunLengthDecode" | b"RL" => Some(Filter::RunLength),
            b"DCTDecode" | b"DCT" => Some(Filter::Dct),
            b"JPXDecode" => Some(Filter::Jpx),
            b"CCITTFaxDecode" | b"CCF" => Some(Filter::CcittFax),
            b"Crypt" => Some(Filter::Crypt),
            _ => {
                warn!(
                    "unknown stream filter: {}",
                    String::from_utf8_lossy(name)
                );

                None
            }
        }
    }

    /// Whether this filter's output stays encoded (image codecs the core
    /// does not decode).
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Filter::Dct | Filter::Jpx | Filter::CcittFax)
    }

    /// Apply the filter to `data`.
    pub fn apply(&self, data: &[u8], parms: Option<&Dict<'_>>) -> Result<Vec<u8>, FilterError> {
        match self {
            Filter::AsciiHex => ascii_hex::decode(data),
            Filter::Ascii85 => ascii_85::decode(data),
            Filter::RunLength => run_length::decode(data),
            Filter::Flate => lzw_flate::flate::decode(data, parms),
            Filter::Lzw => lzw_flate::lzw::decode(data, parms),
            // The crypt filter only occurs as `/Identity` in unencrypted
            // files, which is a no-op.
            Filter::Crypt => Ok(data.to_vec()),
            Filter::Dct | Filter::Jpx | Filter::CcittFax => Ok(data.to_vec()),
        }
    }
}
