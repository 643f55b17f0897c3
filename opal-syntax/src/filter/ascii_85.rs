//! The ASCII85 filter.

use crate::filter::FilterError;
use crate::trivia::is_white_space;
use log::warn;

/// Decode ASCII85 data.
///
/// Groups of five characters in `!`..`u` encode four bytes base-85; `z`
/// abbreviates four zero bytes; `~>` terminates. A partial trailing group
/// of n characters is padded with `u` and yields n-1 bytes.
pub(crate) fn decode(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut out = Vec::with_capacity(data.len() / 5 * 4 + 4);
    let mut group = [0u8; 5];
    let mut group_len = 0usize;

    let mut iter = data.iter().copied().peekable();

    // Some producers emit the `<~` opener.
    if data.starts_with(b"<~") {
        iter.next();
        iter.next();
    }

    while let Some(b) = iter.next() {
        if is_white_space(b) {
            continue;
        }

        match b {
            b'~' => break,
            b'z' if group_len == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[group_len] = b;
                group_len += 1;

                if group_len == 5 {
                    push_group(&mut out, &group, 5)?;
                    group_len = 0;
                }
            }
            _ => {
                warn!("invalid byte {b:#04x} in ascii85 stream");

                return Err(FilterError::Decode);
            }
        }
    }

    match group_len {
        0 => {}
        1 => {
            // A single leftover character encodes nothing.
            warn!("truncated trailing group in ascii85 stream");

            return Err(FilterError::Decode);
        }
        n => {
            for slot in group.iter_mut().skip(n) {
                *slot = b'u';
            }
            push_group(&mut out, &group, n)?;
        }
    }

    Ok(out)
}

fn push_group(out: &mut Vec<u8>, group: &[u8; 5], len: usize) -> Result<(), FilterError> {
    let mut value: u64 = 0;

    for c in group {
        value = value * 85 + u64::from(c - b'!');
    }

    if value > u64::from(u32::MAX) {
        warn!("ascii85 group exceeds 32 bits");

        return Err(FilterError::Decode);
    }

    let bytes = (value as u32).to_be_bytes();
    out.extend_from_slice(&bytes[..len - 1]);

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::filter::ascii_85::decode;

    #[test]
    fn full_groups() {
        assert_eq!(decode(b"87cURD]DhsEbo80~>").unwrap(), b"Hello World!");
    }

    #[test]
    fn partial_group() {
        assert_eq!(decode(b"87cURD]Dg~>").unwrap(), b"Hello W");
    }

    #[test]
    fn zero_shortcut() {
        assert_eq!(decode(b"z~>").unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn whitespace_ignored() {
        assert_eq!(decode(b"87 cU\nRD]Dhs\tEbo80~>").unwrap(), b"Hello World!");
    }

    #[test]
    fn leading_marker() {
        assert_eq!(decode(b"<~87cUR~>").unwrap(), b"Hell");
    }

    #[test]
    fn missing_terminator() {
        assert_eq!(decode(b"87cUR").unwrap(), b"Hell");
    }

    #[test]
    fn single_trailing_char_is_error() {
        assert!(decode(b"87cUR@~>").is_err());
    }

    #[test]
    fn empty() {
        assert_eq!(decode(b"~>").unwrap(), b"");
    }
}
