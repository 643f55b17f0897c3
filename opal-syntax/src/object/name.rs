//! Names.

use crate::filter::ascii_hex::decode_hex_digit;
use crate::object::object;
use crate::reader::{Readable, Reader, ReaderContext, Skippable};
use crate::trivia::is_regular;
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;

type NameInner = SmallVec<[u8; 31]>;

/// A PDF name object.
///
/// Names own their (escape-expanded) bytes so that they can be used as
/// map keys independently of the file buffer.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(NameInner);

impl Deref for Name {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Name {
    /// Create a name from raw syntax bytes, expanding `#xx` escapes.
    pub fn new(data: &[u8]) -> Self {
        if !data.contains(&b'#') {
            return Self(SmallVec::from_slice(data));
        }

        let mut result = SmallVec::new();
        let mut r = Reader::new(data);

        while let Some(b) = r.read_byte() {
            if b == b'#' {
                // Validated while skipping, so the two hex digits are present.
                let hex = r.read_bytes(2).unwrap();
                result
                    .push(decode_hex_digit(hex[0]).unwrap() << 4 | decode_hex_digit(hex[1]).unwrap());
            } else {
                result.push(b);
            }
        }

        Self(result)
    }

    /// Wrap already-expanded bytes.
    pub(crate) fn from_unescaped(data: &[u8]) -> Self {
        Self(SmallVec::from_slice(data))
    }

    /// A string representation of the name, with a placeholder for
    /// non-UTF-8 names.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("{non-utf8 name}")
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "/{s}"),
            Err(_) => <[u8] as Debug>::fmt(&self.0, f),
        }
    }
}

object!(Name, Name);

impl Skippable for Name {
    fn skip(r: &mut Reader<'_>, _: bool) -> Option<()> {
        skip_name_like(r, true)
    }
}

impl Readable<'_> for Name {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        let start = r.offset();
        skip_name_like(r, true)?;
        let end = r.offset();

        // Exclude the leading solidus.
        let data = r.range(start + 1..end)?;

        Some(Self::new(data))
    }
}

// Shared with the content-stream operator parser: operators follow the same
// syntax as names, minus the leading solidus.
pub(crate) fn skip_name_like(r: &mut Reader<'_>, solidus: bool) -> Option<()> {
    if solidus {
        r.forward_tag(b"/")?;
    }

    let start = r.offset();

    while let Some(b) = r.eat(is_regular) {
        if b == b'#' {
            r.eat(|n| n.is_ascii_hexdigit())?;
            r.eat(|n| n.is_ascii_hexdigit())?;
        }
    }

    if !solidus && start == r.offset() {
        return None;
    }

    Some(())
}
