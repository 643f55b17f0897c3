//! Character classes and comments.

use crate::byte_reader::Reader;
use crate::reader::{Readable, ReaderContext, Skippable};

#[inline(always)]
pub(crate) fn is_white_space(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

#[inline(always)]
pub(crate) fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline(always)]
pub(crate) fn is_regular(byte: u8) -> bool {
    !is_white_space(byte) && !is_delimiter(byte)
}

#[inline(always)]
pub(crate) fn is_eol(byte: u8) -> bool {
    matches!(byte, 0x0a | 0x0d)
}

/// A `%`-comment running to the end of the line.
#[derive(Debug, Eq, PartialEq, Clone)]
pub(crate) struct Comment;

impl Skippable for Comment {
    fn skip(r: &mut Reader<'_>, _: bool) -> Option<()> {
        r.forward_tag(b"%")?;
        r.forward_while(|b| !is_eol(b));

        Some(())
    }
}

impl Readable<'_> for Comment {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        Comment::skip(r, false)?;

        Some(Comment)
    }
}
