//! Reading PDF objects from raw bytes.

use crate::object::ObjectIdentifier;
use crate::trivia::{is_white_space, Comment};
use crate::xref::XRef;
use smallvec::SmallVec;

pub use crate::byte_reader::Reader;

/// The maximum depth of any recursive structure we follow (object resolution
/// chains, page trees, compound glyphs in the crates above).
pub const RECURSION_LIMIT: usize = 64;

/// Context carried along while reading objects.
///
/// It gives parsers access to the xref table (so that indirect references,
/// most notably a stream's indirect `/Length`, can be resolved mid-parse)
/// and tracks the chain of objects currently being resolved so that
/// reference cycles terminate.
#[derive(Clone, Debug)]
pub struct ReaderContext<'a> {
    pub(crate) xref: &'a XRef,
    pub(crate) in_content_stream: bool,
    pub(crate) parent_chain: SmallVec<[ObjectIdentifier; 8]>,
}

impl<'a> ReaderContext<'a> {
    /// Create a new context for the given xref table.
    pub fn new(xref: &'a XRef, in_content_stream: bool) -> Self {
        Self {
            xref,
            in_content_stream,
            parent_chain: SmallVec::new(),
        }
    }

    /// A context without an xref table behind it.
    ///
    /// Indirect references cannot be resolved through this context.
    pub fn dummy() -> ReaderContext<'static> {
        ReaderContext::new(XRef::dummy(), false)
    }

    /// A context for reading content-stream data.
    ///
    /// Object references cannot occur inside content streams, so the
    /// reference look-ahead after numbers is disabled.
    pub fn content_stream() -> ReaderContext<'static> {
        ReaderContext::new(XRef::dummy(), true)
    }

    /// The xref table of this context.
    #[inline]
    pub fn xref(&self) -> &'a XRef {
        self.xref
    }

    #[inline]
    pub(crate) fn in_content_stream(&self) -> bool {
        self.in_content_stream
    }

    #[inline]
    pub(crate) fn parent_chain_contains(&self, id: &ObjectIdentifier) -> bool {
        self.parent_chain.contains(id)
    }

    #[inline]
    pub(crate) fn parent_chain_len(&self) -> usize {
        self.parent_chain.len()
    }

    #[inline]
    pub(crate) fn push_parent(&mut self, id: ObjectIdentifier) {
        self.parent_chain.push(id);
    }

    #[inline]
    pub(crate) fn set_in_content_stream(&mut self, val: bool) {
        self.in_content_stream = val;
    }
}

/// A type that can be parsed from PDF syntax.
pub trait Readable<'a>: Sized {
    /// Read a value at the reader's current position.
    ///
    /// Implementations may leave the reader at an arbitrary position on
    /// failure; [`ReaderExt::read`] restores it.
    fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self>;

    /// Parse a value from a standalone byte slice, without an xref table.
    fn from_bytes(b: &'a [u8]) -> Option<Self> {
        let ctx = ReaderContext::dummy();
        Reader::new(b).read(&ctx)
    }
}

/// A type whose textual representation can be skipped over without
/// materializing it.
pub trait Skippable {
    /// Skip a value at the reader's current position.
    fn skip(r: &mut Reader<'_>, in_content_stream: bool) -> Option<()>;
}

/// Extension methods for [`Reader`] tying it to [`Readable`]/[`Skippable`].
pub trait ReaderExt<'a> {
    /// Read a `T`, restoring the position on failure.
    fn read<T: Readable<'a>>(&mut self, ctx: &ReaderContext<'a>) -> Option<T>;
    /// Read a `T` without an xref table behind it.
    fn read_plain<T: Readable<'a>>(&mut self) -> Option<T>;
    /// Skip a `T`, restoring the position on failure. Returns the skipped bytes.
    fn skip_obj<T: Skippable>(&mut self, in_content_stream: bool) -> Option<&'a [u8]>;
    /// Skip over white-space characters.
    fn skip_white_spaces(&mut self);
    /// Skip over white-space characters and comments.
    fn skip_white_spaces_and_comments(&mut self);
}

impl<'a> ReaderExt<'a> for Reader<'a> {
    #[inline]
    fn read<T: Readable<'a>>(&mut self, ctx: &ReaderContext<'a>) -> Option<T> {
        let old_offset = self.offset;

        T::read(self, ctx).or_else(|| {
            self.offset = old_offset;

            None
        })
    }

    #[inline]
    fn read_plain<T: Readable<'a>>(&mut self) -> Option<T> {
        let ctx = ReaderContext::dummy();
        self.read(&ctx)
    }

    #[inline]
    fn skip_obj<T: Skippable>(&mut self, in_content_stream: bool) -> Option<&'a [u8]> {
        let old_offset = self.offset;

        T::skip(self, in_content_stream).or_else(|| {
            self.offset = old_offset;

            None
        })?;

        self.data.get(old_offset..self.offset)
    }

    #[inline]
    fn skip_white_spaces(&mut self) {
        self.forward_while(is_white_space);
    }

    #[inline]
    fn skip_white_spaces_and_comments(&mut self) {
        loop {
            self.skip_white_spaces();

            if self.peek_byte() == Some(b'%') {
                let _ = Comment::skip(self, false);
            } else {
                return;
            }
        }
    }
}
