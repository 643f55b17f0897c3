//! The null object.

use crate::object::object;
use crate::reader::{Readable, Reader, ReaderContext, Skippable};

/// The PDF null object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Null;

object!(Null, Null);

impl Skippable for Null {
    fn skip(r: &mut Reader<'_>, _: bool) -> Option<()> {
        r.forward_tag(b"null")
    }
}

impl Readable<'_> for Null {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        r.forward_tag(b"null")?;

        Some(Null)
    }
}
