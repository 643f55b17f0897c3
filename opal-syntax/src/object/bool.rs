//! Booleans.

use crate::object::Object;
use crate::reader::{Readable, Reader, ReaderContext, Skippable};

impl Skippable for bool {
    fn skip(r: &mut Reader<'_>, _: bool) -> Option<()> {
        r.forward_tag(b"true").or_else(|| r.forward_tag(b"false"))
    }
}

impl Readable<'_> for bool {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        if r.forward_tag(b"true").is_some() {
            Some(true)
        } else if r.forward_tag(b"false").is_some() {
            Some(false)
        } else {
            None
        }
    }
}

impl<'a> TryFrom<Object<'a>> for bool {
    type Error = ();

    fn try_from(value: Object<'a>) -> Result<Self, ()> {
        match value {
            Object::Boolean(b) => Ok(b),
            _ => Err(()),
        }
    }
}

impl<'a> crate::object::ObjectLike<'a> for bool {}
