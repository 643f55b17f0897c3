//! Object references.

use crate::object::{Object, ObjectIdentifier, ObjectLike};
use crate::reader::{Readable, Reader, ReaderContext, ReaderExt, Skippable};
use crate::trivia::is_regular;

/// A reference to an indirect object (`N G R`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObjRef {
    /// The object number.
    pub num: i32,
    /// The generation number.
    pub gen: i32,
}

impl From<ObjRef> for ObjectIdentifier {
    fn from(value: ObjRef) -> Self {
        ObjectIdentifier::new(value.num, value.gen)
    }
}

impl Skippable for ObjRef {
    fn skip(r: &mut Reader<'_>, _: bool) -> Option<()> {
        let ctx = ReaderContext::dummy();
        ObjRef::read(r, &ctx).map(|_| ())
    }
}

impl Readable<'_> for ObjRef {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        let num = r.read_plain::<i32>()?;
        r.skip_white_spaces_and_comments();
        let gen = r.read_plain::<i32>()?;
        r.skip_white_spaces_and_comments();
        r.forward_tag(b"R")?;

        // `R` must be a standalone token, otherwise this could be the
        // beginning of a keyword.
        if r.peek_byte().is_some_and(is_regular) {
            return None;
        }

        if num < 1 || gen < 0 {
            return None;
        }

        Some(ObjRef { num, gen })
    }
}

/// A value that is either a direct object or a reference to one.
///
/// Reading a `MaybeRef` performs the speculative look-ahead the PDF syntax
/// requires: an integer might be the beginning of `N G R`, and only if that
/// full pattern matches is a reference produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MaybeRef<T> {
    /// An object reference.
    Ref(ObjRef),
    /// A direct object.
    Direct(T),
}

#[allow(private_bounds)]
impl<'a, T> MaybeRef<T>
where
    T: ObjectLike<'a>,
{
    /// Resolve the value through the xref table of the given context.
    pub fn resolve(self, ctx: &ReaderContext<'a>) -> Option<T> {
        match self {
            MaybeRef::Direct(v) => Some(v),
            MaybeRef::Ref(r) => ctx.xref().get_with::<T>(r.into(), ctx),
        }
    }

    /// Return the contained direct object, if any.
    pub fn into_direct(self) -> Option<T> {
        match self {
            MaybeRef::Direct(v) => Some(v),
            MaybeRef::Ref(_) => None,
        }
    }
}

impl<'a, T: Readable<'a>> Readable<'a> for MaybeRef<T> {
    fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
        // References cannot occur in content streams, so numbers there are
        // always plain numbers.
        if !ctx.in_content_stream() {
            if let Some(obj_ref) = r.read_plain::<ObjRef>() {
                return Some(MaybeRef::Ref(obj_ref));
            }
        }

        T::read(r, ctx).map(MaybeRef::Direct)
    }
}

impl<T: Skippable> Skippable for MaybeRef<T> {
    fn skip(r: &mut Reader<'_>, in_content_stream: bool) -> Option<()> {
        if !in_content_stream && r.skip_obj::<ObjRef>(false).is_some() {
            return Some(());
        }

        T::skip(r, in_content_stream)
    }
}

/// Extract a reference or an object from raw bytes.
pub type MaybeRefObject<'a> = MaybeRef<Object<'a>>;

#[cfg(test)]
mod tests {
    use crate::object::r#ref::{MaybeRef, ObjRef};
    use crate::object::Object;
    use crate::reader::Readable;

    #[test]
    fn plain_ref() {
        let r = ObjRef::from_bytes(b"12 0 R").unwrap();
        assert_eq!(r.num, 12);
        assert_eq!(r.gen, 0);
    }

    #[test]
    fn not_a_ref() {
        assert!(ObjRef::from_bytes(b"12 0 Rect").is_none());
        assert!(ObjRef::from_bytes(b"12 0").is_none());
        assert!(ObjRef::from_bytes(b"12").is_none());
    }

    #[test]
    fn maybe_ref_number() {
        // The speculative look-ahead must fall back to the number when the
        // trailing `R` is missing.
        let v = MaybeRef::<Object>::from_bytes(b"12 0 obj").unwrap();
        assert!(matches!(v, MaybeRef::Direct(Object::Number(_))));
    }

    #[test]
    fn maybe_ref_ref() {
        let v = MaybeRef::<Object>::from_bytes(b"12 0 R").unwrap();
        assert!(matches!(v, MaybeRef::Ref(_)));
    }
}
