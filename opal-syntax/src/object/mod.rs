//! The PDF object model.

use crate::reader::{Readable, Reader, ReaderContext, ReaderExt, Skippable};
use std::fmt::Debug;

pub mod array;
pub mod bool;
pub mod dict;
pub mod indirect;
pub mod name;
pub mod null;
pub mod number;
pub mod rect;
pub mod r#ref;
pub mod stream;
pub mod string;

pub use array::Array;
pub use dict::Dict;
pub use indirect::IndirectObject;
pub use name::Name;
pub use null::Null;
pub use number::Number;
pub use r#ref::{MaybeRef, ObjRef};
pub use rect::Rect;
pub use stream::Stream;
pub use string::String;

/// A trait for types a PDF object can be cast into.
pub(crate) trait ObjectLike<'a>: TryFrom<Object<'a>> + Readable<'a> + Debug + Clone {}

macro_rules! object {
    ($t:ident $(<$l:lifetime>),*, $variant:ident) => {
        impl<'a> TryFrom<crate::object::Object<'a>> for $t$(<$l>),* {
            type Error = ();

            fn try_from(value: crate::object::Object<'a>) -> std::result::Result<Self, ()> {
                match value {
                    crate::object::Object::$variant(v) => Ok(v),
                    _ => Err(()),
                }
            }
        }

        impl<'a> crate::object::ObjectLike<'a> for $t$(<$l>),* {}
    };
}

pub(crate) use object;

/// A primitive PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object<'a> {
    /// The null object.
    Null(Null),
    /// A boolean.
    Boolean(bool),
    /// An integer or real number.
    Number(Number),
    /// A literal or hex string.
    String(string::String<'a>),
    /// A name.
    Name(Name),
    /// An array.
    Array(Array<'a>),
    /// A dictionary.
    Dict(Dict<'a>),
    /// A stream.
    Stream(Stream<'a>),
}

impl<'a> Object<'a> {
    /// Try casting the object to a specific subtype.
    pub(crate) fn cast<T>(self) -> Option<T>
    where
        T: ObjectLike<'a>,
    {
        self.try_into().ok()
    }

    /// Cast into a dictionary.
    #[inline]
    pub fn into_dict(self) -> Option<Dict<'a>> {
        self.cast()
    }

    /// Cast into an array.
    #[inline]
    pub fn into_array(self) -> Option<Array<'a>> {
        self.cast()
    }

    /// Cast into a stream.
    #[inline]
    pub fn into_stream(self) -> Option<Stream<'a>> {
        self.cast()
    }

    /// Cast into a name.
    #[inline]
    pub fn into_name(self) -> Option<Name> {
        self.cast()
    }

    /// Cast into a string.
    #[inline]
    pub fn into_string(self) -> Option<string::String<'a>> {
        self.cast()
    }

    /// Cast into a number.
    #[inline]
    pub fn into_number(self) -> Option<Number> {
        self.cast()
    }

    /// Cast into an f32.
    #[inline]
    pub fn into_f32(self) -> Option<f32> {
        self.cast()
    }

    /// Whether this is the null object.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null(_))
    }
}

impl<'a> ObjectLike<'a> for Object<'a> {}

impl Skippable for Object<'_> {
    fn skip(r: &mut Reader<'_>, in_content_stream: bool) -> Option<()> {
        match r.peek_byte()? {
            b'n' => Null::skip(r, in_content_stream),
            b't' | b'f' => bool::skip(r, in_content_stream),
            b'/' => Name::skip(r, in_content_stream),
            b'<' => match r.peek_bytes(2)? {
                // A stream can never appear inside a dict or array, so a
                // dict is the only possibility here.
                b"<<" => Dict::skip(r, in_content_stream),
                _ => string::String::skip(r, in_content_stream),
            },
            b'(' => string::String::skip(r, in_content_stream),
            b'.' | b'+' | b'-' | b'0'..=b'9' => Number::skip(r, in_content_stream),
            b'[' => Array::skip(r, in_content_stream),
            _ => None,
        }
    }
}

impl<'a> Readable<'a> for Object<'a> {
    fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
        let object = match r.peek_byte()? {
            b'n' => Self::Null(r.read(ctx)?),
            b't' | b'f' => Self::Boolean(r.read(ctx)?),
            b'/' => Self::Name(r.read(ctx)?),
            b'<' => match r.peek_bytes(2)? {
                b"<<" => {
                    let mut probe = r.clone();
                    let dict = probe.read::<Dict>(ctx)?;
                    probe.skip_white_spaces_and_comments();

                    if probe.peek_tag(b"stream").is_some() {
                        Object::Stream(r.read(ctx)?)
                    } else {
                        r.jump(probe.offset());

                        Object::Dict(dict)
                    }
                }
                _ => Self::String(r.read(ctx)?),
            },
            b'(' => Self::String(r.read(ctx)?),
            b'.' | b'+' | b'-' | b'0'..=b'9' => Self::Number(r.read(ctx)?),
            b'[' => Self::Array(r.read(ctx)?),
            _ => return None,
        };

        Some(object)
    }
}

/// The number and generation of an indirect object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObjectIdentifier {
    /// The object number.
    pub num: i32,
    /// The generation number.
    pub gen: i32,
}

impl ObjectIdentifier {
    /// Create a new object identifier.
    pub fn new(num: i32, gen: i32) -> Self {
        Self { num, gen }
    }
}

impl Readable<'_> for ObjectIdentifier {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        let num = r.read_plain::<i32>()?;
        r.skip_white_spaces_and_comments();
        let gen = r.read_plain::<i32>()?;
        r.skip_white_spaces_and_comments();
        r.forward_tag(b"obj")?;

        if num < 1 || gen < 0 {
            return None;
        }

        Some(ObjectIdentifier { num, gen })
    }
}

#[cfg(test)]
mod tests {
    use crate::object::Object;
    use crate::reader::{Readable, ReaderExt};
    use crate::reader::Reader;

    fn object_impl(data: &[u8]) -> Option<Object<'_>> {
        Object::from_bytes(data)
    }

    #[test]
    fn null() {
        assert!(matches!(object_impl(b"null").unwrap(), Object::Null(_)));
    }

    #[test]
    fn boolean() {
        assert!(matches!(object_impl(b"true").unwrap(), Object::Boolean(true)));
        assert!(matches!(object_impl(b"false").unwrap(), Object::Boolean(false)));
    }

    #[test]
    fn number() {
        assert!(matches!(object_impl(b"34.5").unwrap(), Object::Number(_)));
    }

    #[test]
    fn literal_string() {
        assert!(matches!(object_impl(b"(Hi)").unwrap(), Object::String(_)));
    }

    #[test]
    fn hex_string() {
        assert!(matches!(object_impl(b"<34>").unwrap(), Object::String(_)));
    }

    #[test]
    fn name() {
        assert!(matches!(object_impl(b"/Name").unwrap(), Object::Name(_)));
    }

    #[test]
    fn dict() {
        assert!(matches!(
            object_impl(b"<</Entry 45>>").unwrap(),
            Object::Dict(_)
        ));
    }

    #[test]
    fn array() {
        assert!(matches!(object_impl(b"[45]").unwrap(), Object::Array(_)));
    }

    #[test]
    fn stream() {
        assert!(matches!(
            object_impl(b"<< /Length 3 >> stream\nabc\nendstream").unwrap(),
            Object::Stream(_)
        ));
    }

    #[test]
    fn garbage() {
        assert!(object_impl(b"}garbage").is_none());
    }

    #[test]
    fn object_identifier() {
        use crate::object::ObjectIdentifier;

        let id = ObjectIdentifier::from_bytes(b"12 0 obj").unwrap();
        assert_eq!(id.num, 12);
        assert_eq!(id.gen, 0);

        assert!(ObjectIdentifier::from_bytes(b"0 0 obj").is_none());
        assert!(ObjectIdentifier::from_bytes(b"12 0 xobj").is_none());
    }

    #[test]
    fn comment_between_tokens() {
        let mut r = Reader::new(b"% a comment\n  42");
        r.skip_white_spaces_and_comments();
        assert!(matches!(
            r.read_plain::<Object>().unwrap(),
            Object::Number(_)
        ));
    }
}
