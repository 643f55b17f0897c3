//! Indirect objects.

use crate::object::ObjectIdentifier;
use crate::reader::{Readable, Reader, ReaderContext, ReaderExt};
use log::debug;

/// An indirect object: `N G obj … endobj`.
#[derive(Debug, Clone)]
pub struct IndirectObject<T> {
    id: ObjectIdentifier,
    inner: T,
}

impl<T> IndirectObject<T> {
    /// The identifier of the object.
    pub fn id(&self) -> &ObjectIdentifier {
        &self.id
    }

    /// Consume the wrapper, returning the contained object.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<'a, T: Readable<'a>> Readable<'a> for IndirectObject<T> {
    fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
        let id = r.read::<ObjectIdentifier>(ctx)?;
        r.skip_white_spaces_and_comments();

        let inner = r.read::<T>(ctx)?;
        r.skip_white_spaces_and_comments();

        if r.forward_tag(b"endobj").is_none() {
            // Real-world files frequently have junk between the object and
            // its `endobj`; scan forward for it, giving up at the start of
            // the next object or at the end of the data.
            debug!("lenient scan for endobj of object {}", id.num);

            loop {
                if r.at_end() {
                    break;
                }

                if r.forward_tag(b"endobj").is_some() {
                    break;
                }

                if r.peek_tag(b"obj").is_some() {
                    break;
                }

                r.forward();
            }
        }

        Some(IndirectObject { id, inner })
    }
}

#[cfg(test)]
mod tests {
    use crate::object::indirect::IndirectObject;
    use crate::object::Object;
    use crate::reader::Readable;

    #[test]
    fn indirect_1() {
        let obj = IndirectObject::<Object>::from_bytes(b"4 0 obj\n<< /A 1 >>\nendobj").unwrap();
        assert_eq!(obj.id().num, 4);
        assert!(matches!(obj.into_inner(), Object::Dict(_)));
    }

    #[test]
    fn indirect_missing_endobj() {
        let obj = IndirectObject::<Object>::from_bytes(b"4 0 obj 17 garbage").unwrap();
        assert_eq!(obj.id().num, 4);
        assert!(matches!(obj.into_inner(), Object::Number(_)));
    }

    #[test]
    fn indirect_stream() {
        let data = b"7 1 obj\n<< /Length 3 >>\nstream\nabc\nendstream\nendobj";
        let obj = IndirectObject::<Object>::from_bytes(data).unwrap();
        assert_eq!(obj.id().gen, 1);
        assert!(matches!(obj.into_inner(), Object::Stream(_)));
    }
}
