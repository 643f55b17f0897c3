//! Arrays.

use crate::object::r#ref::MaybeRef;
use crate::object::{object, Object, ObjectLike};
use crate::reader::{Readable, Reader, ReaderContext, ReaderExt, Skippable};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// A PDF array.
///
/// Like dictionaries, arrays are lazy: they keep the raw byte range of
/// their elements and re-read them on iteration, resolving indirect
/// references through the xref table as they go.
#[derive(Clone)]
pub struct Array<'a> {
    /// The raw data, including the outer brackets.
    data: &'a [u8],
    ctx: ReaderContext<'a>,
}

impl<'a> Array<'a> {
    /// Create a new empty array.
    pub fn empty() -> Array<'a> {
        Array {
            data: b"[]",
            ctx: ReaderContext::dummy(),
        }
    }

    /// An iterator over the elements of the array, cast to `T`.
    ///
    /// References are resolved; elements that fail to resolve or are not
    /// a `T` are skipped.
    #[allow(private_bounds)]
    pub fn iter<T>(&self) -> ArrayIter<'a, T>
    where
        T: ObjectLike<'a>,
    {
        let mut reader = Reader::new(self.data);
        // Skip the opening bracket.
        let _ = reader.forward_tag(b"[");

        ArrayIter {
            reader,
            ctx: self.ctx.clone(),
            _phantom: PhantomData,
        }
    }

    /// An iterator over the raw (unresolved) elements of the array.
    pub fn raw_iter(&self) -> impl Iterator<Item = MaybeRef<Object<'a>>> + '_ {
        let mut reader = Reader::new(self.data);
        let _ = reader.forward_tag(b"[");
        let ctx = self.ctx.clone();

        std::iter::from_fn(move || {
            reader.skip_white_spaces_and_comments();

            if reader.at_end() || reader.peek_byte() == Some(b']') {
                return None;
            }

            reader.read::<MaybeRef<Object>>(&ctx).or_else(|| {
                // Unreadable element, drop the rest of the array.
                reader.jump_to_end();
                None
            })
        })
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.raw_iter().count()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `idx`, resolved and cast to `T`.
    #[allow(private_bounds)]
    pub fn get<T>(&self, idx: usize) -> Option<T>
    where
        T: ObjectLike<'a>,
    {
        self.raw_iter()
            .nth(idx)?
            .resolve(&self.ctx)?
            .cast::<T>()
    }
}

impl Default for Array<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl Debug for Array<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.raw_iter()).finish()
    }
}

impl PartialEq for Array<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

object!(Array<'a>, Array);

impl Skippable for Array<'_> {
    fn skip(r: &mut Reader<'_>, in_content_stream: bool) -> Option<()> {
        r.forward_tag(b"[")?;

        loop {
            r.skip_white_spaces_and_comments();

            if r.forward_tag(b"]").is_some() {
                return Some(());
            }

            if in_content_stream {
                r.skip_obj::<Object>(true)?;
            } else {
                r.skip_obj::<MaybeRef<Object>>(false)?;
            }
        }
    }
}

impl<'a> Readable<'a> for Array<'a> {
    fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
        let start = r.offset();
        Array::skip(r, ctx.in_content_stream())?;
        let data = r.range(start..r.offset())?;

        Some(Array {
            data,
            ctx: ctx.clone(),
        })
    }
}

/// An iterator over array elements cast to `T`.
pub struct ArrayIter<'a, T> {
    reader: Reader<'a>,
    ctx: ReaderContext<'a>,
    _phantom: PhantomData<T>,
}

impl<'a, T> Iterator for ArrayIter<'a, T>
where
    T: ObjectLike<'a>,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.reader.skip_white_spaces_and_comments();

            if self.reader.at_end() || self.reader.peek_byte() == Some(b']') {
                return None;
            }

            let raw = match self.reader.read::<MaybeRef<Object>>(&self.ctx) {
                Some(raw) => raw,
                None => {
                    self.reader.jump_to_end();
                    return None;
                }
            };

            // Elements of the wrong type are skipped rather than ending
            // the iteration.
            if let Some(obj) = raw.resolve(&self.ctx) {
                if let Some(cast) = obj.cast::<T>() {
                    return Some(cast);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::object::{Array, Number, Object};
    use crate::reader::Readable;

    #[test]
    fn array_1() {
        let arr = Array::from_bytes(b"[1 2 3]").unwrap();
        assert_eq!(arr.iter::<i64>().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn array_2() {
        let arr = Array::from_bytes(b"[]").unwrap();
        assert_eq!(arr.len(), 0);
        assert!(arr.is_empty());
    }

    #[test]
    fn array_mixed() {
        let arr = Array::from_bytes(b"[/Name (str) 4.5 [1 2]]").unwrap();
        assert_eq!(arr.len(), 4);
        assert_eq!(arr.get::<f32>(2), Some(4.5));
        assert!(arr.get::<Array>(3).is_some());
    }

    #[test]
    fn array_typed_skips_mismatches() {
        let arr = Array::from_bytes(b"[1 /Two 3]").unwrap();
        assert_eq!(arr.iter::<i64>().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn array_nested() {
        let arr = Array::from_bytes(b"[[1 [2]] [3]]").unwrap();
        assert_eq!(arr.len(), 2);
    }

    #[test]
    fn array_numbers() {
        let arr = Array::from_bytes(b"[0 0 612 792]").unwrap();
        let nums = arr.iter::<Number>().collect::<Vec<_>>();
        assert_eq!(nums.len(), 4);
        assert_eq!(nums[2].as_f64(), 612.0);
    }
}
