//! Tokenizing content streams.
//!
//! A content stream is a postfix language: operands accumulate on a stack
//! until an operator token consumes them. The iterator here produces one
//! [`Operation`] per operator, leaving interpretation of the operators to
//! higher layers.

use crate::object::name::skip_name_like;
use crate::object::{Dict, Object, ObjectLike, Stream};
use crate::reader::{Reader, ReaderContext, ReaderExt};
use crate::trivia::is_white_space;
use log::warn;
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;

// Six operands covers the common worst cases (`cm`, `c`); anything beyond
// spills to the heap.
const OPERAND_THRESHOLD: usize = 6;

/// An operator token of a content stream.
#[derive(Clone, PartialEq, Eq)]
pub struct Operator<'a>(&'a [u8]);

impl Debug for Operator<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0))
    }
}

impl Deref for Operator<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl AsRef<[u8]> for Operator<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0
    }
}

/// An operator together with its accumulated operands.
pub struct Operation<'a> {
    /// The operand stack, in the order the operands appeared.
    pub operands: Stack<'a>,
    /// The operator that consumed them.
    pub operator: Operator<'a>,
}

/// The operand stack of one operation.
#[derive(Debug, Clone, Default)]
pub struct Stack<'a>(SmallVec<[Object<'a>; OPERAND_THRESHOLD]>);

impl<'a> Stack<'a> {
    fn new() -> Self {
        Self(SmallVec::new())
    }

    fn push(&mut self, operand: Object<'a>) {
        self.0.push(operand);
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    /// The number of operands.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The operand at `index`, cast to `T`.
    #[allow(private_bounds)]
    pub fn get<T>(&self, index: usize) -> Option<T>
    where
        T: ObjectLike<'a>,
    {
        self.0.get(index).and_then(|o| o.clone().cast::<T>())
    }

    /// An f32 operand at `index`.
    pub fn num(&self, index: usize) -> Option<f32> {
        self.get::<f32>(index)
    }

    /// All operands interpreted as f32s, in order. `None` if any operand
    /// is not a number.
    pub fn all_nums(&self) -> Option<SmallVec<[f32; OPERAND_THRESHOLD]>> {
        let mut out = SmallVec::new();

        for op in &self.0 {
            out.push(op.clone().cast::<f32>()?);
        }

        Some(out)
    }

    /// An iterator over the raw operands.
    pub fn iter(&self) -> impl Iterator<Item = &Object<'a>> {
        self.0.iter()
    }
}

/// An iterator over the operations of a content stream.
pub struct OperationIter<'a> {
    reader: Reader<'a>,
    stack: Stack<'a>,
    ctx: ReaderContext<'a>,
}

impl<'a> OperationIter<'a> {
    /// Create an iterator over the given decoded content-stream bytes.
    pub fn new(data: &'a [u8]) -> OperationIter<'a> {
        Self {
            reader: Reader::new(data),
            stack: Stack::new(),
            ctx: ReaderContext::content_stream(),
        }
    }

    /// An iterator over no operations.
    pub fn empty() -> OperationIter<'a> {
        Self::new(&[])
    }

    /// Capture an inline image: the dictionary entries between `BI` and
    /// `ID`, then raw data up to a standalone `EI`.
    fn read_inline_image(&mut self) -> Option<Stream<'a>> {
        // `Dict::read_inline` consumes the `ID` keyword.
        let dict = Dict::read_inline(&mut self.reader, &self.ctx)?;

        // Exactly one whitespace byte separates `ID` from the data.
        let _ = self.reader.read_byte()?;

        let start = self.reader.offset();

        loop {
            if self.reader.peek_bytes(2).is_none() {
                warn!("inline image without EI terminator");

                return None;
            }

            if self.reader.peek_tag(b"EI").is_some() {
                let before = self.reader.offset().checked_sub(1)?;
                let after = self.reader.offset() + 2;

                // `EI` counts only at a token boundary, since the marker
                // can also occur inside the raw image bytes.
                let boundary_before = is_white_space(self.reader.data[before]);
                let boundary_after = self
                    .reader
                    .range(after..after + 1)
                    .map(|b| !crate::trivia::is_regular(b[0]))
                    .unwrap_or(true);

                if boundary_before && boundary_after {
                    let data = self.reader.range(start..before)?;
                    self.reader.jump(after);

                    return Some(Stream::from_parts(dict, data));
                }
            }

            self.reader.forward();
        }
    }
}

impl<'a> Iterator for OperationIter<'a> {
    type Item = Operation<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.clear();

        self.reader.skip_white_spaces_and_comments();

        while !self.reader.at_end() {
            if matches!(
                self.reader.peek_byte()?,
                b'/' | b'.' | b'+' | b'-' | b'0'..=b'9' | b'[' | b'<' | b'('
            ) {
                match self.reader.read::<Object>(&self.ctx) {
                    Some(obj) => self.stack.push(obj),
                    None => {
                        warn!("unparseable operand in content stream, dropping the rest");

                        self.reader.jump_to_end();
                        return None;
                    }
                }
            } else {
                let start = self.reader.offset();

                if skip_name_like(&mut self.reader, false).is_none() {
                    warn!("unparseable operator in content stream, dropping the rest");

                    self.reader.jump_to_end();
                    return None;
                }

                let operator = Operator(self.reader.range(start..self.reader.offset())?);

                // Inline images are the one place where the operand follows
                // the operator; capture the whole image as a stream operand.
                if operator.as_ref() == b"BI" {
                    self.reader.skip_white_spaces_and_comments();

                    match self.read_inline_image() {
                        Some(stream) => self.stack.push(Object::Stream(stream)),
                        None => {
                            self.reader.jump_to_end();
                            return None;
                        }
                    }
                }

                return Some(Operation {
                    operands: self.stack.clone(),
                    operator,
                });
            }

            self.reader.skip_white_spaces_and_comments();
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use crate::content::OperationIter;
    use crate::object::{Array, Name, Object};

    #[test]
    fn operands_accumulate() {
        let ops: Vec<_> = OperationIter::new(b"1 0 0 1 50 50 cm BT ET").collect();

        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].operator.as_ref(), b"cm");
        assert_eq!(ops[0].operands.len(), 6);
        assert_eq!(ops[0].operands.num(4), Some(50.0));
        assert_eq!(ops[1].operator.as_ref(), b"BT");
        assert!(ops[1].operands.is_empty());
    }

    #[test]
    fn array_operand() {
        let ops: Vec<_> = OperationIter::new(b"[(A) -120 (B)] TJ").collect();

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operator.as_ref(), b"TJ");
        assert_eq!(ops[0].operands.len(), 1);

        let arr = ops[0].operands.get::<Array>(0).unwrap();
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn name_operand() {
        let ops: Vec<_> = OperationIter::new(b"/F1 12 Tf").collect();

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operands.get::<Name>(0).unwrap().as_ref(), b"F1");
        assert_eq!(ops[0].operands.num(1), Some(12.0));
    }

    #[test]
    fn starred_operators() {
        let ops: Vec<_> = OperationIter::new(b"f* B* W* T*").collect();
        let names: Vec<_> = ops.iter().map(|o| o.operator.as_ref().to_vec()).collect();

        assert_eq!(names, vec![b"f*".to_vec(), b"B*".to_vec(), b"W*".to_vec(), b"T*".to_vec()]);
    }

    #[test]
    fn quote_operators() {
        let ops: Vec<_> = OperationIter::new(b"(x) ' (y) \"").collect();

        assert_eq!(ops[0].operator.as_ref(), b"'");
        assert_eq!(ops[1].operator.as_ref(), b"\"");
    }

    #[test]
    fn operands_cleared_between_operators() {
        let ops: Vec<_> = OperationIter::new(b"1 2 unknownop 3 m").collect();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].operands.len(), 1);
    }

    #[test]
    fn inline_image() {
        let data = b"BI /W 2 /H 2 /BPC 8 /CS /G ID \x01\x02\x03\x04 EI Q";
        let ops: Vec<_> = OperationIter::new(data).collect();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].operator.as_ref(), b"BI");

        let stream = match ops[0].operands.get::<Object>(0).unwrap() {
            Object::Stream(s) => s,
            other => panic!("expected stream operand, got {other:?}"),
        };

        assert_eq!(stream.dict().get::<i64>(b"W"), Some(2));
        assert_eq!(stream.raw_data(), &[1, 2, 3, 4]);
        assert_eq!(ops[1].operator.as_ref(), b"Q");
    }

    #[test]
    fn comment_in_stream() {
        let ops: Vec<_> = OperationIter::new(b"% setup\n1 w").collect();

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operator.as_ref(), b"w");
    }
}
