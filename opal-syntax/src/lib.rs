/*!
A low-level library for reading PDF files.

This crate implements the syntax layer of the PDF file format: the object
model, cross-reference tables (in all their incarnations), stream filters
and content-stream tokenization. It is the foundation the `opal-interpret`
and `opal` crates are built on, but it can be used on its own to inspect
PDF files.

# Example
```no_run
use opal_syntax::Pdf;
use std::sync::Arc;

let data = std::fs::read("file.pdf").unwrap();
let pdf = Pdf::new(Arc::new(data)).unwrap();

for page in pdf.pages().iter() {
    for op in page.operations() {
        println!("{:?}", op.operator);
    }
}
```

# Safety
There is a single usage of `unsafe`, needed to hand out borrows of decoded
object-stream payloads from an append-only cache. All parser code is free
of `unsafe`.
*/

#![deny(missing_docs)]

use std::sync::Arc;

pub(crate) mod trivia;

pub mod byte_reader;
pub mod content;
pub mod filter;
pub mod metadata;
pub mod object;
pub mod page;
pub mod pdf;
pub mod reader;
pub mod xref;

pub use pdf::*;

/// A container for the bytes of a PDF file.
pub type PdfData = Arc<dyn AsRef<[u8]> + Send + Sync>;
