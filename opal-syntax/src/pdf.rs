//! The entry point for reading PDF files.

use crate::metadata::Metadata;
use crate::object::dict::keys::{PAGES, VERSION};
use crate::object::{Dict, Name};
use crate::page::Pages;
use crate::reader::{Reader, ReaderExt};
use crate::xref::{rebuilt_xref, root_xref, XRef, XRefError};
use crate::PdfData;
use log::warn;
use std::fmt;

/// The error produced when a file cannot be opened as a PDF.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The byte buffer is too short to be a PDF file.
    Io,
    /// No usable cross-reference data was found.
    MalformedXref,
    /// The document is encrypted, which is unsupported.
    Encrypted,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io => write!(f, "the data is too short to be a PDF file"),
            LoadError::MalformedXref => write!(f, "no usable cross-reference data was found"),
            LoadError::Encrypted => write!(f, "the document is encrypted"),
        }
    }
}

impl std::error::Error for LoadError {}

/// A PDF file.
pub struct Pdf {
    xref: XRef,
    header_version: Option<f32>,
}

impl Pdf {
    /// Read the given data as a PDF file.
    pub fn new(data: PdfData) -> Result<Self, LoadError> {
        // The shortest imaginable PDF still needs a header, one object and
        // a trailer.
        if data.as_ref().as_ref().len() < 8 {
            return Err(LoadError::Io);
        }

        let header_version = find_header_version(data.as_ref().as_ref());

        let xref = match root_xref(data.clone()) {
            Ok(xref) => xref,
            Err(XRefError::Encrypted) => return Err(LoadError::Encrypted),
            Err(XRefError::Malformed) => {
                rebuilt_xref(data).ok_or(LoadError::MalformedXref)?
            }
        };

        Ok(Self {
            xref,
            header_version,
        })
    }

    /// The xref table of the file.
    pub fn xref(&self) -> &XRef {
        &self.xref
    }

    /// The version of the file, preferring the catalog's `/Version` over
    /// the header.
    pub fn version(&self) -> f32 {
        let catalog_version = self
            .xref
            .catalog()
            .and_then(|c| c.get::<Name>(VERSION))
            .and_then(|name| std::str::from_utf8(name.as_ref()).ok()?.parse::<f32>().ok());

        catalog_version.or(self.header_version).unwrap_or(1.0)
    }

    /// The document metadata.
    pub fn metadata(&self) -> Metadata {
        Metadata::from_info(self.xref.info())
    }

    /// The pages of the document.
    pub fn pages(&self) -> Pages<'_> {
        let page_root = self.xref.catalog().and_then(|c| c.get::<Dict>(PAGES));

        match page_root {
            Some(root) => {
                let pages = Pages::new(&root);

                if pages.is_empty() {
                    warn!("page tree yielded no pages, scanning for page objects");

                    Pages::brute_force(&self.xref)
                } else {
                    pages
                }
            }
            None => {
                warn!("no page tree root, scanning for page objects");

                Pages::brute_force(&self.xref)
            }
        }
    }
}

/// Scan the first couple of bytes for `%PDF-` and parse the version after
/// it. Some files prepend junk before the header.
fn find_header_version(data: &[u8]) -> Option<f32> {
    let window = &data[..data.len().min(2048)];
    let mut r = Reader::new(window);

    while r.forward_tag(b"%PDF-").is_none() {
        r.read_byte()?;
    }

    r.read_plain::<f32>()
}
