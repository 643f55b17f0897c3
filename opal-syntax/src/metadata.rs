//! Document metadata.

use crate::object::Dict;

/// The document information entries. Absent entries are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// The document title.
    pub title: String,
    /// The author.
    pub author: String,
    /// The subject.
    pub subject: String,
    /// The keywords.
    pub keywords: String,
    /// The application that created the original document.
    pub creator: String,
    /// The application that produced the PDF.
    pub producer: String,
    /// The creation date, in PDF date syntax (`D:YYYYMMDD…`).
    pub creation_date: String,
    /// The last modification date, in PDF date syntax.
    pub mod_date: String,
}

impl Metadata {
    pub(crate) fn from_info(info: Option<Dict<'_>>) -> Metadata {
        let Some(info) = info else {
            return Metadata::default();
        };

        let entry = |key: &[u8]| {
            info.get::<crate::object::String>(key)
                .map(|s| text_string(&s.get()))
                .unwrap_or_default()
        };

        Metadata {
            title: entry(b"Title"),
            author: entry(b"Author"),
            subject: entry(b"Subject"),
            keywords: entry(b"Keywords"),
            creator: entry(b"Creator"),
            producer: entry(b"Producer"),
            creation_date: entry(b"CreationDate"),
            mod_date: entry(b"ModDate"),
        }
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark,
/// otherwise treated as Latin-1 (a superset of PDFDocEncoding's ASCII
/// range, which covers the strings seen in practice).
pub fn text_string(bytes: &[u8]) -> String {
    if let Some(stripped) = bytes.strip_prefix(&[0xfe, 0xff]) {
        let units: Vec<u16> = stripped
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();

        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|b| char::from(*b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::text_string;

    #[test]
    fn latin() {
        assert_eq!(text_string(b"Hello"), "Hello");
        assert_eq!(text_string(&[0x48, 0xe9]), "Hé");
    }

    #[test]
    fn utf16() {
        assert_eq!(
            text_string(&[0xfe, 0xff, 0x00, 0x48, 0x00, 0x69]),
            "Hi"
        );
    }

    #[test]
    fn empty() {
        assert_eq!(text_string(b""), "");
    }
}
