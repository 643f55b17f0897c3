//! Literal and hex strings.

use crate::object::object;
use crate::reader::{Readable, Reader, ReaderContext, Skippable};
use crate::trivia::is_white_space;
use std::borrow::Cow;

/// A PDF string: an arbitrary byte sequence, written either as a literal
/// string in parentheses or as a hex string in angle brackets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct String<'a> {
    data: &'a [u8],
    kind: Kind,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum Kind {
    /// Literal string, `data` excludes the outer parentheses.
    Literal,
    /// Hex string, `data` excludes the outer angle brackets.
    Hex,
}

impl<'a> String<'a> {
    /// The decoded content of the string.
    pub fn get(&self) -> Cow<'a, [u8]> {
        match self.kind {
            Kind::Literal => decode_literal(self.data),
            Kind::Hex => Cow::Owned(decode_hex(self.data)),
        }
    }
}

object!(String<'a>, String);

impl Skippable for String<'_> {
    fn skip(r: &mut Reader<'_>, _: bool) -> Option<()> {
        match r.peek_byte()? {
            b'(' => skip_literal(r),
            b'<' => skip_hex(r),
            _ => None,
        }
    }
}

impl<'a> Readable<'a> for String<'a> {
    fn read(r: &mut Reader<'a>, _: &ReaderContext<'a>) -> Option<Self> {
        let kind = match r.peek_byte()? {
            b'(' => Kind::Literal,
            b'<' => Kind::Hex,
            _ => return None,
        };

        let start = r.offset();
        match kind {
            Kind::Literal => skip_literal(r)?,
            Kind::Hex => skip_hex(r)?,
        }
        let end = r.offset();

        // Exclude the outer brackets.
        let data = r.range(start + 1..end - 1)?;

        Some(String { data, kind })
    }
}

fn skip_literal(r: &mut Reader<'_>) -> Option<()> {
    r.forward_tag(b"(")?;
    let mut parens = 1u32;

    while parens > 0 {
        match r.read_byte()? {
            b'\\' => {
                let _ = r.read_byte()?;
            }
            b'(' => parens += 1,
            b')' => parens -= 1,
            _ => {}
        }
    }

    Some(())
}

fn skip_hex(r: &mut Reader<'_>) -> Option<()> {
    r.forward_tag(b"<")?;
    r.forward_while(|b| b.is_ascii_hexdigit() || is_white_space(b));
    r.forward_tag(b">")?;

    Some(())
}

fn decode_literal(data: &[u8]) -> Cow<'_, [u8]> {
    if !data.contains(&b'\\') && !data.contains(&b'\r') && !data.contains(&b'\n') {
        return Cow::Borrowed(data);
    }

    let mut out = Vec::with_capacity(data.len());
    let mut r = Reader::new(data);

    while let Some(byte) = r.read_byte() {
        match byte {
            b'\\' => {
                let next = match r.read_byte() {
                    Some(n) => n,
                    None => break,
                };

                match next {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'(' | b')' | b'\\' => out.push(next),
                    b'0'..=b'7' => {
                        // One to three octal digits; overflow wraps into a
                        // single byte.
                        let mut v = u16::from(next - b'0');
                        for _ in 0..2 {
                            match r.eat(|b| (b'0'..=b'7').contains(&b)) {
                                Some(d) => v = v * 8 + u16::from(d - b'0'),
                                None => break,
                            }
                        }
                        out.push((v & 0xff) as u8);
                    }
                    // A reverse solidus followed by an end-of-line marker
                    // continues the string on the next line; both are dropped.
                    b'\r' => {
                        if r.peek_byte() == Some(b'\n') {
                            r.forward();
                        }
                    }
                    b'\n' => {}
                    other => out.push(other),
                }
            }
            // An unescaped end-of-line marker reads as a single line feed.
            b'\r' => {
                out.push(b'\n');
                if r.peek_byte() == Some(b'\n') {
                    r.forward();
                }
            }
            other => out.push(other),
        }
    }

    Cow::Owned(out)
}

fn decode_hex(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 + 1);
    let mut high: Option<u8> = None;

    for b in data {
        let nibble = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => continue,
        };

        match high.take() {
            Some(h) => out.push(h << 4 | nibble),
            None => high = Some(nibble),
        }
    }

    // An odd trailing nibble is padded with zero.
    if let Some(h) = high {
        out.push(h << 4);
    }

    out
}

#[cfg(test)]
mod tests {
    use crate::object::String;
    use crate::reader::Readable;

    fn string(data: &[u8]) -> Option<Vec<u8>> {
        String::from_bytes(data).map(|s| s.get().into_owned())
    }

    #[test]
    fn literal_1() {
        assert_eq!(string(b"(Hello)").unwrap(), b"Hello");
    }

    #[test]
    fn literal_nested_parens() {
        assert_eq!(
            string(b"(strings can contain (balanced) parens)").unwrap(),
            b"strings can contain (balanced) parens"
        );
    }

    #[test]
    fn literal_escapes() {
        assert_eq!(string(br"(\n\r\t\b\f)").unwrap(), b"\n\r\t\x08\x0c");
        assert_eq!(string(br"(\(\)\\)").unwrap(), b"()\\");
    }

    #[test]
    fn literal_octal() {
        assert_eq!(string(br"(\101)").unwrap(), b"A");
        assert_eq!(string(br"(\53)").unwrap(), b"+");
        assert_eq!(string(br"(\0053)").unwrap(), b"\x053");
        // Four digits: three are consumed, the fourth is literal.
        assert_eq!(string(br"(\1234)").unwrap(), b"S4");
    }

    #[test]
    fn literal_unknown_escape() {
        assert_eq!(string(br"(\q)").unwrap(), b"q");
    }

    #[test]
    fn literal_line_continuation() {
        assert_eq!(string(b"(ab\\\ncd)").unwrap(), b"abcd");
        assert_eq!(string(b"(ab\\\r\ncd)").unwrap(), b"abcd");
    }

    #[test]
    fn literal_eol_normalization() {
        assert_eq!(string(b"(a\r\nb)").unwrap(), b"a\nb");
        assert_eq!(string(b"(a\rb)").unwrap(), b"a\nb");
        assert_eq!(string(b"(a\nb)").unwrap(), b"a\nb");
    }

    #[test]
    fn hex_1() {
        assert_eq!(string(b"<48656C6C6F>").unwrap(), b"Hello");
    }

    #[test]
    fn hex_lowercase_and_whitespace() {
        assert_eq!(string(b"<48 65\n6c 6c 6f>").unwrap(), b"Hello");
    }

    #[test]
    fn hex_odd_nibble() {
        assert_eq!(string(b"<901FA>").unwrap(), &[0x90, 0x1f, 0xa0]);
    }

    #[test]
    fn hex_empty() {
        assert_eq!(string(b"<>").unwrap(), b"");
    }

    #[test]
    fn unterminated() {
        assert!(string(b"(abc").is_none());
        assert!(string(b"<48").is_none());
    }
}
