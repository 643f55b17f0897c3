//! Streams.

use crate::filter::{Filter, FilterError};
use crate::object::dict::keys::{DECODE_PARMS, FILTER, LENGTH};
use crate::object::{object, Array, Dict, Name, Object};
use crate::reader::{Readable, Reader, ReaderContext, ReaderExt, Skippable};
use crate::trivia::is_white_space;
use log::warn;

/// A stream: a dictionary plus a byte payload.
#[derive(Clone)]
pub struct Stream<'a> {
    dict: Dict<'a>,
    data: &'a [u8],
}

impl<'a> Stream<'a> {
    /// Create a stream from an existing dictionary and payload (used for
    /// inline images, which have no `stream`/`endstream` framing).
    pub fn from_parts(dict: Dict<'a>, data: &'a [u8]) -> Self {
        Self { dict, data }
    }

    /// The stream dictionary.
    pub fn dict(&self) -> &Dict<'a> {
        &self.dict
    }

    /// The raw, still-encoded payload.
    pub fn raw_data(&self) -> &'a [u8] {
        self.data
    }

    /// The filter chain of the stream, with the decode parameters aligned
    /// per filter.
    pub fn filters(&self) -> Result<Vec<(Filter, Option<Dict<'a>>)>, FilterError> {
        // Inline images abbreviate `/Filter` and `/DecodeParms` as `/F`
        // and `/DP`.
        let filter_key: &[u8] = if self.dict.contains_key(FILTER) {
            FILTER
        } else {
            b"F"
        };
        let parms_key: &[u8] = if self.dict.contains_key(DECODE_PARMS) {
            DECODE_PARMS
        } else {
            b"DP"
        };

        let mut filters = vec![];

        if let Some(name) = self.dict.get::<Name>(filter_key) {
            let filter = Filter::from_name(&name).ok_or(FilterError::Unsupported)?;
            let parms = self.dict.get::<Dict>(parms_key);
            filters.push((filter, parms));
        } else if let Some(arr) = self.dict.get::<Array>(filter_key) {
            let parms = self.dict.get::<Array>(parms_key);

            for (i, name) in arr.iter::<Name>().enumerate() {
                let filter = Filter::from_name(&name).ok_or(FilterError::Unsupported)?;
                let parm = parms.as_ref().and_then(|p| p.get::<Dict>(i));
                filters.push((filter, parm));
            }
        }

        Ok(filters)
    }

    /// Decode the payload by applying the filter chain left-to-right.
    ///
    /// Pass-through filters (DCT, JPX, CCITT) end the chain, returning the
    /// data still encoded; use [`Stream::pass_through_filter`] to find out
    /// whether that happened. The result is not cached.
    pub fn decoded(&self) -> Result<Vec<u8>, FilterError> {
        let mut current = self.data.to_vec();

        for (filter, parms) in self.filters()? {
            if filter.is_pass_through() {
                return Ok(current);
            }

            current = filter.apply(&current, parms.as_ref())?;
        }

        Ok(current)
    }

    /// The first pass-through filter in the chain, if any.
    pub fn pass_through_filter(&self) -> Option<Filter> {
        self.filters()
            .ok()?
            .into_iter()
            .map(|(f, _)| f)
            .find(Filter::is_pass_through)
    }
}

impl std::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stream(len: {})", self.data.len())
    }
}

impl PartialEq for Stream<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.dict == other.dict && self.data == other.data
    }
}

object!(Stream<'a>, Stream);

impl Skippable for Stream<'_> {
    fn skip(_: &mut Reader<'_>, _: bool) -> Option<()> {
        // A stream can never appear inside a dict or array.
        None
    }
}

impl<'a> Readable<'a> for Stream<'a> {
    fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
        let dict = r.read::<Dict>(ctx)?;

        r.skip_white_spaces_and_comments();
        r.forward_tag(b"stream")?;

        // The keyword must be followed by LF or CRLF; tolerate a lone CR
        // and a missing EOL entirely.
        let _ = r
            .forward_tag(b"\r\n")
            .or_else(|| r.forward_tag(b"\n"))
            .or_else(|| r.forward_tag(b"\r"));

        let payload_start = r.offset();

        // `/Length` may itself be an indirect reference; the lazy dict
        // resolves it through the xref table before we read the payload.
        let length = dict.get::<i64>(LENGTH).and_then(|l| usize::try_from(l).ok());

        let data = match length {
            Some(length) => {
                let data = r.read_bytes(length);
                let mut probe = r.clone();
                probe.skip_white_spaces();

                match data {
                    Some(data) if probe.forward_tag(b"endstream").is_some() => {
                        r.jump(probe.offset());
                        data
                    }
                    _ => {
                        // Declared length disagrees with the data; fall back
                        // to scanning for the `endstream` keyword.
                        warn!("stream length of {length} is invalid, scanning for endstream");

                        r.jump(payload_start);
                        scan_for_endstream(r)?
                    }
                }
            }
            None => {
                warn!("stream has no usable length, scanning for endstream");

                scan_for_endstream(r)?
            }
        };

        Some(Stream { dict, data })
    }
}

/// Find the payload of a stream whose `/Length` is missing or wrong by
/// searching for the `endstream` keyword. Trailing end-of-line bytes before
/// the keyword are not part of the payload.
fn scan_for_endstream<'a>(r: &mut Reader<'a>) -> Option<&'a [u8]> {
    let start = r.offset();

    loop {
        if r.at_end() {
            return None;
        }

        if r.peek_tag(b"endstream").is_some() {
            let mut end = r.offset();

            while end > start && is_white_space(r.data[end - 1]) {
                end -= 1;
            }

            let data = r.range(start..end)?;
            r.forward_tag(b"endstream")?;

            return Some(data);
        }

        r.forward();
    }
}

#[cfg(test)]
mod tests {
    use crate::object::Stream;
    use crate::reader::Readable;

    #[test]
    fn stream_1() {
        let data = b"<< /Length 10 >> stream\nabcdefghij\nendstream";
        let stream = Stream::from_bytes(data).unwrap();
        assert_eq!(stream.raw_data(), b"abcdefghij");
    }

    #[test]
    fn stream_crlf() {
        let data = b"<< /Length 3 >>stream\r\nabc\r\nendstream";
        let stream = Stream::from_bytes(data).unwrap();
        assert_eq!(stream.raw_data(), b"abc");
    }

    #[test]
    fn stream_bad_length() {
        let data = b"<< /Length 900 >> stream\nabc\nendstream";
        let stream = Stream::from_bytes(data).unwrap();
        assert_eq!(stream.raw_data(), b"abc");
    }

    #[test]
    fn stream_no_length() {
        let data = b"<< >> stream\nabc\nendstream";
        let stream = Stream::from_bytes(data).unwrap();
        assert_eq!(stream.raw_data(), b"abc");
    }

    #[test]
    fn stream_binary_payload() {
        let data = b"<< /Length 4 >> stream\n\x00\xff\x01\x02\nendstream";
        let stream = Stream::from_bytes(data).unwrap();
        assert_eq!(stream.raw_data(), &[0x00, 0xff, 0x01, 0x02]);
    }

    #[test]
    fn stream_decode_identity() {
        let data = b"<< /Length 3 >> stream\nabc\nendstream";
        let stream = Stream::from_bytes(data).unwrap();
        assert_eq!(stream.decoded().unwrap(), b"abc");
    }
}
