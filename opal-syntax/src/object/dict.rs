//! Dictionaries.

use crate::object::r#ref::{MaybeRef, ObjRef};
use crate::object::{object, Name, Object, ObjectLike};
use crate::reader::{Readable, Reader, ReaderContext, ReaderExt, Skippable};
use rustc_hash::FxHashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A PDF dictionary.
///
/// The dictionary stores the raw byte range of its value and a map from
/// key to value offset; values are re-read on access and indirect
/// references resolved through the xref table. This lazy representation is
/// what allows a stream's `/Length` to be an indirect reference: resolving
/// it parses a different object mid-parse without disturbing this one.
#[derive(Clone)]
pub struct Dict<'a>(Arc<Repr<'a>>);

struct Repr<'a> {
    data: &'a [u8],
    offsets: FxHashMap<Name, usize>,
    ctx: ReaderContext<'a>,
}

impl<'a> Dict<'a> {
    /// Create a new empty dictionary.
    pub fn empty() -> Dict<'a> {
        Dict(Arc::new(Repr {
            data: b"<<>>",
            offsets: FxHashMap::default(),
            ctx: ReaderContext::dummy(),
        }))
    }

    /// The raw bytes underlying the dictionary.
    pub fn data(&self) -> &'a [u8] {
        self.0.data
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.offsets.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.offsets.is_empty()
    }

    /// Whether the dictionary contains the given key.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.offsets.contains_key(key)
    }

    /// The value for `key`, resolved through the xref table and cast to `T`.
    #[allow(private_bounds)]
    pub fn get<T>(&self, key: &[u8]) -> Option<T>
    where
        T: ObjectLike<'a>,
    {
        self.get_raw::<T>(key)?.resolve(&self.0.ctx)
    }

    /// The raw (unresolved) value for `key`.
    #[allow(private_bounds)]
    pub fn get_raw<T>(&self, key: &[u8]) -> Option<MaybeRef<T>>
    where
        T: Readable<'a>,
    {
        let offset = *self.0.offsets.get(key)?;

        Reader::new_at(self.0.data, offset).read::<MaybeRef<T>>(&self.0.ctx)
    }

    /// The reference stored under `key`, if the value is one.
    pub fn get_ref(&self, key: &[u8]) -> Option<ObjRef> {
        let offset = *self.0.offsets.get(key)?;

        Reader::new_at(self.0.data, offset).read_plain::<ObjRef>()
    }

    /// An iterator over the keys of the dictionary.
    pub fn keys(&self) -> impl Iterator<Item = &Name> + '_ {
        self.0.offsets.keys()
    }

    /// The reader context the dictionary was read with.
    pub(crate) fn ctx(&self) -> &ReaderContext<'a> {
        &self.0.ctx
    }

    pub(crate) fn from_parts(
        data: &'a [u8],
        offsets: FxHashMap<Name, usize>,
        ctx: ReaderContext<'a>,
    ) -> Self {
        Dict(Arc::new(Repr { data, offsets, ctx }))
    }

    /// Parse an inline-image dictionary: the same key/value syntax, but
    /// without the `<<`/`>>` brackets, terminated by the `ID` keyword.
    pub(crate) fn read_inline(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Dict<'a>> {
        read_entries(r, ctx, None)
    }
}

impl Default for Dict<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

// This is byte-range equality, not structural equality.
impl PartialEq for Dict<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.data == other.0.data
    }
}

impl Debug for Dict<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_map();

        for (key, offset) in &self.0.offsets {
            let value = Reader::new_at(self.0.data, *offset)
                .read::<MaybeRef<Object>>(&ReaderContext::dummy());
            s.entry(key, &value);
        }

        s.finish()
    }
}

object!(Dict<'a>, Dict);

impl Skippable for Dict<'_> {
    fn skip(r: &mut Reader<'_>, in_content_stream: bool) -> Option<()> {
        r.forward_tag(b"<<")?;

        loop {
            r.skip_white_spaces_and_comments();

            if r.forward_tag(b">>").is_some() {
                return Some(());
            }

            if r.skip_obj::<Name>(in_content_stream).is_none() {
                // Garbage where a key should be; skip a single object
                // leniently and keep going.
                r.skip_obj::<Object>(in_content_stream)?;
                continue;
            }

            r.skip_white_spaces_and_comments();

            if in_content_stream {
                r.skip_obj::<Object>(true)?;
            } else {
                r.skip_obj::<MaybeRef<Object>>(false)?;
            }
        }
    }
}

impl<'a> Readable<'a> for Dict<'a> {
    fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
        read_entries(r, ctx, Some((b"<<", b">>")))
    }
}

fn read_entries<'a>(
    r: &mut Reader<'a>,
    ctx: &ReaderContext<'a>,
    brackets: Option<(&[u8], &[u8])>,
) -> Option<Dict<'a>> {
    let mut offsets = FxHashMap::default();

    let dict_data = r.tail()?;
    let base = r.offset();

    if let Some((open, _)) = brackets {
        r.forward_tag(open)?;
    }

    loop {
        r.skip_white_spaces_and_comments();

        match brackets {
            Some((_, close)) => {
                if r.forward_tag(close).is_some() {
                    break;
                }
            }
            // Inline image dictionaries end at the `ID` keyword.
            None => {
                if r.forward_tag(b"ID").is_some() {
                    break;
                }
            }
        }

        let key = match r.read::<Name>(ctx) {
            Some(key) => key,
            None => {
                // Lenient: skip a stray object and continue.
                r.skip_obj::<Object>(ctx.in_content_stream())?;
                continue;
            }
        };

        r.skip_white_spaces_and_comments();

        let value_offset = r.offset() - base;

        if ctx.in_content_stream() {
            r.skip_obj::<Object>(true)?;
        } else {
            r.skip_obj::<MaybeRef<Object>>(false)?;
        }

        // Duplicate keys are forbidden; the last occurrence wins.
        offsets.insert(key, value_offset);
    }

    let data = &dict_data[..r.offset() - base];

    Some(Dict::from_parts(data, offsets, ctx.clone()))
}

/// Well-known dictionary keys.
pub mod keys {
    #![allow(missing_docs)]

    pub const ANNOTS: &[u8] = b"Annots";
    pub const AP: &[u8] = b"AP";
    pub const BASE_FONT: &[u8] = b"BaseFont";
    pub const BBOX: &[u8] = b"BBox";
    pub const BITS_PER_COMPONENT: &[u8] = b"BitsPerComponent";
    pub const COLORS: &[u8] = b"Colors";
    pub const COLOR_SPACE: &[u8] = b"ColorSpace";
    pub const COLUMNS: &[u8] = b"Columns";
    pub const CONTENTS: &[u8] = b"Contents";
    pub const COUNT: &[u8] = b"Count";
    pub const CROP_BOX: &[u8] = b"CropBox";
    pub const DECODE: &[u8] = b"Decode";
    pub const DECODE_PARMS: &[u8] = b"DecodeParms";
    pub const DESCENDANT_FONTS: &[u8] = b"DescendantFonts";
    pub const EARLY_CHANGE: &[u8] = b"EarlyChange";
    pub const ENCODING: &[u8] = b"Encoding";
    pub const ENCRYPT: &[u8] = b"Encrypt";
    pub const EXT_G_STATE: &[u8] = b"ExtGState";
    pub const FILTER: &[u8] = b"Filter";
    pub const FIRST: &[u8] = b"First";
    pub const FIRST_CHAR: &[u8] = b"FirstChar";
    pub const FONT: &[u8] = b"Font";
    pub const FONT_DESCRIPTOR: &[u8] = b"FontDescriptor";
    pub const FONT_FILE2: &[u8] = b"FontFile2";
    pub const FONT_FILE3: &[u8] = b"FontFile3";
    pub const HEIGHT: &[u8] = b"Height";
    pub const IMAGE_MASK: &[u8] = b"ImageMask";
    pub const INDEX: &[u8] = b"Index";
    pub const INFO: &[u8] = b"Info";
    pub const KIDS: &[u8] = b"Kids";
    pub const LENGTH: &[u8] = b"Length";
    pub const MATRIX: &[u8] = b"Matrix";
    pub const MEDIA_BOX: &[u8] = b"MediaBox";
    pub const MISSING_WIDTH: &[u8] = b"MissingWidth";
    pub const N: &[u8] = b"N";
    pub const PAGES: &[u8] = b"Pages";
    pub const PREDICTOR: &[u8] = b"Predictor";
    pub const PREV: &[u8] = b"Prev";
    pub const RECT: &[u8] = b"Rect";
    pub const RESOURCES: &[u8] = b"Resources";
    pub const ROOT: &[u8] = b"Root";
    pub const ROTATE: &[u8] = b"Rotate";
    pub const SIZE: &[u8] = b"Size";
    pub const SUBTYPE: &[u8] = b"Subtype";
    pub const TYPE: &[u8] = b"Type";
    pub const VERSION: &[u8] = b"Version";
    pub const W: &[u8] = b"W";
    pub const WIDTH: &[u8] = b"Width";
    pub const WIDTHS: &[u8] = b"Widths";
    pub const X_OBJECT: &[u8] = b"XObject";
    pub const XREF_STM: &[u8] = b"XRefStm";
}
