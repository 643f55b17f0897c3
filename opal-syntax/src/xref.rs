//! Locating, parsing and querying the cross-reference data of a PDF file.

use crate::object::dict::keys::{
    ENCRYPT, FIRST, INDEX, INFO, N, PAGES, PREV, ROOT, SIZE, TYPE, W, XREF_STM,
};
use crate::object::{
    Array, Dict, IndirectObject, MaybeRef, Name, Object, ObjectIdentifier, ObjectLike, Stream,
};
use crate::reader::{Readable, Reader, ReaderContext, ReaderExt, RECURSION_LIMIT};
use crate::PdfData;
use log::{error, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry as MapEntry;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, RwLock};

/// How far from the end of the file the `startxref` keyword is searched.
const STARTXREF_WINDOW: usize = 1024;

/// A cross-reference table entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Entry {
    /// The object is free and resolves to null.
    Free,
    /// An in-use object at a byte offset in the file.
    Normal {
        /// Byte offset of the `N G obj` header.
        offset: usize,
        /// The generation recorded in the xref section.
        gen: i32,
    },
    /// An object stored inside an object stream.
    InStream {
        /// Object number of the containing object stream.
        stream_num: u32,
        /// Index of the object within the stream.
        index: u32,
    },
}

type XrefMap = FxHashMap<u32, Entry>;

/// The error produced when no usable xref table can be located.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum XRefError {
    /// `startxref` is missing or the referenced data is corrupt beyond
    /// repair.
    Malformed,
    /// The document declares encryption, which is unsupported.
    Encrypted,
}

/// The error produced when typed resolution fails.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A reference points at an object that is absent or free.
    UnresolvedReference,
    /// The resolved object has a different type than required.
    TypeMismatch,
}

/// Where the trailer dictionary of the document lives.
#[derive(Debug, Copy, Clone)]
enum TrailerSource {
    /// Byte offset of a trailer dictionary (`<<`) or of an xref stream
    /// object (`N G obj`).
    Offset(usize),
    /// No trailer was found; the catalog was located directly during a
    /// rebuild scan.
    Catalog(ObjectIdentifier),
}

struct Repr {
    data: PdfData,
    map: RwLock<MapRepr>,
    trailer: TrailerSource,
    obj_streams: ObjStreamCache,
}

struct MapRepr {
    map: XrefMap,
    repaired: bool,
}

enum Inner {
    /// An xref table without any entries, used as a stand-in while parsing
    /// data that is not anchored in a file.
    Dummy,
    Loaded(Arc<Repr>),
}

/// The cross-reference data of a PDF file: the object-number-to-location
/// map merged over all incremental updates, plus the trailer.
pub struct XRef(Inner);

static DUMMY_XREF: XRef = XRef(Inner::Dummy);

impl Debug for XRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Inner::Dummy => write!(f, "XRef(dummy)"),
            Inner::Loaded(_) => write!(f, "XRef({} entries)", self.len()),
        }
    }
}

impl XRef {
    /// An xref table without any entries.
    pub(crate) fn dummy() -> &'static XRef {
        &DUMMY_XREF
    }

    fn new(data: PdfData, map: XrefMap, trailer: TrailerSource, repaired: bool) -> Self {
        XRef(Inner::Loaded(Arc::new(Repr {
            data,
            map: RwLock::new(MapRepr { map, repaired }),
            trailer,
            obj_streams: ObjStreamCache::new(),
        })))
    }

    /// The number of known objects.
    pub fn len(&self) -> usize {
        match &self.0 {
            Inner::Dummy => 0,
            Inner::Loaded(r) => r.map.read().unwrap().map.len(),
        }
    }

    /// Whether the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw bytes of the whole file.
    pub fn data(&self) -> &[u8] {
        match &self.0 {
            Inner::Dummy => &[],
            Inner::Loaded(r) => r.data.as_ref().as_ref(),
        }
    }

    fn is_repaired(&self) -> bool {
        match &self.0 {
            Inner::Dummy => true,
            Inner::Loaded(r) => r.map.read().unwrap().repaired,
        }
    }

    /// Replace the map with one rebuilt by scanning the file for object
    /// headers. Called when the declared xref turns out to be lies.
    fn repair(&self) {
        let Inner::Loaded(r) = &self.0 else {
            return;
        };

        let scan = ScanResult::scan(self.data());

        let mut locked = r.map.write().unwrap();
        locked.map = scan.map;
        locked.repaired = true;
    }

    /// The object numbers of all known objects.
    pub fn object_numbers(&self) -> Vec<u32> {
        match &self.0 {
            Inner::Dummy => vec![],
            Inner::Loaded(r) => r.map.read().unwrap().map.keys().copied().collect(),
        }
    }

    /// Return the object with the given identifier, cast to `T`.
    #[allow(private_bounds)]
    pub fn get<'a, T>(&'a self, id: ObjectIdentifier) -> Option<T>
    where
        T: ObjectLike<'a>,
    {
        let ctx = ReaderContext::new(self, false);
        self.get_with(id, &ctx)
    }

    /// Like [`XRef::get`], but carrying the resolution chain of the caller
    /// so that reference cycles terminate.
    #[allow(private_bounds)]
    pub(crate) fn get_with<'a, T>(&'a self, id: ObjectIdentifier, ctx: &ReaderContext<'a>) -> Option<T>
    where
        T: ObjectLike<'a>,
    {
        let Inner::Loaded(repr) = &self.0 else {
            return None;
        };

        if ctx.parent_chain_contains(&id) {
            warn!("detected cycle while resolving object {}", id.num);

            return None;
        }

        if ctx.parent_chain_len() >= RECURSION_LIMIT {
            warn!("resolution chain of object {} exceeds the depth limit", id.num);

            return None;
        }

        let entry = {
            let locked = repr.map.read().unwrap();
            // A reference to an undefined object is not an error; it reads
            // as the null object, which we surface as `None`.
            locked.map.get(&(id.num as u32)).copied()?
        };

        let mut chained_ctx = ctx.clone();
        chained_ctx.push_parent(id);
        chained_ctx.set_in_content_stream(false);

        match entry {
            Entry::Free => None,
            Entry::Normal { offset, gen } => {
                if gen != id.gen {
                    warn!(
                        "generation mismatch for object {}: expected {}, xref has {}",
                        id.num, id.gen, gen
                    );
                }

                let mut r = Reader::new_at(self.data(), offset);

                if let Some(obj) = r.read::<IndirectObject<Object>>(&chained_ctx) {
                    if obj.id().num != id.num {
                        warn!(
                            "object at offset {} has number {}, expected {}",
                            offset,
                            obj.id().num,
                            id.num
                        );
                    }

                    return obj.into_inner().cast::<T>();
                }

                // Nothing parseable at the recorded offset; the xref table
                // is broken. Rebuild it once and retry with the caller's
                // chain.
                if self.is_repaired() {
                    error!("object {} is unreadable even after rebuilding the xref table", id.num);

                    None
                } else {
                    warn!("broken xref entry for object {}, rebuilding the table", id.num);

                    self.repair();
                    self.get_with(id, ctx)
                }
            }
            Entry::InStream { stream_num, index } => {
                let stream_id = ObjectIdentifier::new(stream_num as i32, 0);
                let stream = self.get_with::<Stream>(stream_id, &chained_ctx)?;

                let data = repr
                    .obj_streams
                    .get_or_insert(stream_num, || stream.decoded().ok())?;

                ObjectStream::parse(&stream, data, &chained_ctx)?.get::<T>(index)
            }
        }
    }

    /// Resolve a possibly-indirect object. References to missing or free
    /// objects resolve to null.
    pub fn resolve<'a>(&'a self, obj: MaybeRef<Object<'a>>) -> Object<'a> {
        match obj {
            MaybeRef::Direct(o) => o,
            MaybeRef::Ref(r) => self
                .get::<Object>(r.into())
                .unwrap_or(Object::Null(crate::object::Null)),
        }
    }

    /// Resolve a possibly-indirect object and require a dictionary.
    pub fn resolve_dict<'a>(&'a self, obj: MaybeRef<Object<'a>>) -> Result<Dict<'a>, ResolveError> {
        match self.resolve_required(obj)? {
            Object::Dict(d) => Ok(d),
            Object::Stream(s) => Ok(s.dict().clone()),
            _ => Err(ResolveError::TypeMismatch),
        }
    }

    /// Resolve a possibly-indirect object and require an array.
    pub fn resolve_array<'a>(&'a self, obj: MaybeRef<Object<'a>>) -> Result<Array<'a>, ResolveError> {
        match self.resolve_required(obj)? {
            Object::Array(a) => Ok(a),
            _ => Err(ResolveError::TypeMismatch),
        }
    }

    fn resolve_required<'a>(&'a self, obj: MaybeRef<Object<'a>>) -> Result<Object<'a>, ResolveError> {
        match obj {
            MaybeRef::Direct(o) => Ok(o),
            MaybeRef::Ref(r) => self
                .get::<Object>(r.into())
                .ok_or(ResolveError::UnresolvedReference),
        }
    }

    /// The trailer dictionary of the newest xref section.
    pub fn trailer_dict(&self) -> Option<Dict<'_>> {
        let Inner::Loaded(repr) = &self.0 else {
            return None;
        };

        let offset = match repr.trailer {
            TrailerSource::Offset(offset) => offset,
            TrailerSource::Catalog(_) => return None,
        };

        let ctx = ReaderContext::new(self, false);
        let mut r = Reader::new_at(self.data(), offset);

        if r.peek_tag(b"<<").is_some() {
            r.read::<Dict>(&ctx)
        } else {
            // An xref stream doubles as its own trailer.
            r.read::<IndirectObject<Stream>>(&ctx)
                .map(|obj| obj.into_inner().dict().clone())
        }
    }

    /// The document catalog.
    pub fn catalog(&self) -> Option<Dict<'_>> {
        let Inner::Loaded(repr) = &self.0 else {
            return None;
        };

        match repr.trailer {
            TrailerSource::Offset(_) => self.trailer_dict()?.get::<Dict>(ROOT),
            TrailerSource::Catalog(id) => self.get::<Dict>(id),
        }
    }

    /// The document information dictionary, if any.
    pub fn info(&self) -> Option<Dict<'_>> {
        self.trailer_dict()?.get::<Dict>(INFO)
    }

    /// Whether the trailer declares encryption.
    pub(crate) fn is_encrypted(&self) -> bool {
        self.trailer_dict()
            .map(|t| t.contains_key(ENCRYPT))
            .unwrap_or(false)
    }
}

/// Parse the xref data referenced from the final `startxref` of the file.
pub(crate) fn root_xref(data: PdfData) -> Result<XRef, XRefError> {
    let bytes = data.as_ref().as_ref();

    let start = find_last_startxref(bytes).ok_or(XRefError::Malformed)?;

    let mut map = XrefMap::default();
    let mut visited = FxHashSet::default();
    let trailer_offset =
        populate(bytes, start, &mut map, &mut visited).ok_or(XRefError::Malformed)?;

    let xref = XRef::new(data, map, TrailerSource::Offset(trailer_offset), false);

    if xref.is_encrypted() {
        return Err(XRefError::Encrypted);
    }

    // Sanity-check that the table actually leads to a page tree; otherwise
    // let the caller fall back to scanning.
    if xref
        .catalog()
        .map(|c| c.contains_key(PAGES))
        .unwrap_or(false)
    {
        Ok(xref)
    } else {
        Err(XRefError::Malformed)
    }
}

/// Rebuild the xref by scanning the whole file for object headers.
pub(crate) fn rebuilt_xref(data: PdfData) -> Option<XRef> {
    warn!("xref data is unusable, scanning the file for objects");

    let scan = ScanResult::scan(data.as_ref().as_ref());
    let trailer = scan.trailer?;

    warn!("rebuilt xref table with {} entries", scan.map.len());

    Some(XRef::new(data, scan.map, trailer, true))
}

/// Scan the last kilobyte for `startxref` and parse the offset after it.
pub(crate) fn find_last_startxref(data: &[u8]) -> Option<usize> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let window = &data[window_start..];

    let needle = b"startxref";
    let mut found = None;

    for pos in 0..window.len().saturating_sub(needle.len() - 1) {
        if window[pos..].starts_with(needle) {
            found = Some(pos);
        }
    }

    let mut r = Reader::new_at(window, found? + needle.len());
    r.skip_white_spaces_and_comments();

    let offset = r.read_plain::<i64>()?;

    usize::try_from(offset).ok().filter(|o| *o < data.len())
}

/// Parse the xref section at `pos` (a table or a stream) into `map`,
/// following `Prev`/`XRefStm` links, and return the byte offset of the
/// section's trailer.
///
/// Already-present entries are never overwritten: sections are visited
/// newest-first, and the newest entry for an object wins.
fn populate(
    data: &[u8],
    pos: usize,
    map: &mut XrefMap,
    visited: &mut FxHashSet<usize>,
) -> Option<usize> {
    if !visited.insert(pos) {
        warn!("cycle in xref chain at offset {pos}");

        return None;
    }

    if visited.len() > RECURSION_LIMIT {
        warn!("xref chain is longer than the depth limit");

        return None;
    }

    let mut r = Reader::new_at(data, pos);
    r.skip_white_spaces_and_comments();

    if r.peek_tag(b"xref").is_some() {
        populate_from_table(data, &mut r, map, visited)
    } else {
        populate_from_stream(data, &mut r, map, visited)
    }
}

fn insert_if_absent(map: &mut XrefMap, num: u32, entry: Entry) {
    if let MapEntry::Vacant(v) = map.entry(num) {
        v.insert(entry);
    }
}

struct SubsectionHeader {
    start: u32,
    count: u32,
}

impl Readable<'_> for SubsectionHeader {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        r.skip_white_spaces();
        let start = r.read_plain::<u32>()?;
        r.skip_white_spaces();
        let count = r.read_plain::<u32>()?;

        Some(SubsectionHeader { start, count })
    }
}

/// One `nnnnnnnnnn ggggg n/f` line of a traditional xref table. The fixed
/// 20-byte layout is the norm, but short lines exist in the wild, so the
/// fields are tokenized rather than sliced.
struct TableEntry {
    offset: usize,
    gen: i32,
    in_use: bool,
}

impl Readable<'_> for TableEntry {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        r.skip_white_spaces();
        let offset = r.read_plain::<usize>()?;
        r.skip_white_spaces();
        let gen = r.read_plain::<i32>()?;
        r.skip_white_spaces();
        let in_use = match r.read_byte()? {
            b'n' => true,
            b'f' => false,
            _ => return None,
        };

        Some(TableEntry { offset, gen, in_use })
    }
}

fn populate_from_table(
    data: &[u8],
    r: &mut Reader<'_>,
    map: &mut XrefMap,
    visited: &mut FxHashSet<usize>,
) -> Option<usize> {
    r.forward_tag(b"xref")?;

    // The hybrid-file xref stream takes priority over this table's own
    // entries, so it has to be merged first. That requires the trailer, so
    // find it before walking the subsections.
    let trailer_offset = {
        let mut probe = r.clone();
        skip_table_body(&mut probe)?;
        probe.skip_white_spaces_and_comments();
        probe.forward_tag(b"trailer")?;
        probe.skip_white_spaces_and_comments();
        probe.offset()
    };

    let trailer = Reader::new_at(data, trailer_offset).read_plain::<Dict>()?;

    if let Some(xref_stm) = trailer.get_raw::<i64>(XREF_STM).and_then(MaybeRef::into_direct) {
        if let Ok(offset) = usize::try_from(xref_stm) {
            if populate(data, offset, map, visited).is_none() {
                warn!("ignoring unreadable hybrid xref stream");
            }
        }
    }

    while let Some(header) = r.read_plain::<SubsectionHeader>() {
        for i in 0..header.count {
            let num = header.start + i;
            let entry = r.read_plain::<TableEntry>()?;

            let entry = if entry.in_use {
                Entry::Normal {
                    offset: entry.offset,
                    gen: entry.gen,
                }
            } else {
                Entry::Free
            };

            insert_if_absent(map, num, entry);
        }

        r.skip_white_spaces();
    }

    if let Some(prev) = trailer.get_raw::<i64>(PREV).and_then(MaybeRef::into_direct) {
        if let Ok(offset) = usize::try_from(prev) {
            // Damaged historic sections are common; keep whatever the
            // newer sections provided.
            if populate(data, offset, map, visited).is_none() {
                warn!("ignoring unreadable previous xref section");
            }
        }
    }

    Some(trailer_offset)
}

fn skip_table_body(r: &mut Reader<'_>) -> Option<()> {
    while let Some(header) = r.read_plain::<SubsectionHeader>() {
        for _ in 0..header.count {
            r.read_plain::<TableEntry>()?;
        }

        r.skip_white_spaces();
    }

    Some(())
}

fn populate_from_stream(
    data: &[u8],
    r: &mut Reader<'_>,
    map: &mut XrefMap,
    visited: &mut FxHashSet<usize>,
) -> Option<usize> {
    let obj_offset = r.offset();
    let stream = r.read_plain::<IndirectObject<Stream>>()?.into_inner();
    let dict = stream.dict();

    if dict.get::<Name>(TYPE).map(|t| t.as_ref() != b"XRef").unwrap_or(false) {
        warn!("xref stream has wrong /Type");
    }

    let size = dict.get::<u32>(SIZE)?;

    let widths = dict
        .get::<Array>(W)?
        .iter::<usize>()
        .take(3)
        .collect::<Vec<_>>();

    if widths.len() != 3 || widths.iter().any(|w| *w > 8) {
        warn!("invalid /W entry in xref stream");

        return None;
    }

    let (w0, w1, w2) = (widths[0], widths[1], widths[2]);

    let index = match dict.get::<Array>(INDEX) {
        Some(arr) => {
            let nums = arr.iter::<u32>().collect::<Vec<_>>();
            nums.chunks_exact(2).map(|c| (c[0], c[1])).collect::<Vec<_>>()
        }
        None => vec![(0, size)],
    };

    let decoded = stream.decoded().ok()?;
    let mut entries = Reader::new(&decoded);

    for (start, count) in index {
        for i in 0..count {
            let num = start + i;

            // A missing type field defaults to type 1.
            let f_type = if w0 == 0 { 1 } else { entries.read_be_num(w0)? };
            let f2 = entries.read_be_num(w1)?;
            let f3 = entries.read_be_num(w2)?;

            let entry = match f_type {
                0 => Entry::Free,
                1 => Entry::Normal {
                    offset: usize::try_from(f2).ok()?,
                    gen: f3 as i32,
                },
                2 => Entry::InStream {
                    stream_num: f2 as u32,
                    index: f3 as u32,
                },
                other => {
                    warn!("unknown xref stream entry type {other}");

                    continue;
                }
            };

            insert_if_absent(map, num, entry);
        }
    }

    if let Some(prev) = dict.get_raw::<i64>(PREV).and_then(MaybeRef::into_direct) {
        if let Ok(offset) = usize::try_from(prev) {
            if populate(data, offset, map, visited).is_none() {
                warn!("ignoring unreadable previous xref section");
            }
        }
    }

    Some(obj_offset)
}

/// The result of brute-force scanning a file for objects.
struct ScanResult {
    map: XrefMap,
    trailer: Option<TrailerSource>,
}

impl ScanResult {
    fn scan(data: &[u8]) -> ScanResult {
        let mut map = XrefMap::default();
        let mut trailer_offset = None;
        let mut catalog = None;

        let ctx = ReaderContext::dummy();
        let mut r = Reader::new(data);

        while !r.at_end() {
            let pos = r.offset();

            // Only positions that look like the start of a token are worth
            // probing.
            if !r.data[pos].is_ascii_digit() && r.data[pos] != b't' {
                r.forward();
                continue;
            }

            if r.data[pos].is_ascii_digit() {
                // Object headers start at a token boundary.
                if pos > 0 && !crate::trivia::is_white_space(data[pos - 1]) {
                    r.forward();
                    continue;
                }

                if let Some(id) = r.read::<ObjectIdentifier>(&ctx) {
                    r.skip_white_spaces_and_comments();

                    // Only insert headers that are followed by an actual
                    // object. Later (newer) definitions of the same object
                    // number replace earlier ones.
                    if let Some(obj) = r.read::<Object>(&ctx) {
                        map.insert(
                            id.num as u32,
                            Entry::Normal {
                                offset: pos,
                                gen: id.gen,
                            },
                        );

                        Self::scan_object_contents(&obj, id, &mut map, &mut catalog);
                    }

                    continue;
                }
            } else if r.peek_tag(b"trailer").is_some() {
                let mut probe = r.clone();
                let _ = probe.forward_tag(b"trailer");
                probe.skip_white_spaces_and_comments();

                let dict_offset = probe.offset();
                if let Some(dict) = probe.read::<Dict>(&ctx) {
                    if dict.contains_key(ROOT) {
                        trailer_offset = Some(dict_offset);
                    }
                }
            }

            r.forward();
        }

        let trailer = trailer_offset
            .map(TrailerSource::Offset)
            .or(catalog.map(TrailerSource::Catalog));

        ScanResult { map, trailer }
    }

    /// Expand object streams so their contents are reachable, and remember
    /// the catalog in case no trailer dictionary is found.
    fn scan_object_contents(
        obj: &Object<'_>,
        id: ObjectIdentifier,
        map: &mut XrefMap,
        catalog: &mut Option<ObjectIdentifier>,
    ) {
        match obj {
            Object::Stream(stream) => {
                let dict = stream.dict();

                if dict.get::<Name>(TYPE).map(|t| t.as_ref() == b"ObjStm").unwrap_or(false) {
                    if let Ok(decoded) = stream.decoded() {
                        let n = dict.get::<usize>(N).unwrap_or(0);
                        let mut header = Reader::new(&decoded);

                        for index in 0..n {
                            header.skip_white_spaces_and_comments();
                            let Some(num) = header.read_plain::<u32>() else {
                                break;
                            };
                            header.skip_white_spaces_and_comments();
                            if header.read_plain::<usize>().is_none() {
                                break;
                            }

                            map.insert(
                                num,
                                Entry::InStream {
                                    stream_num: id.num as u32,
                                    index: index as u32,
                                },
                            );
                        }
                    }
                }
            }
            Object::Dict(dict) => {
                if dict.get::<Name>(TYPE).map(|t| t.as_ref() == b"Catalog").unwrap_or(false) {
                    *catalog = Some(id);
                }
            }
            _ => {}
        }
    }
}

/// A cache of decoded object-stream payloads, keyed by the stream's object
/// number. Entries are never removed.
struct ObjStreamCache {
    inner: Mutex<FxHashMap<u32, Arc<[u8]>>>,
}

impl ObjStreamCache {
    fn new() -> Self {
        Self {
            inner: Mutex::new(FxHashMap::default()),
        }
    }

    fn get_or_insert(&self, num: u32, decode: impl FnOnce() -> Option<Vec<u8>>) -> Option<&[u8]> {
        let cached = self.inner.lock().unwrap().get(&num).cloned();

        // Decoding happens outside the lock: resolving the stream's filter
        // entries can recurse back into the cache.
        let arc = match cached {
            Some(arc) => arc,
            None => {
                let decoded: Arc<[u8]> = Arc::from(decode()?);

                self.inner
                    .lock()
                    .unwrap()
                    .entry(num)
                    .or_insert(decoded)
                    .clone()
            }
        };

        let slice: *const [u8] = arc.as_ref();

        // SAFETY: the map keeps one `Arc` per entry alive for as long as
        // `self` exists and entries are never removed, so the allocation
        // behind `slice` is stable and outlives the returned borrow, which
        // is tied to `&self`.
        Some(unsafe { &*slice })
    }
}

/// An object stream: `N` pairs of `(object number, offset)` followed by the
/// concatenated objects, offsets relative to `/First`.
struct ObjectStream<'a> {
    data: &'a [u8],
    ctx: ReaderContext<'a>,
    offsets: Vec<(u32, usize)>,
}

impl<'a> ObjectStream<'a> {
    fn parse(stream: &Stream<'a>, data: &'a [u8], ctx: &ReaderContext<'a>) -> Option<Self> {
        let n = stream.dict().get::<usize>(N)?;
        let first = stream.dict().get::<usize>(FIRST)?;

        let mut r = Reader::new(data);
        let mut offsets = Vec::with_capacity(n);

        for _ in 0..n {
            r.skip_white_spaces_and_comments();
            let num = r.read_plain::<u32>()?;
            r.skip_white_spaces_and_comments();
            let relative = r.read_plain::<usize>()?;

            offsets.push((num, first.checked_add(relative)?));
        }

        Some(ObjectStream {
            data,
            ctx: ctx.clone(),
            offsets,
        })
    }

    #[allow(private_bounds)]
    fn get<T>(&self, index: u32) -> Option<T>
    where
        T: ObjectLike<'a>,
    {
        let offset = self.offsets.get(index as usize)?.1;

        let mut r = Reader::new_at(self.data, offset);
        r.skip_white_spaces_and_comments();

        r.read::<Object>(&self.ctx)?.cast::<T>()
    }
}

#[cfg(test)]
mod tests {
    use crate::xref::find_last_startxref;

    #[test]
    fn startxref_at_end() {
        let data = b"junk junk startxref\n12345\n%%EOF";
        // 12345 is out of bounds for this buffer, so it is rejected.
        assert_eq!(find_last_startxref(data), None);

        let mut padded = vec![b' '; 20000];
        padded.extend_from_slice(data);
        assert_eq!(find_last_startxref(&padded), Some(12345));
    }

    #[test]
    fn startxref_picks_last() {
        let mut data = vec![b'x'; 20000];
        data.extend_from_slice(b"startxref 5 startxref\n17\n%%EOF");
        assert_eq!(find_last_startxref(&data), Some(17));
    }

    #[test]
    fn startxref_missing() {
        assert_eq!(find_last_startxref(b"no marker here"), None);
    }
}
