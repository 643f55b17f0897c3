//! The page tree.

use crate::content::OperationIter;
use crate::object::dict::keys::{
    ANNOTS, CONTENTS, COUNT, CROP_BOX, KIDS, MEDIA_BOX, RESOURCES, ROTATE, TYPE,
};
use crate::object::{Array, Dict, Name, Object, Rect, Stream};
use crate::reader::RECURSION_LIMIT;
use log::warn;
use std::sync::{Arc, OnceLock};

/// US Letter, the fallback when no media box is inherited anywhere.
const LETTER: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Attributes a page inherits from its ancestors.
#[derive(Debug, Clone, Default)]
struct Inherited {
    media_box: Option<Rect>,
    crop_box: Option<Rect>,
    rotate: Option<i64>,
}

/// The resource dictionaries in scope for some content, innermost first.
#[derive(Clone)]
pub struct Resources<'a> {
    dict: Dict<'a>,
    parent: Option<Arc<Resources<'a>>>,
}

impl<'a> Resources<'a> {
    /// Create a root resource scope.
    pub fn new(dict: Dict<'a>) -> Self {
        Self { dict, parent: None }
    }

    /// Create a nested scope with `dict` shadowing `parent`.
    pub fn nested(dict: Dict<'a>, parent: &Resources<'a>) -> Self {
        Self {
            dict,
            parent: Some(Arc::new(parent.clone())),
        }
    }

    /// Look up `name` in the given resource category (`/Font`,
    /// `/XObject`, `/ExtGState`, …), walking outwards through the scopes.
    pub fn lookup(&self, category: &[u8], name: &Name) -> Option<Object<'a>> {
        let own = self
            .dict
            .get::<Dict>(category)
            .and_then(|c| c.get::<Object>(name.as_ref()));

        match own {
            Some(found) => Some(found),
            None => self.parent.as_ref()?.lookup(category, name),
        }
    }
}

/// All pages of a document, in document order.
pub struct Pages<'a> {
    pages: Vec<Page<'a>>,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(root: &Dict<'a>) -> Pages<'a> {
        let mut pages = vec![];

        collect_pages(
            root,
            &mut pages,
            Inherited::default(),
            &Resources::new(Dict::empty()),
            0,
        );

        Pages { pages }
    }

    /// Build a page list by treating every page-typed dictionary in the
    /// file as a page. Used when the page tree is unusable.
    pub(crate) fn brute_force(xref: &'a crate::xref::XRef) -> Pages<'a> {
        let mut pages = vec![];

        let mut numbers = xref.object_numbers();
        numbers.sort_unstable();

        for num in numbers {
            let id = crate::object::ObjectIdentifier::new(num as i32, 0);

            if let Some(dict) = xref.get::<Dict>(id) {
                let is_page = dict
                    .get::<Name>(TYPE)
                    .map(|t| t.as_ref() == b"Page")
                    .unwrap_or(false);

                if is_page {
                    if let Some(page) =
                        Page::new(&dict, &Inherited::default(), &Resources::new(Dict::empty()))
                    {
                        pages.push(page);
                    }
                }
            }
        }

        Pages { pages }
    }

    /// The number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the document has no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The page at `index`.
    pub fn get(&self, index: usize) -> Option<&Page<'a>> {
        self.pages.get(index)
    }

    /// An iterator over the pages.
    pub fn iter(&self) -> impl Iterator<Item = &Page<'a>> {
        self.pages.iter()
    }
}

fn collect_pages<'a>(
    node: &Dict<'a>,
    out: &mut Vec<Page<'a>>,
    mut inherited: Inherited,
    resources: &Resources<'a>,
    depth: usize,
) {
    if depth >= RECURSION_LIMIT {
        warn!("page tree deeper than the recursion limit, pruning");

        return;
    }

    if let Some(media_box) = node.get::<Rect>(MEDIA_BOX) {
        inherited.media_box = Some(media_box);
    }

    if let Some(crop_box) = node.get::<Rect>(CROP_BOX) {
        inherited.crop_box = Some(crop_box);
    }

    if let Some(rotate) = node.get::<i64>(ROTATE) {
        inherited.rotate = Some(rotate);
    }

    let resources = match node.get::<Dict>(RESOURCES) {
        Some(dict) => Resources::nested(dict, resources),
        None => resources.clone(),
    };

    let Some(kids) = node.get::<Array>(KIDS) else {
        return;
    };

    for kid in kids.iter::<Dict>() {
        match kid.get::<Name>(TYPE) {
            Some(t) if t.as_ref() == b"Pages" => {
                // An internal node advertises how many leaves it holds via
                // /Count, but the walk trusts the structure, not the count.
                let _ = kid.get::<i64>(COUNT);

                collect_pages(&kid, out, inherited.clone(), &resources, depth + 1);
            }
            // Anything else is leniently treated as a leaf page.
            _ => {
                if let Some(page) = Page::new(&kid, &inherited, &resources) {
                    out.push(page);
                }
            }
        }
    }
}

/// A single page.
pub struct Page<'a> {
    dict: Dict<'a>,
    media_box: Rect,
    crop_box: Rect,
    rotate: i64,
    resources: Resources<'a>,
    contents: OnceLock<Option<Vec<u8>>>,
}

impl<'a> Page<'a> {
    fn new(dict: &Dict<'a>, inherited: &Inherited, resources: &Resources<'a>) -> Option<Page<'a>> {
        // A page without contents has nothing to render, but it still
        // counts as a page.
        let media_box = dict
            .get::<Rect>(MEDIA_BOX)
            .or(inherited.media_box)
            .unwrap_or(LETTER);

        let crop_box = dict
            .get::<Rect>(CROP_BOX)
            .or(inherited.crop_box)
            .unwrap_or(media_box);

        let rotate = dict.get::<i64>(ROTATE).or(inherited.rotate).unwrap_or(0);

        let resources = match dict.get::<Dict>(RESOURCES) {
            Some(r) => Resources::nested(r, resources),
            None => resources.clone(),
        };

        Some(Page {
            dict: dict.clone(),
            media_box,
            crop_box,
            rotate,
            resources,
            contents: OnceLock::new(),
        })
    }

    /// The page dictionary.
    pub fn dict(&self) -> &Dict<'a> {
        &self.dict
    }

    /// The media box.
    pub fn media_box(&self) -> Rect {
        self.media_box
    }

    /// The crop box.
    pub fn crop_box(&self) -> Rect {
        self.crop_box
    }

    /// The page rotation in degrees, normalized to 0, 90, 180 or 270.
    pub fn rotation(&self) -> i64 {
        self.rotate.rem_euclid(360) / 90 * 90
    }

    /// The resource scope of the page.
    pub fn resources(&self) -> &Resources<'a> {
        &self.resources
    }

    /// The annotation dictionaries of the page.
    pub fn annotations(&self) -> Vec<Dict<'a>> {
        self.dict
            .get::<Array>(ANNOTS)
            .map(|a| a.iter::<Dict>().collect())
            .unwrap_or_default()
    }

    /// The decoded content stream of the page.
    ///
    /// `/Contents` may be a single stream or an array of streams; array
    /// parts are concatenated with a line feed between them so that tokens
    /// cannot fuse across part boundaries. The result is cached.
    pub fn contents(&self) -> &[u8] {
        self.contents
            .get_or_init(|| {
                if let Some(stream) = self.dict.get::<Stream>(CONTENTS) {
                    match stream.decoded() {
                        Ok(data) => Some(data),
                        Err(e) => {
                            warn!("failed to decode page contents: {e}");

                            None
                        }
                    }
                } else if let Some(array) = self.dict.get::<Array>(CONTENTS) {
                    let mut collected = vec![];

                    for stream in array.iter::<Stream>() {
                        match stream.decoded() {
                            Ok(data) => {
                                collected.extend_from_slice(&data);
                                collected.push(b'\n');
                            }
                            Err(e) => warn!("skipping undecodable content part: {e}"),
                        }
                    }

                    Some(collected)
                } else {
                    if self.dict.contains_key(CONTENTS) {
                        warn!("page contents are neither a stream nor an array");
                    }

                    None
                }
            })
            .as_deref()
            .unwrap_or(&[])
    }

    /// An iterator over the operations of the page's content stream.
    pub fn operations(&self) -> OperationIter<'_> {
        OperationIter::new(self.contents())
    }
}

#[cfg(test)]
mod tests {
    use crate::object::{Dict, Rect};
    use crate::page::{collect_pages, Inherited, Resources};
    use crate::reader::Readable;

    #[test]
    fn rotation_normalized() {
        // Rotations are multiples of 90; anything else rounds down.
        let dict = Dict::from_bytes(b"<< /Type /Page /Rotate 450 >>").unwrap();
        let page = super::Page::new(&dict, &Inherited::default(), &Resources::new(Dict::empty()))
            .unwrap();

        assert_eq!(page.rotation(), 90);
    }

    #[test]
    fn media_box_fallback() {
        let dict = Dict::from_bytes(b"<< /Type /Page >>").unwrap();
        let page = super::Page::new(&dict, &Inherited::default(), &Resources::new(Dict::empty()))
            .unwrap();

        assert_eq!(page.media_box().width(), 612.0);
        assert_eq!(page.media_box().height(), 792.0);
    }

    #[test]
    fn inherited_media_box() {
        let dict = Dict::from_bytes(b"<< /Type /Page >>").unwrap();
        let inherited = Inherited {
            media_box: Some(Rect::new(0.0, 0.0, 100.0, 200.0)),
            crop_box: None,
            rotate: None,
        };
        let page =
            super::Page::new(&dict, &inherited, &Resources::new(Dict::empty())).unwrap();

        assert_eq!(page.media_box().width(), 100.0);
        assert_eq!(page.crop_box().height(), 200.0);
    }

    #[test]
    fn kids_without_xref_are_skipped() {
        // Kids given as references cannot resolve without an xref table.
        let root = Dict::from_bytes(b"<< /Type /Pages /Kids [1 0 R 2 0 R] /Count 2 >>").unwrap();
        let mut out = vec![];

        collect_pages(
            &root,
            &mut out,
            Inherited::default(),
            &Resources::new(Dict::empty()),
            0,
        );

        assert!(out.is_empty());
    }
}
