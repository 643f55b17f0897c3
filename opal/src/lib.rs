/*!
A PDF reader and rasterizer.

`opal` opens PDF 1.x files and renders their pages to RGBA8 bitmaps on the
CPU: cross-reference parsing (tables, streams and incremental updates),
the content-stream drawing language, embedded TrueType fonts and an
anti-aliased vector rasterizer, all implemented natively.

# Example
```no_run
use opal::{Document, RenderOptions};

let doc = Document::open("file.pdf").unwrap();
println!("{} pages", doc.page_count());

let image = doc.render(0, &RenderOptions::default()).unwrap();
println!("{}x{} pixels", image.width(), image.height());
```
*/

#![deny(missing_docs)]

mod renderer;

use crate::renderer::Renderer;
use kurbo::{Affine, Shape};
use log::warn;
use opal_interpret::{interpret_content, interpret_page, Context, Device, InterpreterSettings};

use opal_syntax::object::{Array, Dict, Name, Object, Rect, Stream};
use opal_syntax::page::Resources;
use opal_syntax::pdf::LoadError;
use opal_syntax::{Pdf, PdfData};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use opal_raster::{Pixmap, Rgba};
pub use opal_syntax::metadata::Metadata;

/// Canvases larger than this many pixels are refused.
const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Everything that can go wrong opening or rendering a document.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input could not be read, or a canvas could not be allocated.
    Io,
    /// The parser hit bytes that form no legal token.
    MalformedSyntax,
    /// The cross-reference data is missing, corrupt or cyclic.
    MalformedXref,
    /// A reference points at an object that does not exist.
    UnresolvedReference,
    /// An object has a different type than the context requires.
    TypeMismatch,
    /// A stream declares an unknown filter.
    UnsupportedFilter,
    /// A stream failed to decode under its declared filter.
    FilterError,
    /// An embedded font program is missing required tables or corrupt.
    FontError,
    /// A page index outside `0..page_count()`.
    OutOfRange,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Io => "the input could not be read",
            Error::MalformedSyntax => "malformed PDF syntax",
            Error::MalformedXref => "no usable cross-reference data",
            Error::UnresolvedReference => "reference to a missing object",
            Error::TypeMismatch => "object has the wrong type",
            Error::UnsupportedFilter => "unknown stream filter",
            Error::FilterError => "stream data failed to decode",
            Error::FontError => "unusable embedded font",
            Error::OutOfRange => "page index out of range",
        };

        write!(f, "{msg}")
    }
}

impl std::error::Error for Error {}

impl From<opal_syntax::filter::FilterError> for Error {
    fn from(value: opal_syntax::filter::FilterError) -> Self {
        match value {
            opal_syntax::filter::FilterError::Unsupported => Error::UnsupportedFilter,
            opal_syntax::filter::FilterError::Decode => Error::FilterError,
        }
    }
}

impl From<opal_syntax::xref::ResolveError> for Error {
    fn from(value: opal_syntax::xref::ResolveError) -> Self {
        match value {
            opal_syntax::xref::ResolveError::UnresolvedReference => Error::UnresolvedReference,
            opal_syntax::xref::ResolveError::TypeMismatch => Error::TypeMismatch,
        }
    }
}

impl From<opal_interpret::font::FontError> for Error {
    fn from(_: opal_interpret::font::FontError) -> Self {
        Error::FontError
    }
}

/// Which pages a batch render covers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRange {
    /// The first page, inclusive, 0-indexed.
    pub start: usize,
    /// The end of the range, exclusive.
    pub end: usize,
}

/// Options controlling rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Resolution in dots per inch.
    pub dpi: f32,
    /// An additional scale factor on top of the dpi.
    pub scale: f32,
    /// The background color the canvas is cleared to.
    pub background: Rgba,
    /// Leave the background transparent, ignoring `background`.
    pub transparent: bool,
    /// Anti-alias path edges.
    pub anti_alias: bool,
    /// Render text.
    pub render_text: bool,
    /// Render images.
    pub render_images: bool,
    /// Render annotation appearance streams.
    pub render_annotations: bool,
    /// The pages [`Document::render_range`] covers; `None` means all.
    pub page_range: Option<PageRange>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dpi: 150.0,
            scale: 1.0,
            background: Rgba::WHITE,
            transparent: false,
            anti_alias: true,
            render_text: true,
            render_images: true,
            render_annotations: true,
            page_range: None,
        }
    }
}

/// Basic properties of a page.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Page {
    /// The width of the media box in user-space units (1/72 inch).
    pub width: f64,
    /// The height of the media box in user-space units.
    pub height: f64,
    /// The page rotation in degrees (0, 90, 180 or 270).
    pub rotation: i64,
}

/// An open PDF document.
pub struct Document {
    pdf: Pdf,
    page_count: usize,
    metadata: Metadata,
}

impl Document {
    /// Open the PDF file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Document, Error> {
        let data = std::fs::read(path).map_err(|_| Error::Io)?;

        Self::open_bytes(data)
    }

    /// Open a PDF document held in memory.
    pub fn open_bytes(data: Vec<u8>) -> Result<Document, Error> {
        let data: PdfData = Arc::new(data);

        let pdf = Pdf::new(data).map_err(|e| match e {
            LoadError::Io => Error::Io,
            LoadError::MalformedXref => Error::MalformedXref,
            LoadError::Encrypted => {
                warn!("encrypted documents are unsupported");

                Error::MalformedXref
            }
        })?;

        let page_count = pdf.pages().len();
        let metadata = pdf.metadata();

        Ok(Document {
            pdf,
            page_count,
            metadata,
        })
    }

    /// The number of pages.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// The document information entries; absent entries are empty.
    pub fn info(&self) -> &Metadata {
        &self.metadata
    }

    /// The PDF version of the file.
    pub fn version(&self) -> f32 {
        self.pdf.version()
    }

    /// Basic properties of the page at `index`.
    pub fn page(&self, index: usize) -> Result<Page, Error> {
        let pages = self.pdf.pages();
        let page = pages.get(index).ok_or(Error::OutOfRange)?;

        let media_box = page.media_box();

        Ok(Page {
            width: media_box.width(),
            height: media_box.height(),
            rotation: page.rotation(),
        })
    }

    /// Render the page at `index` to an RGBA8 pixmap.
    pub fn render(&self, index: usize, options: &RenderOptions) -> Result<Pixmap, Error> {
        let pages = self.pdf.pages();
        let page = pages.get(index).ok_or(Error::OutOfRange)?;

        let media_box = page.media_box();
        let scale = f64::from(options.dpi) * f64::from(options.scale) / 72.0;

        if scale <= 0.0 {
            return Err(Error::OutOfRange);
        }

        let content_width = (media_box.width() * scale).ceil().max(1.0);
        let content_height = (media_box.height() * scale).ceil().max(1.0);

        // A rotated page swaps the canvas dimensions.
        let rotation = page.rotation();
        let (canvas_width, canvas_height) = match rotation {
            90 | 270 => (content_height, content_width),
            _ => (content_width, content_height),
        };

        if canvas_width * canvas_height > MAX_CANVAS_PIXELS as f64 {
            warn!("refusing a {canvas_width}x{canvas_height} canvas");

            return Err(Error::Io);
        }

        let (width, height) = (canvas_width as u32, canvas_height as u32);

        // User space to unrotated device pixels: scale, then flip y.
        let base = Affine::new([
            scale,
            0.0,
            0.0,
            -scale,
            -media_box.x0 * scale,
            media_box.y1 * scale,
        ]);

        let rotate = match rotation {
            90 => Affine::new([0.0, 1.0, -1.0, 0.0, canvas_width, 0.0]),
            180 => Affine::new([-1.0, 0.0, 0.0, -1.0, content_width, content_height]),
            270 => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, canvas_height]),
            _ => Affine::IDENTITY,
        };

        let transform = rotate * base;

        let background = if options.transparent {
            None
        } else {
            Some(options.background)
        };

        let settings = InterpreterSettings {
            render_text: options.render_text,
            render_images: options.render_images,
        };

        let mut device = Renderer::new(width, height, background, options.anti_alias);
        let mut ctx = Context::new(transform, settings);

        interpret_page(page, &mut ctx, &mut device);

        if options.render_annotations {
            for annotation in page.annotations() {
                render_annotation(&annotation, transform, settings, &mut device);
            }
        }

        Ok(device.into_pixmap())
    }

    /// Render the pages selected by `options.page_range` (all pages when
    /// absent), in order.
    pub fn render_range(&self, options: &RenderOptions) -> Result<Vec<Pixmap>, Error> {
        let range = options.page_range.unwrap_or(PageRange {
            start: 0,
            end: self.page_count,
        });

        if range.start > range.end || range.end > self.page_count {
            return Err(Error::OutOfRange);
        }

        (range.start..range.end)
            .map(|i| self.render(i, options))
            .collect()
    }
}

/// Render one annotation's normal appearance stream, mapped from its
/// `/BBox` onto its `/Rect`.
fn render_annotation(
    annotation: &Dict<'_>,
    base: Affine,
    settings: InterpreterSettings,
    device: &mut Renderer,
) {
    // Flag bit 2 hides the annotation.
    if let Some(flags) = annotation.get::<i64>(b"F") {
        if flags & 0x02 != 0 {
            return;
        }
    }

    let Some(rect) = annotation.get::<Rect>(b"Rect") else {
        return;
    };

    let Some(ap) = annotation.get::<Dict>(b"AP") else {
        return;
    };

    let stream = match ap.get::<Object>(b"N") {
        Some(Object::Stream(stream)) => stream,
        Some(Object::Dict(states)) => {
            // A state dictionary selects its appearance via /AS.
            let Some(state) = annotation.get::<Name>(b"AS") else {
                return;
            };

            match states.get::<Stream>(state.as_ref()) {
                Some(stream) => stream,
                None => return,
            }
        }
        _ => return,
    };

    let dict = stream.dict();

    let Some(bbox) = dict.get::<Rect>(b"BBox") else {
        return;
    };

    let matrix = dict
        .get::<Array>(b"Matrix")
        .map(|m| {
            let n: Vec<f64> = m.iter::<f64>().take(6).collect();

            if n.len() == 6 {
                Affine::new([n[0], n[1], n[2], n[3], n[4], n[5]])
            } else {
                Affine::IDENTITY
            }
        })
        .unwrap_or(Affine::IDENTITY);

    // Map the matrix-transformed bounding box onto the annotation
    // rectangle.
    let corners = [
        matrix * kurbo::Point::new(bbox.x0, bbox.y0),
        matrix * kurbo::Point::new(bbox.x1, bbox.y0),
        matrix * kurbo::Point::new(bbox.x0, bbox.y1),
        matrix * kurbo::Point::new(bbox.x1, bbox.y1),
    ];

    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    if max_x - min_x <= 0.0 || max_y - min_y <= 0.0 {
        return;
    }

    let fit = Affine::translate((rect.x0, rect.y0))
        * Affine::scale_non_uniform(
            rect.width() / (max_x - min_x),
            rect.height() / (max_y - min_y),
        )
        * Affine::translate((-min_x, -min_y));

    let transform = base * fit * matrix;

    let data = match stream.decoded() {
        Ok(data) => data,
        Err(e) => {
            warn!("failed to decode annotation appearance: {e}");

            return;
        }
    };

    let resources = dict
        .get::<Dict>(b"Resources")
        .map(Resources::new)
        .unwrap_or_else(|| Resources::new(Dict::empty()));

    // Clip to the appearance bounding box.
    let mut clip = kurbo::Rect::new(bbox.x0, bbox.y0, bbox.x1, bbox.y1).to_path(0.1);
    clip.apply_affine(transform);
    device.push_clip(&clip, opal_raster::FillRule::NonZero);

    let mut ctx = Context::new(transform, settings);
    interpret_content(&data, &resources, &mut ctx, device);

    device.pop_clip();
}

#[cfg(test)]
mod tests {
    use crate::{Document, Error};

    #[test]
    fn open_garbage() {
        assert_eq!(
            Document::open_bytes(b"definitely not a pdf".to_vec()).err(),
            Some(Error::MalformedXref)
        );
    }

    #[test]
    fn open_missing_file() {
        assert_eq!(
            Document::open("/does/not/exist.pdf").err(),
            Some(Error::Io)
        );
    }
}
