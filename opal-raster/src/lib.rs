/*!
A small CPU rasterizer for the `opal` PDF renderer.

The crate renders [`kurbo`] paths into an RGBA8 [`Pixmap`]: anti-aliased
coverage-based fills with both PDF fill rules, stroke expansion with the
PDF cap and join styles, clip masks and affine image placement. Coordinates
are device pixels with the origin in the top-left corner and y growing
downward.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod fill;
mod image;
mod pixmap;
mod stroke;

pub use fill::{fill_path, make_mask, FillRule, Mask};
pub use image::{draw_image, ImageRgba8};
pub use pixmap::{Pixmap, Rgba};
pub use stroke::{expand_stroke, StrokeStyle};
