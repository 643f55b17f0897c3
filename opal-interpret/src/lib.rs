/*!
Interpretation of PDF content streams.

This crate turns the operator stream of a page into semantic drawing
events: it maintains the graphics-state stack, assembles paths, decodes
text through embedded TrueType fonts and resolves XObjects. The events are
delivered to a [`Device`], which is free to rasterize them (as the `opal`
crate does), collect them, or convert them to another format.

Coordinates handed to the device are fully transformed: paths are in
device space, and stroke properties are scaled accordingly.
*/

#![deny(missing_docs)]

use kurbo::{Affine, BezPath, Cap, Join};
use smallvec::SmallVec;

pub mod color;
pub mod context;
pub mod font;
pub mod interpret;

mod state;
mod x_object;

pub use context::Context;
pub use interpret::{interpret_content, interpret_page};
pub use opal_raster::{FillRule, ImageRgba8, Rgba};

/// Stroke properties snapshotted from the graphics state, already scaled
/// to device space.
#[derive(Debug, Clone)]
pub struct StrokeProps {
    /// The line width in device pixels.
    pub line_width: f32,
    /// The cap style.
    pub line_cap: Cap,
    /// The join style.
    pub line_join: Join,
    /// The miter limit.
    pub miter_limit: f32,
    /// The dash pattern in device pixels; empty means solid.
    pub dash_array: SmallVec<[f32; 4]>,
    /// The dash phase in device pixels.
    pub dash_offset: f32,
}

/// The receiver of drawing events.
///
/// Paths arrive in device coordinates. Clips nest: every `push_clip`
/// narrows the active clip until the matching `pop_clip`.
pub trait Device {
    /// Fill a path.
    fn fill_path(&mut self, path: &BezPath, color: Rgba, fill_rule: FillRule);

    /// Stroke a path.
    fn stroke_path(&mut self, path: &BezPath, color: Rgba, stroke: &StrokeProps);

    /// Intersect the active clip with a path.
    fn push_clip(&mut self, path: &BezPath, fill_rule: FillRule);

    /// Restore the clip active before the matching `push_clip`.
    fn pop_clip(&mut self);

    /// Draw an image whose unit square is mapped to the device by
    /// `transform`.
    fn draw_image(&mut self, image: &ImageRgba8, transform: Affine, alpha: f32);
}

/// Settings controlling what the interpreter renders.
#[derive(Debug, Clone, Copy)]
pub struct InterpreterSettings {
    /// Whether text is rendered.
    pub render_text: bool,
    /// Whether images are rendered.
    pub render_images: bool,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            render_text: true,
            render_images: true,
        }
    }
}
