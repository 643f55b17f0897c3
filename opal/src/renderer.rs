//! The device implementation binding interpreter events to the
//! rasterizer.

use kurbo::{Affine, BezPath};
use opal_interpret::{Device, StrokeProps};
use opal_raster::{
    draw_image, expand_stroke, fill_path, make_mask, FillRule, ImageRgba8, Mask, Pixmap, Rgba,
    StrokeStyle,
};

pub(crate) struct Renderer {
    pixmap: Pixmap,
    clip_stack: Vec<Mask>,
    anti_alias: bool,
}

impl Renderer {
    pub(crate) fn new(width: u32, height: u32, background: Option<Rgba>, anti_alias: bool) -> Self {
        let mut pixmap = Pixmap::new(width, height);

        if let Some(background) = background {
            pixmap.clear(background);
        }

        Self {
            pixmap,
            clip_stack: vec![],
            anti_alias,
        }
    }

    pub(crate) fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    fn clip(&self) -> Option<&Mask> {
        self.clip_stack.last()
    }
}

impl Device for Renderer {
    fn fill_path(&mut self, path: &BezPath, color: Rgba, fill_rule: FillRule) {
        fill_path(
            &mut self.pixmap,
            path,
            color,
            fill_rule,
            self.anti_alias,
            self.clip_stack.last(),
        );
    }

    fn stroke_path(&mut self, path: &BezPath, color: Rgba, stroke: &StrokeProps) {
        let style = StrokeStyle {
            // Hairlines thinner than a pixel render as one pixel wide.
            width: f64::from(stroke.line_width.max(1.0)),
            cap: stroke.line_cap,
            join: stroke.line_join,
            miter_limit: f64::from(stroke.miter_limit),
            dash_array: stroke.dash_array.iter().map(|d| f64::from(*d)).collect(),
            dash_offset: f64::from(stroke.dash_offset),
        };

        let outline = expand_stroke(path, &style);

        fill_path(
            &mut self.pixmap,
            &outline,
            color,
            FillRule::NonZero,
            self.anti_alias,
            self.clip_stack.last(),
        );
    }

    fn push_clip(&mut self, path: &BezPath, fill_rule: FillRule) {
        let mut mask = make_mask(
            path,
            self.pixmap.width(),
            self.pixmap.height(),
            fill_rule,
            self.anti_alias,
        );

        if let Some(current) = self.clip() {
            mask.intersect(current);
        }

        self.clip_stack.push(mask);
    }

    fn pop_clip(&mut self) {
        if self.clip_stack.pop().is_none() {
            log::warn!("clip stack underflow");
        }
    }

    fn draw_image(&mut self, image: &ImageRgba8, transform: Affine, alpha: f32) {
        draw_image(
            &mut self.pixmap,
            image,
            transform,
            alpha,
            self.clip_stack.last(),
        );
    }
}
