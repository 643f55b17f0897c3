//! The graphics state.

use crate::color::{ColorComponents, ColorSpace};
use crate::font::Font;
use crate::StrokeProps;
use kurbo::{Affine, Cap, Join};
use opal_raster::Rgba;
use smallvec::SmallVec;

#[derive(Clone, Debug)]
pub(crate) struct TextState {
    pub(crate) char_spacing: f32,
    pub(crate) word_spacing: f32,
    /// In percent, as set by `Tz`.
    pub(crate) horizontal_scaling: f32,
    pub(crate) leading: f32,
    pub(crate) font: Option<(Font, f32)>,
    pub(crate) render_mode: u8,
    pub(crate) rise: f32,
    pub(crate) text_matrix: Affine,
    pub(crate) line_matrix: Affine,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            font: None,
            render_mode: 0,
            rise: 0.0,
            text_matrix: Affine::IDENTITY,
            line_matrix: Affine::IDENTITY,
        }
    }
}

impl TextState {
    /// The glyph-space-to-text-space transform derived from the text
    /// parameters.
    pub(crate) fn parameter_transform(&self) -> Affine {
        let size = f64::from(self.font_size());

        Affine::new([
            size * f64::from(self.horizontal_scaling) / 100.0,
            0.0,
            0.0,
            size,
            0.0,
            f64::from(self.rise),
        ])
    }

    pub(crate) fn font_size(&self) -> f32 {
        self.font.as_ref().map(|f| f.1).unwrap_or(0.0)
    }

    /// Advance the text matrix past a glyph.
    pub(crate) fn advance(&mut self, glyph_width: f32, is_word_break: bool) {
        let word = if is_word_break { self.word_spacing } else { 0.0 };

        let tx = (glyph_width * self.font_size() + self.char_spacing + word)
            * self.horizontal_scaling
            / 100.0;

        self.text_matrix =
            self.text_matrix * Affine::new([1.0, 0.0, 0.0, 1.0, f64::from(tx), 0.0]);
    }

    /// Apply a `TJ` positional adjustment, given in thousandths of text
    /// space.
    pub(crate) fn adjust(&mut self, amount: f32) {
        let tx = -amount / 1000.0 * self.font_size() * self.horizontal_scaling / 100.0;

        self.text_matrix =
            self.text_matrix * Affine::new([1.0, 0.0, 0.0, 1.0, f64::from(tx), 0.0]);
    }
}

/// One snapshot of the graphics state, cloned on `q` and discarded on `Q`.
#[derive(Clone, Debug)]
pub(crate) struct State {
    pub(crate) ctm: Affine,
    pub(crate) stroke_cs: ColorSpace,
    pub(crate) stroke_components: ColorComponents,
    pub(crate) fill_cs: ColorSpace,
    pub(crate) fill_components: ColorComponents,
    pub(crate) line_width: f32,
    pub(crate) line_cap: Cap,
    pub(crate) line_join: Join,
    pub(crate) miter_limit: f32,
    pub(crate) dash_array: SmallVec<[f32; 4]>,
    pub(crate) dash_offset: f32,
    pub(crate) stroke_alpha: f32,
    pub(crate) fill_alpha: f32,
    pub(crate) text: TextState,
    /// The number of clips pushed to the device while this state was
    /// active; `Q` pops the difference.
    pub(crate) clip_depth: u32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            ctm: Affine::IDENTITY,
            stroke_cs: ColorSpace::DeviceGray,
            stroke_components: ColorSpace::DeviceGray.initial_components(),
            fill_cs: ColorSpace::DeviceGray,
            fill_components: ColorSpace::DeviceGray.initial_components(),
            line_width: 1.0,
            line_cap: Cap::Butt,
            line_join: Join::Miter,
            miter_limit: 10.0,
            dash_array: SmallVec::new(),
            dash_offset: 0.0,
            stroke_alpha: 1.0,
            fill_alpha: 1.0,
            text: TextState::default(),
            clip_depth: 0,
        }
    }
}

impl State {
    pub(crate) fn fill_color(&self) -> Rgba {
        self.fill_cs.to_rgba(&self.fill_components, self.fill_alpha)
    }

    pub(crate) fn stroke_color(&self) -> Rgba {
        self.stroke_cs
            .to_rgba(&self.stroke_components, self.stroke_alpha)
    }

    /// The approximate scale factor the CTM applies to lengths.
    pub(crate) fn transform_scale(&self) -> f32 {
        self.ctm.determinant().abs().sqrt() as f32
    }

    /// Stroke properties scaled into device space.
    pub(crate) fn stroke_props(&self) -> StrokeProps {
        let scale = self.transform_scale();

        StrokeProps {
            line_width: self.line_width * scale,
            line_cap: self.line_cap,
            line_join: self.line_join,
            miter_limit: self.miter_limit,
            dash_array: self.dash_array.iter().map(|d| d * scale).collect(),
            dash_offset: self.dash_offset * scale,
        }
    }

    /// The full glyph-to-device transform for the current text state.
    pub(crate) fn text_transform(&self) -> Affine {
        self.ctm * self.text.text_matrix * self.text.parameter_transform()
    }
}
