//! Text object and text-showing operators.

use crate::context::Context;
use crate::Device;
use kurbo::Affine;
use log::warn;
use opal_raster::FillRule;
use opal_syntax::object::{Array, Name, Object};
use opal_syntax::page::Resources;

pub(super) fn begin_text(ctx: &mut Context) {
    let text = &mut ctx.state_mut().text;
    text.text_matrix = Affine::IDENTITY;
    text.line_matrix = Affine::IDENTITY;
}

pub(super) fn set_font(ctx: &mut Context, resources: &Resources<'_>, name: &Name, size: f32) {
    let font = ctx.font(resources, name);

    if font.is_none() {
        warn!("failed to load font {}", name.as_str());
    }

    ctx.state_mut().text.font = font.map(|f| (f, size));
}

/// `Td`: translate the line matrix and restart the text matrix there.
pub(super) fn translate_line(ctx: &mut Context, tx: f32, ty: f32) {
    let text = &mut ctx.state_mut().text;

    text.line_matrix =
        text.line_matrix * Affine::new([1.0, 0.0, 0.0, 1.0, f64::from(tx), f64::from(ty)]);
    text.text_matrix = text.line_matrix;
}

/// `T*`: advance to the next line using the leading.
pub(super) fn next_line(ctx: &mut Context) {
    let leading = ctx.state().text.leading;

    translate_line(ctx, 0.0, -leading);
}

pub(super) fn show_text(ctx: &mut Context, device: &mut impl Device, bytes: &[u8]) {
    let Some((font, _)) = ctx.state().text.font.clone() else {
        warn!("text shown without a selected font");

        return;
    };

    for code in font.codes(bytes) {
        show_glyph(ctx, device, &font, code);
    }
}

/// `TJ`: strings interleaved with positional adjustments in thousandths
/// of text space.
pub(super) fn show_text_adjusted(ctx: &mut Context, device: &mut impl Device, array: &Array<'_>) {
    for item in array.iter::<Object>() {
        match item {
            Object::String(s) => show_text(ctx, device, &s.get()),
            Object::Number(n) => ctx.state_mut().text.adjust(n.as_f32()),
            other => warn!("unexpected {other:?} in TJ array"),
        }
    }
}

fn show_glyph(ctx: &mut Context, device: &mut impl Device, font: &crate::font::Font, code: u32) {
    let glyph_id = font.glyph_id(code);
    let render_mode = ctx.state().text.render_mode;

    let visible = ctx.settings().render_text && render_mode != 3 && render_mode != 7;

    if visible {
        if render_mode >= 4 {
            // The clip variants would add the glyph to the clip path;
            // approximated by their painting part.
            warn!("text clipping render mode {render_mode} is approximated");
        }

        if let Some(mut path) = font.outline(glyph_id) {
            if !path.elements().is_empty() {
                path.apply_affine(ctx.state().text_transform());

                let state = ctx.state();

                match render_mode % 4 {
                    0 => device.fill_path(&path, state.fill_color(), FillRule::NonZero),
                    1 => device.stroke_path(&path, state.stroke_color(), &state.stroke_props()),
                    2 => {
                        device.fill_path(&path, state.fill_color(), FillRule::NonZero);
                        device.stroke_path(&path, state.stroke_color(), &state.stroke_props());
                    }
                    _ => {}
                }
            }
        }
    }

    // The advance happens regardless of visibility. Word spacing applies
    // to the single-byte code 32 only.
    let width = font.advance(code, glyph_id);
    let is_word_break = !font.is_two_byte() && code == 32;

    ctx.state_mut().text.advance(width, is_word_break);
}
