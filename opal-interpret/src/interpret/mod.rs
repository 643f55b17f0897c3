//! Executing content-stream operators against a device.

pub(crate) mod text;

use crate::color::ColorSpace;
use crate::context::Context;
use crate::x_object;
use crate::Device;
use kurbo::{Affine, BezPath, Point};
use log::{debug, warn};
use opal_raster::FillRule;
use opal_syntax::content::{Operation, OperationIter};
use opal_syntax::object::{Array, Dict, Name, Object};
use opal_syntax::page::{Page, Resources};
use smallvec::SmallVec;

/// How deeply form XObjects may nest.
pub(crate) const FORM_NESTING_LIMIT: usize = 16;

/// Interpret a page's content stream, delivering drawing events to the
/// device.
pub fn interpret_page(page: &Page<'_>, ctx: &mut Context, device: &mut impl Device) {
    interpret_content(page.contents(), page.resources(), ctx, device);
}

/// Interpret decoded content-stream bytes with the given resource scope.
///
/// Unbalanced `q` operators and dangling clips are cleaned up at the end,
/// so a malformed stream cannot corrupt the caller's state.
pub fn interpret_content(
    data: &[u8],
    resources: &Resources<'_>,
    ctx: &mut Context,
    device: &mut impl Device,
) {
    let base_depth = ctx.stack_depth();
    let base_clips = ctx.state().clip_depth;

    for op in OperationIter::new(data) {
        execute(&op, resources, ctx, device);
    }

    // Recover from unbalanced `q`.
    while ctx.stack_depth() > base_depth {
        restore_state(ctx, device);
    }

    let mut clips = ctx.state().clip_depth;
    while clips > base_clips {
        device.pop_clip();
        clips -= 1;
    }
    ctx.state_mut().clip_depth = base_clips;
    ctx.set_pending_clip(None);
    ctx.clear_path();
}

fn execute(op: &Operation<'_>, resources: &Resources<'_>, ctx: &mut Context, device: &mut impl Device) {
    let s = &op.operands;

    match op.operator.as_ref() {
        // General graphics state.
        b"q" => ctx.save_state(),
        b"Q" => restore_state(ctx, device),
        b"cm" => {
            if let Some(m) = matrix_operand(s) {
                let state = ctx.state_mut();
                state.ctm *= m;
            }
        }
        b"w" => {
            if let Some(w) = s.num(0) {
                ctx.state_mut().line_width = w;
            }
        }
        b"J" => {
            if let Some(cap) = s.get::<i64>(0) {
                ctx.state_mut().line_cap = convert_cap(cap);
            }
        }
        b"j" => {
            if let Some(join) = s.get::<i64>(0) {
                ctx.state_mut().line_join = convert_join(join);
            }
        }
        b"M" => {
            if let Some(limit) = s.num(0) {
                ctx.state_mut().miter_limit = limit;
            }
        }
        b"d" => {
            if let (Some(array), Some(phase)) = (s.get::<Array>(0), s.num(1)) {
                let state = ctx.state_mut();
                state.dash_array = array.iter::<f32>().collect();
                state.dash_offset = phase;
            }
        }
        // Rendering intent and flatness have no effect on this renderer.
        b"ri" | b"i" => {}
        b"gs" => {
            if let Some(name) = s.get::<Name>(0) {
                match resources
                    .lookup(b"ExtGState", &name)
                    .and_then(Object::into_dict)
                {
                    Some(gs) => apply_ext_g_state(&gs, ctx),
                    None => warn!("unknown graphics state {}", name.as_str()),
                }
            }
        }

        // Path construction.
        b"m" => {
            if let (Some(x), Some(y)) = (s.num(0), s.num(1)) {
                let p = Point::new(f64::from(x), f64::from(y));

                ctx.set_last_point(p);
                ctx.set_sub_path_start(p);
                ctx.path_mut().move_to(p);
            }
        }
        b"l" => {
            if let (Some(x), Some(y)) = (s.num(0), s.num(1)) {
                if ctx.path().elements().is_empty() {
                    return;
                }

                let p = Point::new(f64::from(x), f64::from(y));

                ctx.set_last_point(p);
                ctx.path_mut().line_to(p);
            }
        }
        b"c" => {
            if let Some(n) = s.all_nums().filter(|n| n.len() == 6) {
                if ctx.path().elements().is_empty() {
                    return;
                }

                let c1 = Point::new(f64::from(n[0]), f64::from(n[1]));
                let c2 = Point::new(f64::from(n[2]), f64::from(n[3]));
                let p = Point::new(f64::from(n[4]), f64::from(n[5]));

                ctx.set_last_point(p);
                ctx.path_mut().curve_to(c1, c2, p);
            }
        }
        b"v" => {
            // First control point coincides with the current point.
            if let Some(n) = s.all_nums().filter(|n| n.len() == 4) {
                if ctx.path().elements().is_empty() {
                    return;
                }

                let c1 = ctx.last_point();
                let c2 = Point::new(f64::from(n[0]), f64::from(n[1]));
                let p = Point::new(f64::from(n[2]), f64::from(n[3]));

                ctx.set_last_point(p);
                ctx.path_mut().curve_to(c1, c2, p);
            }
        }
        b"y" => {
            // Second control point coincides with the end point.
            if let Some(n) = s.all_nums().filter(|n| n.len() == 4) {
                if ctx.path().elements().is_empty() {
                    return;
                }

                let c1 = Point::new(f64::from(n[0]), f64::from(n[1]));
                let p = Point::new(f64::from(n[2]), f64::from(n[3]));

                ctx.set_last_point(p);
                ctx.path_mut().curve_to(c1, p, p);
            }
        }
        b"h" => {
            if !ctx.path().elements().is_empty() {
                ctx.path_mut().close_path();
                ctx.set_last_point(ctx.sub_path_start());
            }
        }
        b"re" => {
            if let Some(n) = s.all_nums().filter(|n| n.len() == 4) {
                let (x, y) = (f64::from(n[0]), f64::from(n[1]));
                let (w, h) = (f64::from(n[2]), f64::from(n[3]));

                let path = ctx.path_mut();
                path.move_to((x, y));
                path.line_to((x + w, y));
                path.line_to((x + w, y + h));
                path.line_to((x, y + h));
                path.close_path();

                ctx.set_last_point(Point::new(x, y));
                ctx.set_sub_path_start(Point::new(x, y));
            }
        }

        // Path painting.
        b"S" => {
            stroke_path(ctx, device);
            end_path(ctx, device);
        }
        b"s" => {
            ctx.path_mut().close_path();
            stroke_path(ctx, device);
            end_path(ctx, device);
        }
        b"f" | b"F" => {
            fill_path(ctx, device, FillRule::NonZero);
            end_path(ctx, device);
        }
        b"f*" => {
            fill_path(ctx, device, FillRule::EvenOdd);
            end_path(ctx, device);
        }
        b"B" => {
            fill_path(ctx, device, FillRule::NonZero);
            stroke_path(ctx, device);
            end_path(ctx, device);
        }
        b"B*" => {
            fill_path(ctx, device, FillRule::EvenOdd);
            stroke_path(ctx, device);
            end_path(ctx, device);
        }
        b"b" => {
            ctx.path_mut().close_path();
            fill_path(ctx, device, FillRule::NonZero);
            stroke_path(ctx, device);
            end_path(ctx, device);
        }
        b"b*" => {
            ctx.path_mut().close_path();
            fill_path(ctx, device, FillRule::EvenOdd);
            stroke_path(ctx, device);
            end_path(ctx, device);
        }
        b"n" => end_path(ctx, device),

        // Clipping: takes effect at the next painting operator.
        b"W" => ctx.set_pending_clip(Some(FillRule::NonZero)),
        b"W*" => ctx.set_pending_clip(Some(FillRule::EvenOdd)),

        // Color.
        b"CS" => {
            if let Some(name) = s.get::<Name>(0) {
                let cs = ColorSpace::from_name(&name).unwrap_or_default();
                let state = ctx.state_mut();
                state.stroke_cs = cs;
                state.stroke_components = cs.initial_components();
            }
        }
        b"cs" => {
            if let Some(name) = s.get::<Name>(0) {
                let cs = ColorSpace::from_name(&name).unwrap_or_default();
                let state = ctx.state_mut();
                state.fill_cs = cs;
                state.fill_components = cs.initial_components();
            }
        }
        b"SC" | b"SCN" => {
            if let Some(nums) = color_operands(s) {
                ctx.state_mut().stroke_components = nums;
            }
        }
        b"sc" | b"scn" => {
            if let Some(nums) = color_operands(s) {
                ctx.state_mut().fill_components = nums;
            }
        }
        b"G" => {
            if let Some(g) = s.num(0) {
                let state = ctx.state_mut();
                state.stroke_cs = ColorSpace::DeviceGray;
                state.stroke_components = SmallVec::from_slice(&[g]);
            }
        }
        b"g" => {
            if let Some(g) = s.num(0) {
                let state = ctx.state_mut();
                state.fill_cs = ColorSpace::DeviceGray;
                state.fill_components = SmallVec::from_slice(&[g]);
            }
        }
        b"RG" => {
            if let Some(n) = s.all_nums().filter(|n| n.len() == 3) {
                let state = ctx.state_mut();
                state.stroke_cs = ColorSpace::DeviceRgb;
                state.stroke_components = n.into_iter().collect();
            }
        }
        b"rg" => {
            if let Some(n) = s.all_nums().filter(|n| n.len() == 3) {
                let state = ctx.state_mut();
                state.fill_cs = ColorSpace::DeviceRgb;
                state.fill_components = n.into_iter().collect();
            }
        }
        b"K" => {
            if let Some(n) = s.all_nums().filter(|n| n.len() == 4) {
                let state = ctx.state_mut();
                state.stroke_cs = ColorSpace::DeviceCmyk;
                state.stroke_components = n.into_iter().collect();
            }
        }
        b"k" => {
            if let Some(n) = s.all_nums().filter(|n| n.len() == 4) {
                let state = ctx.state_mut();
                state.fill_cs = ColorSpace::DeviceCmyk;
                state.fill_components = n.into_iter().collect();
            }
        }

        // Text.
        b"BT" => text::begin_text(ctx),
        b"ET" => {}
        b"Tc" => {
            if let Some(v) = s.num(0) {
                ctx.state_mut().text.char_spacing = v;
            }
        }
        b"Tw" => {
            if let Some(v) = s.num(0) {
                ctx.state_mut().text.word_spacing = v;
            }
        }
        b"Tz" => {
            if let Some(v) = s.num(0) {
                ctx.state_mut().text.horizontal_scaling = v;
            }
        }
        b"TL" => {
            if let Some(v) = s.num(0) {
                ctx.state_mut().text.leading = v;
            }
        }
        b"Tf" => {
            if let (Some(name), Some(size)) = (s.get::<Name>(0), s.num(1)) {
                text::set_font(ctx, resources, &name, size);
            }
        }
        b"Tr" => {
            if let Some(mode) = s.get::<i64>(0) {
                ctx.state_mut().text.render_mode = mode.clamp(0, 7) as u8;
            }
        }
        b"Ts" => {
            if let Some(v) = s.num(0) {
                ctx.state_mut().text.rise = v;
            }
        }
        b"Td" => {
            if let (Some(tx), Some(ty)) = (s.num(0), s.num(1)) {
                text::translate_line(ctx, tx, ty);
            }
        }
        b"TD" => {
            if let (Some(tx), Some(ty)) = (s.num(0), s.num(1)) {
                ctx.state_mut().text.leading = -ty;
                text::translate_line(ctx, tx, ty);
            }
        }
        b"Tm" => {
            if let Some(m) = matrix_operand(s) {
                let text = &mut ctx.state_mut().text;
                text.text_matrix = m;
                text.line_matrix = m;
            }
        }
        b"T*" => text::next_line(ctx),
        b"Tj" => {
            if let Some(string) = s.get::<opal_syntax::object::String>(0) {
                text::show_text(ctx, device, &string.get());
            }
        }
        b"TJ" => {
            if let Some(array) = s.get::<Array>(0) {
                text::show_text_adjusted(ctx, device, &array);
            }
        }
        b"'" => {
            if let Some(string) = s.get::<opal_syntax::object::String>(0) {
                text::next_line(ctx);
                text::show_text(ctx, device, &string.get());
            }
        }
        b"\"" => {
            if let (Some(aw), Some(ac), Some(string)) =
                (s.num(0), s.num(1), s.get::<opal_syntax::object::String>(2))
            {
                let text = &mut ctx.state_mut().text;
                text.word_spacing = aw;
                text.char_spacing = ac;

                text::next_line(ctx);
                text::show_text(ctx, device, &string.get());
            }
        }

        // XObjects and inline images.
        b"Do" => {
            if let Some(name) = s.get::<Name>(0) {
                x_object::draw_x_object(&name, resources, ctx, device);
            }
        }
        b"BI" => {
            if let Some(Object::Stream(stream)) = s.get::<Object>(0) {
                x_object::draw_image_stream(&stream, ctx, device);
            }
        }

        // Marked content and Type3 metrics carry no rendering semantics
        // here.
        b"BMC" | b"BDC" | b"EMC" | b"MP" | b"DP" | b"d0" | b"d1" => {}

        other => {
            // Unknown operators are skipped for forward compatibility.
            debug!(
                "skipping unknown operator {}",
                String::from_utf8_lossy(other)
            );
        }
    }
}

fn restore_state(ctx: &mut Context, device: &mut impl Device) {
    let popped_clips = ctx.state().clip_depth;

    if ctx.restore_state().is_some() {
        let mut clips = popped_clips;
        let target = ctx.state().clip_depth;

        while clips > target {
            device.pop_clip();
            clips -= 1;
        }
    }
}

/// The current path transformed into device space.
fn device_path(ctx: &Context) -> BezPath {
    let mut path = ctx.path().clone();
    path.apply_affine(ctx.state().ctm);

    path
}

fn fill_path(ctx: &mut Context, device: &mut impl Device, rule: FillRule) {
    if ctx.path().elements().is_empty() {
        return;
    }

    let path = device_path(ctx);
    let state = ctx.state();

    device.fill_path(&path, state.fill_color(), rule);
}

fn stroke_path(ctx: &mut Context, device: &mut impl Device) {
    if ctx.path().elements().is_empty() {
        return;
    }

    let path = device_path(ctx);
    let state = ctx.state();

    device.stroke_path(&path, state.stroke_color(), &state.stroke_props());
}

/// Finish a painting operator: apply a pending clip, then discard the
/// path.
fn end_path(ctx: &mut Context, device: &mut impl Device) {
    if let Some(rule) = ctx.take_pending_clip() {
        device.push_clip(&device_path(ctx), rule);
        ctx.state_mut().clip_depth += 1;
    }

    ctx.clear_path();
}

fn matrix_operand(s: &opal_syntax::content::Stack<'_>) -> Option<Affine> {
    let n = s.all_nums().filter(|n| n.len() == 6)?;

    Some(Affine::new([
        f64::from(n[0]),
        f64::from(n[1]),
        f64::from(n[2]),
        f64::from(n[3]),
        f64::from(n[4]),
        f64::from(n[5]),
    ]))
}

fn color_operands(s: &opal_syntax::content::Stack<'_>) -> Option<crate::color::ColorComponents> {
    // `scn` may carry a trailing pattern name, which this renderer does
    // not support; the numeric prefix is still usable.
    let mut nums = SmallVec::new();

    for op in s.iter() {
        match op.clone().into_f32() {
            Some(v) => nums.push(v),
            None => break,
        }
    }

    if nums.is_empty() {
        warn!("color operator without numeric components");

        return None;
    }

    Some(nums)
}

fn convert_cap(cap: i64) -> kurbo::Cap {
    match cap {
        1 => kurbo::Cap::Round,
        2 => kurbo::Cap::Square,
        _ => kurbo::Cap::Butt,
    }
}

fn convert_join(join: i64) -> kurbo::Join {
    match join {
        1 => kurbo::Join::Round,
        2 => kurbo::Join::Bevel,
        _ => kurbo::Join::Miter,
    }
}


fn apply_ext_g_state(gs: &Dict<'_>, ctx: &mut Context) {
    if let Some(w) = gs.get::<f32>(b"LW") {
        ctx.state_mut().line_width = w;
    }

    if let Some(cap) = gs.get::<i64>(b"LC") {
        ctx.state_mut().line_cap = convert_cap(cap);
    }

    if let Some(join) = gs.get::<i64>(b"LJ") {
        ctx.state_mut().line_join = convert_join(join);
    }

    if let Some(limit) = gs.get::<f32>(b"ML") {
        ctx.state_mut().miter_limit = limit;
    }

    if let Some(dash) = gs.get::<Array>(b"D") {
        if let (Some(array), Some(phase)) = (dash.get::<Array>(0), dash.get::<f32>(1)) {
            let state = ctx.state_mut();
            state.dash_array = array.iter::<f32>().collect();
            state.dash_offset = phase;
        }
    }

    if let Some(alpha) = gs.get::<f32>(b"CA") {
        ctx.state_mut().stroke_alpha = alpha.clamp(0.0, 1.0);
    }

    if let Some(alpha) = gs.get::<f32>(b"ca") {
        ctx.state_mut().fill_alpha = alpha.clamp(0.0, 1.0);
    }

    if let Some(mode) = gs.get::<Name>(b"BM") {
        if mode.as_ref() != b"Normal" && mode.as_ref() != b"Compatible" {
            warn!("blend mode {} is approximated by Normal", mode.as_str());
        }
    }

    // /Font is [font-dict-ref size].
    if let Some(font_entry) = gs.get::<Array>(b"Font") {
        if let (Some(dict), Some(size)) = (font_entry.get::<Dict>(0), font_entry.get::<f32>(1)) {
            if let Some(font) = ctx.font_from_dict(&dict) {
                ctx.state_mut().text.font = Some((font, size));
            }
        }
    }
}
