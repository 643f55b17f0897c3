//! Form and image XObjects.

use crate::color::ColorSpace;
use crate::context::Context;
use crate::interpret::interpret_content;
use crate::Device;
use kurbo::{Affine, Shape};
use log::warn;
use opal_raster::ImageRgba8;
use opal_syntax::object::dict::keys::{
    BITS_PER_COMPONENT, COLOR_SPACE, DECODE, HEIGHT, IMAGE_MASK, MATRIX, RESOURCES, SUBTYPE, WIDTH,
};
use opal_syntax::object::{Array, Dict, Name, Object, Rect, Stream};
use opal_syntax::page::Resources;

/// `Do`: draw the named XObject.
pub(crate) fn draw_x_object(
    name: &Name,
    resources: &Resources<'_>,
    ctx: &mut Context,
    device: &mut impl Device,
) {
    let Some(Object::Stream(stream)) = resources.lookup(b"XObject", name) else {
        warn!("unknown XObject {}", name.as_str());

        return;
    };

    match stream.dict().get::<Name>(SUBTYPE) {
        Some(subtype) if subtype.as_ref() == b"Form" => {
            draw_form(&stream, resources, ctx, device);
        }
        Some(subtype) if subtype.as_ref() == b"Image" => {
            draw_image_stream(&stream, ctx, device);
        }
        other => {
            warn!("XObject {} has unsupported subtype {other:?}", name.as_str());
        }
    }
}

/// Interpret a form XObject: its own content stream under the form matrix,
/// clipped to its bounding box.
pub(crate) fn draw_form(
    stream: &Stream<'_>,
    parent_resources: &Resources<'_>,
    ctx: &mut Context,
    device: &mut impl Device,
) {
    if !ctx.enter_form() {
        warn!("form XObjects nest too deeply, skipping");

        return;
    }

    let dict = stream.dict();

    let data = match stream.decoded() {
        Ok(data) => data,
        Err(e) => {
            warn!("failed to decode form XObject: {e}");

            ctx.leave_form();
            return;
        }
    };

    let resources = match dict.get::<Dict>(RESOURCES) {
        Some(r) => Resources::nested(r, parent_resources),
        None => parent_resources.clone(),
    };

    ctx.save_state();

    if let Some(matrix) = dict.get::<Array>(MATRIX) {
        let m: Vec<f64> = matrix.iter::<f64>().take(6).collect();

        if m.len() == 6 {
            ctx.state_mut().ctm *= Affine::new([m[0], m[1], m[2], m[3], m[4], m[5]]);
        }
    }

    if let Some(bbox) = dict.get::<Rect>(b"BBox") {
        let mut path = kurbo::Rect::new(bbox.x0, bbox.y0, bbox.x1, bbox.y1).to_path(0.1);
        path.apply_affine(ctx.state().ctm);

        device.push_clip(&path, crate::FillRule::NonZero);
        ctx.state_mut().clip_depth += 1;
    }

    interpret_content(&data, &resources, ctx, device);

    // `interpret_content` rebalances its own clips; ours is popped by the
    // state restore below.
    restore_after_form(ctx, device);
    ctx.leave_form();
}

fn restore_after_form(ctx: &mut Context, device: &mut impl Device) {
    let clips = ctx.state().clip_depth;

    if ctx.restore_state().is_some() {
        let target = ctx.state().clip_depth;
        let mut clips = clips;

        while clips > target {
            device.pop_clip();
            clips -= 1;
        }
    }
}

/// Draw an image XObject or inline image.
pub(crate) fn draw_image_stream(stream: &Stream<'_>, ctx: &mut Context, device: &mut impl Device) {
    if !ctx.settings().render_images {
        return;
    }

    let dict = stream.dict();

    // Inline images abbreviate their keys.
    let get_num = |long: &[u8], short: &[u8]| -> Option<i64> {
        dict.get::<i64>(long).or_else(|| dict.get::<i64>(short))
    };

    let Some(width) = get_num(WIDTH, b"W").and_then(|w| u32::try_from(w).ok()) else {
        warn!("image without width");

        return;
    };
    let Some(height) = get_num(HEIGHT, b"H").and_then(|h| u32::try_from(h).ok()) else {
        warn!("image without height");

        return;
    };

    if width == 0 || height == 0 || width.saturating_mul(height) > 1 << 26 {
        warn!("image dimensions {width}x{height} are unusable");

        return;
    }

    if let Some(filter) = stream.pass_through_filter() {
        // DCT/JPX/CCITT pixel data stays opaque to this renderer.
        warn!("image with {filter:?} content is not decoded, skipping");

        return;
    }

    let bpc = get_num(BITS_PER_COMPONENT, b"BPC").unwrap_or(8);

    let is_mask = dict
        .get::<bool>(IMAGE_MASK)
        .or_else(|| dict.get::<bool>(b"IM"))
        .unwrap_or(false);

    let data = match stream.decoded() {
        Ok(data) => data,
        Err(e) => {
            warn!("failed to decode image data: {e}");

            return;
        }
    };

    let image = if is_mask {
        stencil_to_rgba(&data, width, height, dict, ctx)
    } else {
        let cs = dict
            .get::<Object>(COLOR_SPACE)
            .or_else(|| dict.get::<Object>(b"CS"))
            .and_then(|o| o.into_name())
            .and_then(|n| ColorSpace::from_name(&n));

        samples_to_rgba(&data, width, height, bpc, cs)
    };

    let Some(image) = image else {
        return;
    };

    let alpha = ctx.state().fill_alpha;

    device.draw_image(&image, ctx.state().ctm, alpha);
}

/// Expand an image mask: 1-bit samples where 0 paints the fill color (or
/// 1, when `/Decode [1 0]` inverts the polarity).
fn stencil_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    dict: &Dict<'_>,
    ctx: &Context,
) -> Option<ImageRgba8> {
    let inverted = dict
        .get::<Array>(DECODE)
        .or_else(|| dict.get::<Array>(b"D"))
        .map(|d| d.get::<f32>(0) == Some(1.0))
        .unwrap_or(false);

    let fill = ctx.state().fill_color();
    let (r, g, b) = (
        (fill.r * 255.0) as u8,
        (fill.g * 255.0) as u8,
        (fill.b * 255.0) as u8,
    );

    let row_bytes = (width as usize).div_ceil(8);

    if data.len() < row_bytes * height as usize {
        warn!("image mask data is too short");

        return None;
    }

    let mut out = Vec::with_capacity(width as usize * height as usize * 4);

    for y in 0..height as usize {
        let row = &data[y * row_bytes..];

        for x in 0..width as usize {
            let bit = (row[x / 8] >> (7 - x % 8)) & 1;
            let paint = (bit == 0) != inverted;

            if paint {
                out.extend_from_slice(&[r, g, b, 255]);
            } else {
                out.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }

    Some(ImageRgba8 {
        width,
        height,
        data: out,
    })
}

/// Expand gray/RGB samples to RGBA8. 1-bit gray and 8-bit gray, RGB and
/// CMYK are handled; anything else is skipped.
fn samples_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    bpc: i64,
    cs: Option<ColorSpace>,
) -> Option<ImageRgba8> {
    let cs = cs.unwrap_or(ColorSpace::DeviceGray);
    let pixels = width as usize * height as usize;

    let mut out = Vec::with_capacity(pixels * 4);

    match (cs, bpc) {
        (ColorSpace::DeviceGray, 1) => {
            let row_bytes = (width as usize).div_ceil(8);

            if data.len() < row_bytes * height as usize {
                warn!("bilevel image data is too short");

                return None;
            }

            for y in 0..height as usize {
                let row = &data[y * row_bytes..];

                for x in 0..width as usize {
                    let bit = (row[x / 8] >> (7 - x % 8)) & 1;
                    let v = if bit == 1 { 255 } else { 0 };

                    out.extend_from_slice(&[v, v, v, 255]);
                }
            }
        }
        (ColorSpace::DeviceGray, 8) => {
            if data.len() < pixels {
                warn!("gray image data is too short");

                return None;
            }

            for v in &data[..pixels] {
                out.extend_from_slice(&[*v, *v, *v, 255]);
            }
        }
        (ColorSpace::DeviceRgb, 8) => {
            if data.len() < pixels * 3 {
                warn!("rgb image data is too short");

                return None;
            }

            for rgb in data[..pixels * 3].chunks_exact(3) {
                out.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
            }
        }
        (ColorSpace::DeviceCmyk, 8) => {
            if data.len() < pixels * 4 {
                warn!("cmyk image data is too short");

                return None;
            }

            for cmyk in data[..pixels * 4].chunks_exact(4) {
                let comps = [
                    f32::from(cmyk[0]) / 255.0,
                    f32::from(cmyk[1]) / 255.0,
                    f32::from(cmyk[2]) / 255.0,
                    f32::from(cmyk[3]) / 255.0,
                ];
                let (r, g, b) = ColorSpace::DeviceCmyk.to_rgb(&comps);

                out.extend_from_slice(&[
                    (r * 255.0) as u8,
                    (g * 255.0) as u8,
                    (b * 255.0) as u8,
                    255,
                ]);
            }
        }
        (cs, bpc) => {
            warn!("unsupported image format: {cs:?} at {bpc} bits per component");

            return None;
        }
    }

    Some(ImageRgba8 {
        width,
        height,
        data: out,
    })
}
