//! Affine image placement.

use crate::fill::Mask;
use crate::pixmap::{Pixmap, Rgba};
use kurbo::{Affine, Point};
use log::warn;

/// Decoded RGBA8 pixel data, rows top to bottom.
#[derive(Debug, Clone)]
pub struct ImageRgba8 {
    /// The width in samples.
    pub width: u32,
    /// The height in samples.
    pub height: u32,
    /// Four bytes per sample, straight alpha.
    pub data: Vec<u8>,
}

impl ImageRgba8 {
    #[inline]
    fn sample(&self, x: u32, y: u32) -> Rgba {
        let i = (y as usize * self.width as usize + x as usize) * 4;

        Rgba::new(
            f32::from(self.data[i]) / 255.0,
            f32::from(self.data[i + 1]) / 255.0,
            f32::from(self.data[i + 2]) / 255.0,
            f32::from(self.data[i + 3]) / 255.0,
        )
    }
}

/// Draw an image whose unit square (origin bottom-left, y up, as PDF
/// defines image space) is mapped to the device by `transform`.
///
/// Device pixels are inverse-mapped into the image and sampled with
/// nearest neighbor.
pub fn draw_image(
    pix: &mut Pixmap,
    image: &ImageRgba8,
    transform: Affine,
    alpha: f32,
    clip: Option<&Mask>,
) {
    if image.width == 0 || image.height == 0 {
        return;
    }

    if image.data.len() < image.width as usize * image.height as usize * 4 {
        warn!("image data is shorter than its declared dimensions");

        return;
    }

    if transform.determinant().abs() < 1e-12 {
        warn!("degenerate image transform, skipping image");

        return;
    }

    let inverse = transform.inverse();

    // The device-space bounding box of the transformed unit square.
    let corners = [
        transform * Point::new(0.0, 0.0),
        transform * Point::new(1.0, 0.0),
        transform * Point::new(0.0, 1.0),
        transform * Point::new(1.0, 1.0),
    ];

    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let x0 = min_x.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().min(f64::from(pix.width()))).max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let y1 = (max_y.ceil().min(f64::from(pix.height()))).max(0.0) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let unit = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);

            if !(0.0..1.0).contains(&unit.x) || !(0.0..1.0).contains(&unit.y) {
                continue;
            }

            // Image space has its origin at the bottom-left, sample rows
            // run top to bottom.
            let sx = ((unit.x * f64::from(image.width)) as u32).min(image.width - 1);
            let sy = (((1.0 - unit.y) * f64::from(image.height)) as u32).min(image.height - 1);

            let sample = image.sample(sx, sy);

            let mut coverage = alpha;
            if let Some(mask) = clip {
                coverage *= mask.coverage(x, y);
            }

            pix.blend_pixel(x, y, sample, coverage);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::image::{draw_image, ImageRgba8};
    use crate::pixmap::{Pixmap, Rgba};
    use kurbo::Affine;

    fn checker() -> ImageRgba8 {
        // 2x2: top row red/green, bottom row blue/white.
        let px = |r: u8, g: u8, b: u8| [r, g, b, 255];
        let mut data = vec![];
        data.extend(px(255, 0, 0));
        data.extend(px(0, 255, 0));
        data.extend(px(0, 0, 255));
        data.extend(px(255, 255, 255));

        ImageRgba8 {
            width: 2,
            height: 2,
            data,
        }
    }

    #[test]
    fn upright_placement() {
        let mut pix = Pixmap::new(8, 8);
        pix.clear(Rgba::BLACK);

        // Map the unit square to the full canvas, with the y-flip a page
        // transform carries: the image's top row lands at the top.
        let transform = Affine::new([8.0, 0.0, 0.0, -8.0, 0.0, 8.0]);
        draw_image(&mut pix, &checker(), transform, 1.0, None);

        assert_eq!(pix.pixel(1, 1), Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(pix.pixel(6, 1), Rgba::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(pix.pixel(1, 6), Rgba::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(pix.pixel(6, 6), Rgba::WHITE);
    }

    #[test]
    fn outside_pixels_untouched() {
        let mut pix = Pixmap::new(8, 8);
        pix.clear(Rgba::BLACK);

        // Unit square mapped (flipped) onto the region [2, 6] x [2, 6].
        let transform = Affine::new([4.0, 0.0, 0.0, -4.0, 2.0, 6.0]);
        draw_image(&mut pix, &checker(), transform, 1.0, None);

        assert_eq!(pix.pixel(0, 0), Rgba::BLACK);
        assert_eq!(pix.pixel(7, 7), Rgba::BLACK);
        assert_eq!(pix.pixel(3, 3), Rgba::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn degenerate_transform_skipped() {
        let mut pix = Pixmap::new(4, 4);
        draw_image(&mut pix, &checker(), Affine::scale(0.0), 1.0, None);
    }
}
