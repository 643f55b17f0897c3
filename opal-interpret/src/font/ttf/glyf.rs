//! The `glyf` table: glyph descriptions.

use kurbo::Affine;
use opal_syntax::byte_reader::Reader;

// Simple glyph point flags.
const ON_CURVE: u8 = 0x01;
const X_SHORT: u8 = 0x02;
const Y_SHORT: u8 = 0x04;
const REPEAT: u8 = 0x08;
const X_SAME_OR_POSITIVE: u8 = 0x10;
const Y_SAME_OR_POSITIVE: u8 = 0x20;

// Compound glyph flags.
const ARGS_ARE_WORDS: u16 = 0x0001;
const HAVE_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const HAVE_X_AND_Y_SCALE: u16 = 0x0040;
const HAVE_TWO_BY_TWO: u16 = 0x0080;

/// A point of a simple glyph outline, in font units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct GlyphPoint {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) on_curve: bool,
}

/// One component of a compound glyph.
#[derive(Debug, Clone)]
pub(crate) struct Component {
    pub(crate) glyph_index: u16,
    /// The component transform with the translation folded in. The
    /// arguments are interpreted as deltas in font units.
    pub(crate) transform: Affine,
}

/// A parsed glyph description.
pub(crate) enum Glyph {
    /// A glyph without an outline.
    Empty,
    /// Contours of explicit points.
    Simple(Vec<Vec<GlyphPoint>>),
    /// A combination of other glyphs.
    Compound(Vec<Component>),
}

/// Parse a single glyph record.
pub(crate) fn parse_glyph(data: &[u8]) -> Option<Glyph> {
    let mut r = Reader::new(data);

    let num_contours = r.read_i16()?;
    // Bounding box, recomputed from the points when needed.
    r.skip_bytes(8)?;

    if num_contours == 0 {
        return Some(Glyph::Empty);
    }

    if num_contours > 0 {
        parse_simple(&mut r, num_contours as usize)
    } else {
        parse_compound(&mut r)
    }
}

fn parse_simple(r: &mut Reader<'_>, num_contours: usize) -> Option<Glyph> {
    let mut end_points = Vec::with_capacity(num_contours);

    for _ in 0..num_contours {
        end_points.push(r.read_u16()?);
    }

    let num_points = usize::from(*end_points.last()?) + 1;

    // The hinting program is irrelevant for outline extraction.
    let instruction_len = usize::from(r.read_u16()?);
    let _ = r.skip_bytes(instruction_len);

    // Flags, with the repeat flag expanding runs.
    let mut flags = Vec::with_capacity(num_points);

    while flags.len() < num_points {
        let flag = r.read_byte()?;
        flags.push(flag);

        if flag & REPEAT != 0 {
            let count = r.read_byte()?;

            for _ in 0..count {
                if flags.len() >= num_points {
                    break;
                }

                flags.push(flag);
            }
        }
    }

    // Coordinates are cumulative deltas, x first, then y.
    let mut xs = Vec::with_capacity(num_points);
    let mut x: i32 = 0;

    for flag in &flags {
        if flag & X_SHORT != 0 {
            let delta = i32::from(r.read_byte()?);

            x += if flag & X_SAME_OR_POSITIVE != 0 {
                delta
            } else {
                -delta
            };
        } else if flag & X_SAME_OR_POSITIVE == 0 {
            x += i32::from(r.read_i16()?);
        }

        xs.push(x);
    }

    let mut ys = Vec::with_capacity(num_points);
    let mut y: i32 = 0;

    for flag in &flags {
        if flag & Y_SHORT != 0 {
            let delta = i32::from(r.read_byte()?);

            y += if flag & Y_SAME_OR_POSITIVE != 0 {
                delta
            } else {
                -delta
            };
        } else if flag & Y_SAME_OR_POSITIVE == 0 {
            y += i32::from(r.read_i16()?);
        }

        ys.push(y);
    }

    // Split the point stream into contours at the recorded end points.
    let mut contours = Vec::with_capacity(num_contours);
    let mut start = 0usize;

    for end in end_points {
        let end = usize::from(end) + 1;

        if end <= start || end > num_points {
            break;
        }

        let contour = (start..end)
            .map(|i| GlyphPoint {
                x: f64::from(xs[i]),
                y: f64::from(ys[i]),
                on_curve: flags[i] & ON_CURVE != 0,
            })
            .collect();

        contours.push(contour);
        start = end;
    }

    Some(Glyph::Simple(contours))
}

fn parse_compound(r: &mut Reader<'_>) -> Option<Glyph> {
    let mut components = vec![];

    loop {
        let flags = r.read_u16()?;
        let glyph_index = r.read_u16()?;

        let (arg1, arg2) = if flags & ARGS_ARE_WORDS != 0 {
            (f64::from(r.read_i16()?), f64::from(r.read_i16()?))
        } else {
            let a = r.read_byte()? as i8;
            let b = r.read_byte()? as i8;

            (f64::from(a), f64::from(b))
        };

        // Transform values are signed 2.14 fixed-point.
        let (mut xx, mut xy, mut yx, mut yy) = (1.0, 0.0, 0.0, 1.0);

        if flags & HAVE_SCALE != 0 {
            let scale = f2dot14(r.read_i16()?);
            xx = scale;
            yy = scale;
        } else if flags & HAVE_X_AND_Y_SCALE != 0 {
            xx = f2dot14(r.read_i16()?);
            yy = f2dot14(r.read_i16()?);
        } else if flags & HAVE_TWO_BY_TWO != 0 {
            xx = f2dot14(r.read_i16()?);
            xy = f2dot14(r.read_i16()?);
            yx = f2dot14(r.read_i16()?);
            yy = f2dot14(r.read_i16()?);
        }

        components.push(Component {
            glyph_index,
            transform: Affine::new([xx, xy, yx, yy, arg1, arg2]),
        });

        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }

    Some(Glyph::Compound(components))
}

#[inline]
fn f2dot14(v: i16) -> f64 {
    f64::from(v) / 16384.0
}

#[cfg(test)]
mod tests {
    use crate::font::ttf::glyf::{parse_glyph, Glyph};

    fn push16(out: &mut Vec<u8>, v: i16) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    /// A triangle with all points on-curve.
    fn triangle_glyph() -> Vec<u8> {
        let mut g = vec![];

        push16(&mut g, 1); // one contour
        push16(&mut g, 0); // xMin
        push16(&mut g, 0); // yMin
        push16(&mut g, 100); // xMax
        push16(&mut g, 100); // yMax
        push16(&mut g, 2); // endPtsOfContours: last point index 2
        push16(&mut g, 0); // no instructions

        // Flags: on-curve, x and y deltas as signed words.
        g.extend_from_slice(&[0x01, 0x01, 0x01]);

        // X deltas: 0, 100, -50.
        push16(&mut g, 0);
        push16(&mut g, 100);
        push16(&mut g, -50);
        // Y deltas: 0, 0, 100.
        push16(&mut g, 0);
        push16(&mut g, 0);
        push16(&mut g, 100);

        g
    }

    #[test]
    fn simple_glyph_points() {
        let glyph = parse_glyph(&triangle_glyph()).unwrap();

        let Glyph::Simple(contours) = glyph else {
            panic!("expected a simple glyph");
        };

        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert_eq!(c.len(), 3);
        assert_eq!((c[0].x, c[0].y), (0.0, 0.0));
        assert_eq!((c[1].x, c[1].y), (100.0, 0.0));
        assert_eq!((c[2].x, c[2].y), (50.0, 100.0));
        assert!(c.iter().all(|p| p.on_curve));
    }

    #[test]
    fn repeat_flag_and_short_deltas() {
        let mut g = vec![];

        push16(&mut g, 1);
        for _ in 0..4 {
            push16(&mut g, 0);
        }
        push16(&mut g, 3); // four points
        push16(&mut g, 0);

        // One flag byte with repeat covering all four points: on-curve,
        // x short positive, y short positive.
        g.extend_from_slice(&[0x01 | 0x02 | 0x04 | 0x10 | 0x20 | 0x08, 3]);

        // X deltas (unsigned bytes, positive).
        g.extend_from_slice(&[10, 10, 10, 10]);
        // Y deltas.
        g.extend_from_slice(&[0, 5, 5, 5]);

        let Glyph::Simple(contours) = parse_glyph(&g).unwrap() else {
            panic!("expected a simple glyph");
        };

        let c = &contours[0];
        assert_eq!((c[3].x, c[3].y), (40.0, 15.0));
    }

    #[test]
    fn compound_components() {
        let mut g = vec![];

        push16(&mut g, -1);
        for _ in 0..4 {
            push16(&mut g, 0);
        }

        // Component 1: glyph 5, byte args (3, 4), uniform scale 0.5,
        // more components follow.
        push16(&mut g, (0x0008 | 0x0020 | 0x0002) as i16);
        push16(&mut g, 5);
        g.push(3);
        g.push(4);
        push16(&mut g, 0x2000); // 0.5 in 2.14

        // Component 2: glyph 6, word args (-100, 50), no transform.
        push16(&mut g, 0x0002 | 0x0001);
        push16(&mut g, 6);
        push16(&mut g, -100);
        push16(&mut g, 50);

        let Glyph::Compound(components) = parse_glyph(&g).unwrap() else {
            panic!("expected a compound glyph");
        };

        assert_eq!(components.len(), 2);
        assert_eq!(components[0].glyph_index, 5);

        let c0 = components[0].transform.as_coeffs();
        assert_eq!(c0, [0.5, 0.0, 0.0, 0.5, 3.0, 4.0]);

        let c1 = components[1].transform.as_coeffs();
        assert_eq!(c1, [1.0, 0.0, 0.0, 1.0, -100.0, 50.0]);
    }

    #[test]
    fn empty_glyph() {
        let mut g = vec![];
        push16(&mut g, 0);
        for _ in 0..4 {
            push16(&mut g, 0);
        }

        assert!(matches!(parse_glyph(&g), Some(Glyph::Empty)));
    }
}
