//! Converting glyph descriptions into cubic Bézier paths.

use crate::font::ttf::glyf::{Glyph, GlyphPoint};
use crate::font::ttf::TrueTypeFont;
use kurbo::{Affine, BezPath, Point};
use log::warn;

/// How deeply compound glyphs may nest.
const COMPONENT_DEPTH_LIMIT: usize = 64;

/// Extract a glyph outline in font units. Every contour of the result is
/// closed.
pub(crate) fn glyph_path(font: &TrueTypeFont, glyph_id: u16) -> Option<BezPath> {
    glyph_path_impl(font, glyph_id, 0)
}

fn glyph_path_impl(font: &TrueTypeFont, glyph_id: u16, depth: usize) -> Option<BezPath> {
    if depth >= COMPONENT_DEPTH_LIMIT {
        warn!("compound glyph nesting exceeds the depth limit");

        return None;
    }

    let mut path = BezPath::new();

    match font.glyph(glyph_id)? {
        Glyph::Empty => {}
        Glyph::Simple(contours) => {
            for contour in &contours {
                add_contour(&mut path, contour);
            }
        }
        Glyph::Compound(components) => {
            for component in &components {
                // A broken component should not take the others with it.
                let Some(mut sub) = glyph_path_impl(font, component.glyph_index, depth + 1)
                else {
                    warn!("skipping unreadable glyph component {}", component.glyph_index);

                    continue;
                };

                sub.apply_affine(component.transform);
                path.extend(sub);
            }
        }
    }

    Some(path)
}

/// Walk one contour, inserting the implicit on-curve midpoints between
/// consecutive off-curve points and lifting the quadratic segments to
/// cubics.
fn add_contour(path: &mut BezPath, points: &[GlyphPoint]) {
    let n = points.len();

    if n == 0 {
        return;
    }

    let first_on_curve = points.iter().position(|p| p.on_curve);

    let (start, start_idx) = match first_on_curve {
        Some(i) => (Point::new(points[i].x, points[i].y), i),
        // All points off-curve: the contour starts at the implicit
        // midpoint between the first and last points.
        None => (
            Point::new(
                (points[0].x + points[n - 1].x) / 2.0,
                (points[0].y + points[n - 1].y) / 2.0,
            ),
            0,
        ),
    };

    path.move_to(start);
    let mut current = start;

    let mut i = (start_idx + 1) % n;
    let mut count = 0;

    while count < n {
        let p = &points[i];

        if p.on_curve {
            let to = Point::new(p.x, p.y);
            path.line_to(to);
            current = to;
        } else {
            let control = Point::new(p.x, p.y);

            let next_idx = (i + 1) % n;
            let next = &points[next_idx];

            let end = if next.on_curve {
                // The explicit on-curve point ends this segment; skip it.
                count += 1;
                i = next_idx;

                Point::new(next.x, next.y)
            } else {
                // Two consecutive off-curve points imply an on-curve
                // midpoint between them.
                Point::new((p.x + next.x) / 2.0, (p.y + next.y) / 2.0)
            };

            // Lift the quadratic (current, control, end) to a cubic.
            let c1 = current + (control - current) * (2.0 / 3.0);
            let c2 = end + (control - end) * (2.0 / 3.0);

            path.curve_to(c1, c2, end);
            current = end;
        }

        i = (i + 1) % n;
        count += 1;
    }

    path.close_path();
}

#[cfg(test)]
mod tests {
    use crate::font::ttf::glyf::GlyphPoint;
    use kurbo::{BezPath, PathEl};

    fn on(x: f64, y: f64) -> GlyphPoint {
        GlyphPoint {
            x,
            y,
            on_curve: true,
        }
    }

    fn off(x: f64, y: f64) -> GlyphPoint {
        GlyphPoint {
            x,
            y,
            on_curve: false,
        }
    }

    fn contour(points: &[GlyphPoint]) -> BezPath {
        let mut path = BezPath::new();
        super::add_contour(&mut path, points);
        path
    }

    fn is_closed(path: &BezPath) -> bool {
        matches!(path.elements().last(), Some(PathEl::ClosePath))
    }

    #[test]
    fn polygon_contour() {
        let path = contour(&[on(0.0, 0.0), on(10.0, 0.0), on(5.0, 10.0)]);

        assert!(is_closed(&path));
        assert_eq!(
            path.elements()
                .iter()
                .filter(|el| matches!(el, PathEl::LineTo(_)))
                .count(),
            2
        );
    }

    #[test]
    fn quadratic_becomes_cubic() {
        let path = contour(&[on(0.0, 0.0), off(5.0, 10.0), on(10.0, 0.0)]);

        let cubics: Vec<_> = path
            .elements()
            .iter()
            .filter_map(|el| match el {
                PathEl::CurveTo(c1, c2, p) => Some((*c1, *c2, *p)),
                _ => None,
            })
            .collect();

        assert_eq!(cubics.len(), 1);

        let (c1, c2, p) = cubics[0];

        // C1 = P0 + 2/3 (Q - P0), C2 = P1 + 2/3 (Q - P1).
        assert!((c1.x - 10.0 / 3.0).abs() < 1e-9);
        assert!((c1.y - 20.0 / 3.0).abs() < 1e-9);
        assert!((c2.x - (10.0 + 2.0 / 3.0 * -5.0)).abs() < 1e-9);
        assert!((c2.y - 20.0 / 3.0).abs() < 1e-9);
        assert_eq!(p, kurbo::Point::new(10.0, 0.0));
    }

    #[test]
    fn consecutive_off_curve_points_get_midpoint() {
        // A "circle-like" contour of four off-curve points only.
        let path = contour(&[
            off(10.0, 0.0),
            off(10.0, 10.0),
            off(0.0, 10.0),
            off(0.0, 0.0),
        ]);

        assert!(is_closed(&path));

        // Every segment is a lifted quadratic ending at a midpoint.
        let ends: Vec<_> = path
            .elements()
            .iter()
            .filter_map(|el| match el {
                PathEl::CurveTo(_, _, p) => Some(*p),
                _ => None,
            })
            .collect();

        assert!(ends.contains(&kurbo::Point::new(10.0, 5.0)));
        assert!(ends.contains(&kurbo::Point::new(5.0, 10.0)));
        assert!(ends.contains(&kurbo::Point::new(0.0, 5.0)));
    }

    #[test]
    fn every_contour_is_closed() {
        let shapes: &[&[GlyphPoint]] = &[
            &[on(0.0, 0.0), on(1.0, 0.0), on(1.0, 1.0)],
            &[on(0.0, 0.0), off(1.0, 0.0), on(1.0, 1.0), off(0.0, 1.0)],
            &[off(0.0, 0.0), off(2.0, 0.0), off(2.0, 2.0)],
        ];

        for points in shapes {
            let path = contour(points);
            assert!(is_closed(&path), "open contour for {points:?}");
        }
    }
}
