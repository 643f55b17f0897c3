//! Stroke-to-fill expansion.

use kurbo::{flatten, BezPath, Cap, Join, PathEl, Point, Vec2};

/// Flattening tolerance for stroked curves, in device pixels.
const TOLERANCE: f64 = 0.1;

/// Segments per half-circle when approximating round caps and joins.
const ARC_STEPS: usize = 16;

/// Everything needed to expand a stroke, in device units.
#[derive(Debug, Clone)]
pub struct StrokeStyle {
    /// The line width.
    pub width: f64,
    /// The cap style for open ends.
    pub cap: Cap,
    /// The join style between segments.
    pub join: Join,
    /// Miter joins longer than `miter_limit · width/2` fall back to bevel.
    pub miter_limit: f64,
    /// The dash pattern; empty means solid.
    pub dash_array: Vec<f64>,
    /// The phase into the dash pattern.
    pub dash_offset: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: Cap::Butt,
            join: Join::Miter,
            miter_limit: 10.0,
            dash_array: vec![],
            dash_offset: 0.0,
        }
    }
}

/// A flattened subpath.
struct Polyline {
    points: Vec<Point>,
    closed: bool,
}

/// Expand `path` into an outline that, filled with the non-zero rule,
/// produces the stroke.
pub fn expand_stroke(path: &BezPath, style: &StrokeStyle) -> BezPath {
    let half = (style.width / 2.0).max(f64::EPSILON);

    let mut polylines = flatten_path(path);

    if !style.dash_array.is_empty() && style.dash_array.iter().any(|d| *d > 0.0) {
        polylines = apply_dashes(polylines, &style.dash_array, style.dash_offset);
    }

    let mut outline = BezPath::new();

    for polyline in &polylines {
        expand_polyline(polyline, half, style, &mut outline);
    }

    outline
}

fn flatten_path(path: &BezPath) -> Vec<Polyline> {
    let mut polylines: Vec<Polyline> = vec![];
    let mut current: Vec<Point> = vec![];

    flatten(path.elements().iter().copied(), TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            if current.len() > 1 {
                polylines.push(Polyline {
                    points: std::mem::take(&mut current),
                    closed: false,
                });
            } else {
                current.clear();
            }

            current.push(p);
        }
        PathEl::LineTo(p) => current.push(p),
        PathEl::ClosePath => {
            if current.len() > 1 {
                let points = std::mem::take(&mut current);
                let start = points[0];

                polylines.push(Polyline {
                    points,
                    closed: true,
                });

                // A new subpath without an explicit move continues at the
                // start of the closed one.
                current.push(start);
            }
        }
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });

    if current.len() > 1 {
        polylines.push(Polyline {
            points: current,
            closed: false,
        });
    }

    for polyline in &mut polylines {
        dedup_points(polyline);
    }

    polylines.retain(|p| p.points.len() > 1);
    polylines
}

/// Drop zero-length segments.
fn dedup_points(polyline: &mut Polyline) {
    polyline.points.dedup_by(|a, b| (*a - *b).hypot() < 1e-12);

    if polyline.closed && polyline.points.len() > 1 {
        let first = polyline.points[0];
        let last = *polyline.points.last().unwrap();

        if (first - last).hypot() < 1e-12 {
            polyline.points.pop();
        }
    }
}

fn expand_polyline(polyline: &Polyline, half: f64, style: &StrokeStyle, out: &mut BezPath) {
    let pts = &polyline.points;

    if pts.len() < 2 {
        return;
    }

    if polyline.closed {
        // A closed stroke is two rings: the outer offset ring and the
        // reversed inner offset ring.
        let outer = offset_ring(pts, half, style);
        push_ring(out, &outer);

        let reversed: Vec<Point> = pts.iter().rev().copied().collect();
        let inner = offset_ring(&reversed, half, style);
        push_ring(out, &inner);
    } else {
        let mut points = offset_side(pts, half, style);

        // End cap.
        let last_dir = direction(pts[pts.len() - 2], pts[pts.len() - 1]);
        add_cap(
            &mut points,
            pts[pts.len() - 1],
            half,
            last_dir,
            style.cap,
        );

        // Right side, walked backwards.
        let reversed: Vec<Point> = pts.iter().rev().copied().collect();
        points.extend(offset_side(&reversed, half, style));

        // Start cap.
        let first_dir = direction(pts[1], pts[0]);
        add_cap(&mut points, pts[0], half, first_dir, style.cap);

        push_ring(out, &points);
    }
}

/// Offset points for one side of an open polyline, with joins at interior
/// vertices.
fn offset_side(pts: &[Point], half: f64, style: &StrokeStyle) -> Vec<Point> {
    let mut out = vec![];

    let first_normal = normal(pts[0], pts[1]);
    out.push(pts[0] + first_normal * half);

    for i in 1..pts.len() - 1 {
        let n_in = normal(pts[i - 1], pts[i]);
        let n_out = normal(pts[i], pts[i + 1]);

        add_join(&mut out, pts[i], n_in, n_out, half, style);
    }

    let last_normal = normal(pts[pts.len() - 2], pts[pts.len() - 1]);
    out.push(pts[pts.len() - 1] + last_normal * half);

    out
}

/// Offset ring for one side of a closed polyline, with a join at every
/// vertex including the closing one.
fn offset_ring(pts: &[Point], half: f64, style: &StrokeStyle) -> Vec<Point> {
    let n = pts.len();
    let mut out = vec![];

    for i in 0..n {
        let prev = pts[(i + n - 1) % n];
        let next = pts[(i + 1) % n];

        let n_in = normal(prev, pts[i]);
        let n_out = normal(pts[i], next);

        add_join(&mut out, pts[i], n_in, n_out, half, style);
    }

    out
}

fn add_join(out: &mut Vec<Point>, center: Point, n_in: Vec2, n_out: Vec2, half: f64, style: &StrokeStyle) {
    let from = center + n_in * half;
    let to = center + n_out * half;

    out.push(from);

    let cross = n_in.cross(n_out);

    if cross.abs() > 1e-9 {
        match style.join {
            Join::Bevel => {}
            Join::Miter => {
                // Intersection of the two offset lines; the directions are
                // the tangents, i.e. the normals rotated back.
                let d_in = Vec2::new(-n_in.y, n_in.x);
                let d_out = Vec2::new(-n_out.y, n_out.x);

                if let Some(ip) = line_intersection(from, d_in, to, d_out) {
                    if (ip - center).hypot() <= style.miter_limit * half {
                        out.push(ip);
                    }
                }
            }
            Join::Round => {
                arc_points(out, center, from, to, half);
            }
        }
    }

    out.push(to);
}

fn add_cap(out: &mut Vec<Point>, end: Point, half: f64, dir: Vec2, cap: Cap) {
    // The left-hand normal of the outgoing direction. The outline arrives
    // at `end + n·half` and must leave at `end - n·half`; the cap bridges
    // the two, bulging along `dir`.
    let n = Vec2::new(dir.y, -dir.x);

    match cap {
        // Butt caps need no extra points; the outline connects the two
        // sides with a straight segment.
        Cap::Butt => {}
        Cap::Square => {
            out.push(end + (n + dir) * half);
            out.push(end + (dir - n) * half);
        }
        Cap::Round => {
            // Sweep the half-circle from `n` through `dir` to `-n` so the
            // arc always lies on the outward side.
            for i in 1..ARC_STEPS {
                let theta = std::f64::consts::PI * i as f64 / ARC_STEPS as f64;

                out.push(end + (n * theta.cos() + dir * theta.sin()) * half);
            }
        }
    }
}

/// Append intermediate points of the circular arc from `from` to `to`
/// around `center`, taking the short way round.
fn arc_points(out: &mut Vec<Point>, center: Point, from: Point, to: Point, radius: f64) {
    let a0 = (from - center).atan2();
    let a1 = (to - center).atan2();

    let mut sweep = a1 - a0;
    while sweep > std::f64::consts::PI {
        sweep -= 2.0 * std::f64::consts::PI;
    }
    while sweep < -std::f64::consts::PI {
        sweep += 2.0 * std::f64::consts::PI;
    }

    let steps = ((sweep.abs() / std::f64::consts::PI) * ARC_STEPS as f64).ceil() as usize;

    for i in 1..steps {
        let a = a0 + sweep * (i as f64 / steps as f64);

        out.push(center + Vec2::new(a.cos(), a.sin()) * radius);
    }
}

fn line_intersection(p1: Point, d1: Vec2, p2: Point, d2: Vec2) -> Option<Point> {
    let denom = d1.cross(d2);

    if denom.abs() < 1e-12 {
        return None;
    }

    let t = (p2 - p1).cross(d2) / denom;

    Some(p1 + d1 * t)
}

#[inline]
fn direction(from: Point, to: Point) -> Vec2 {
    let d = to - from;
    let len = d.hypot();

    if len == 0.0 {
        Vec2::new(1.0, 0.0)
    } else {
        d / len
    }
}

/// The left-hand unit normal of the segment.
#[inline]
fn normal(from: Point, to: Point) -> Vec2 {
    let d = direction(from, to);

    Vec2::new(d.y, -d.x)
}

fn push_ring(out: &mut BezPath, points: &[Point]) {
    if points.len() < 3 {
        return;
    }

    out.move_to(points[0]);

    for p in &points[1..] {
        out.line_to(*p);
    }

    out.close_path();
}

/// Split polylines into dashed pieces according to the dash pattern.
fn apply_dashes(polylines: Vec<Polyline>, pattern: &[f64], offset: f64) -> Vec<Polyline> {
    let pattern: Vec<f64> = pattern.iter().copied().filter(|d| *d >= 0.0).collect();
    let total: f64 = pattern.iter().sum();

    if pattern.is_empty() || total <= 0.0 {
        return polylines;
    }

    let mut out = vec![];

    for polyline in polylines {
        let mut points = polyline.points;

        // A closed subpath dashes like an open one that returns to its
        // start.
        if polyline.closed {
            let first = points[0];
            points.push(first);
        }

        // Position within the pattern.
        let mut remaining_offset = offset.rem_euclid(total);
        let mut idx = 0usize;
        let mut on = true;

        while remaining_offset >= pattern[idx] {
            remaining_offset -= pattern[idx];
            idx = (idx + 1) % pattern.len();
            on = !on;
        }

        let mut remaining = pattern[idx] - remaining_offset;
        let mut current: Vec<Point> = if on { vec![points[0]] } else { vec![] };

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let mut seg_len = (b - a).hypot();
            let mut pos = a;

            while seg_len > remaining {
                let dir = direction(pos, b);
                let cut = pos + dir * remaining;
                seg_len -= remaining;

                if on {
                    current.push(cut);
                    out.push(Polyline {
                        points: std::mem::take(&mut current),
                        closed: false,
                    });
                } else {
                    current = vec![cut];
                }

                on = !on;
                idx = (idx + 1) % pattern.len();
                remaining = pattern[idx];
                pos = cut;
            }

            remaining -= seg_len;

            if on {
                current.push(b);
            }
        }

        if current.len() > 1 {
            out.push(Polyline {
                points: current,
                closed: false,
            });
        }
    }

    out.retain(|p| p.points.len() > 1);
    out
}

#[cfg(test)]
mod tests {
    use crate::fill::{fill_path, FillRule};
    use crate::pixmap::{Pixmap, Rgba};
    use crate::stroke::{expand_stroke, StrokeStyle};
    use kurbo::{BezPath, Cap, Join};

    fn stroke_and_fill(path: &BezPath, style: &StrokeStyle, size: u32) -> Pixmap {
        let outline = expand_stroke(path, style);

        let mut pix = Pixmap::new(size, size);
        pix.clear(Rgba::WHITE);
        fill_path(
            &mut pix,
            &outline,
            Rgba::BLACK,
            FillRule::NonZero,
            true,
            None,
        );

        pix
    }

    #[test]
    fn horizontal_line() {
        let mut path = BezPath::new();
        path.move_to((2.0, 10.0));
        path.line_to((18.0, 10.0));

        let style = StrokeStyle {
            width: 4.0,
            ..Default::default()
        };

        let pix = stroke_and_fill(&path, &style, 20);

        // On the line: black. Off the stroke band: white.
        assert_eq!(pix.pixel(10, 10), Rgba::BLACK);
        assert_eq!(pix.pixel(10, 9), Rgba::BLACK);
        assert_eq!(pix.pixel(10, 5), Rgba::WHITE);
        assert_eq!(pix.pixel(10, 15), Rgba::WHITE);
        // Butt cap: nothing before the start.
        assert_eq!(pix.pixel(0, 10), Rgba::WHITE);
    }

    #[test]
    fn square_cap_extends() {
        let mut path = BezPath::new();
        path.move_to((5.0, 10.0));
        path.line_to((15.0, 10.0));

        let style = StrokeStyle {
            width: 4.0,
            cap: Cap::Square,
            ..Default::default()
        };

        let pix = stroke_and_fill(&path, &style, 20);

        // Extended by half the width beyond both endpoints.
        assert_eq!(pix.pixel(3, 10), Rgba::BLACK);
        assert_eq!(pix.pixel(16, 10), Rgba::BLACK);
        assert_eq!(pix.pixel(1, 10), Rgba::WHITE);
    }

    #[test]
    fn round_cap_extends() {
        let mut path = BezPath::new();
        path.move_to((5.0, 10.0));
        path.line_to((15.0, 10.0));

        let style = StrokeStyle {
            width: 6.0,
            cap: Cap::Round,
            ..Default::default()
        };

        let pix = stroke_and_fill(&path, &style, 20);

        // Just beyond the endpoint along the axis: inside the round cap.
        assert_eq!(pix.pixel(3, 10), Rgba::BLACK);
        // Beyond the cap radius: untouched.
        assert_eq!(pix.pixel(1, 10), Rgba::WHITE);
        // The cap corner that only a square cap would cover.
        assert_eq!(pix.pixel(1, 7), Rgba::WHITE);
    }

    #[test]
    fn miter_corner_is_sharp() {
        let mut path = BezPath::new();
        path.move_to((2.0, 18.0));
        path.line_to((10.0, 10.0));
        path.line_to((18.0, 18.0));

        let style = StrokeStyle {
            width: 4.0,
            join: Join::Miter,
            ..Default::default()
        };

        let pix = stroke_and_fill(&path, &style, 20);

        // The miter tip sticks out above the joint vertex; the pixel is
        // mostly covered (the tip is pointed, so not fully).
        assert!(pix.pixel(10, 8).r < 0.4, "got {:?}", pix.pixel(10, 8));
    }

    #[test]
    fn closed_rect_stroke_leaves_hole() {
        let mut path = BezPath::new();
        path.move_to((5.0, 5.0));
        path.line_to((15.0, 5.0));
        path.line_to((15.0, 15.0));
        path.line_to((5.0, 15.0));
        path.close_path();

        let style = StrokeStyle {
            width: 2.0,
            ..Default::default()
        };

        let pix = stroke_and_fill(&path, &style, 20);

        // The border is painted, the middle stays empty.
        assert_eq!(pix.pixel(10, 5), Rgba::BLACK);
        assert_eq!(pix.pixel(5, 10), Rgba::BLACK);
        assert_eq!(pix.pixel(10, 10), Rgba::WHITE);
        assert_eq!(pix.pixel(2, 2), Rgba::WHITE);
    }

    #[test]
    fn dashes_produce_gaps() {
        let mut path = BezPath::new();
        path.move_to((0.0, 10.0));
        path.line_to((20.0, 10.0));

        let style = StrokeStyle {
            width: 2.0,
            dash_array: vec![4.0, 4.0],
            ..Default::default()
        };

        let pix = stroke_and_fill(&path, &style, 20);

        // First dash covers x in [0, 4), first gap [4, 8).
        assert_eq!(pix.pixel(2, 10), Rgba::BLACK);
        assert_eq!(pix.pixel(6, 10), Rgba::WHITE);
        assert_eq!(pix.pixel(10, 10), Rgba::BLACK);
    }

    #[test]
    fn zero_length_segments_dropped() {
        let mut path = BezPath::new();
        path.move_to((5.0, 5.0));
        path.line_to((5.0, 5.0));
        path.line_to((15.0, 5.0));

        let style = StrokeStyle {
            width: 2.0,
            ..Default::default()
        };

        // Must not panic or produce NaN geometry.
        let pix = stroke_and_fill(&path, &style, 20);
        assert_eq!(pix.pixel(10, 5), Rgba::BLACK);
    }
}
