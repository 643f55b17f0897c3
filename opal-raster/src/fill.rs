//! Coverage-based path filling.

use crate::pixmap::{Pixmap, Rgba};
use kurbo::{flatten, BezPath, PathEl, Point};

/// Flattening tolerance in device pixels.
const TOLERANCE: f64 = 0.1;

/// Vertical subsamples per pixel row when anti-aliasing.
const SAMPLES: usize = 4;

/// The rule deciding which points of a self-overlapping path are inside.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FillRule {
    /// Non-zero winding number.
    NonZero,
    /// Even-odd crossing parity.
    EvenOdd,
}

/// A coverage mask over a full canvas, used for clipping.
#[derive(Debug, Clone)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Mask {
    /// A mask with full coverage everywhere.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![1.0; width as usize * height as usize],
        }
    }

    /// The coverage at `(x, y)`, zero outside the mask.
    #[inline]
    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }

        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Intersect with another mask by multiplying coverages.
    pub fn intersect(&mut self, other: &Mask) {
        debug_assert_eq!(self.width, other.width);
        debug_assert_eq!(self.height, other.height);

        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a *= *b;
        }
    }
}

/// An edge of the flattened path. Stored with `y0 < y1`; `dir` keeps the
/// original orientation for winding computation.
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    dir: i32,
}

impl Edge {
    fn new(from: Point, to: Point) -> Option<Edge> {
        if from.y == to.y {
            // Horizontal edges never cross a scanline.
            return None;
        }

        if from.y < to.y {
            Some(Edge {
                x0: from.x,
                y0: from.y,
                x1: to.x,
                y1: to.y,
                dir: 1,
            })
        } else {
            Some(Edge {
                x0: to.x,
                y0: to.y,
                x1: from.x,
                y1: from.y,
                dir: -1,
            })
        }
    }

    /// The x coordinate where the edge crosses the horizontal line at `y`,
    /// if it does. The bottom endpoint is exclusive so that shared
    /// vertices are not counted twice.
    #[inline]
    fn crossing(&self, y: f64) -> Option<f64> {
        if y < self.y0 || y >= self.y1 {
            return None;
        }

        let t = (y - self.y0) / (self.y1 - self.y0);

        Some(self.x0 + t * (self.x1 - self.x0))
    }
}

/// Flatten a path into edges, implicitly closing every subpath (a fill
/// treats open subpaths as closed).
fn collect_edges(path: &BezPath) -> Vec<Edge> {
    let mut edges = vec![];
    let mut start = Point::ZERO;
    let mut current = Point::ZERO;

    flatten(path.elements().iter().copied(), TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            if current != start {
                edges.extend(Edge::new(current, start));
            }

            start = p;
            current = p;
        }
        PathEl::LineTo(p) => {
            edges.extend(Edge::new(current, p));
            current = p;
        }
        PathEl::ClosePath => {
            edges.extend(Edge::new(current, start));
            current = start;
        }
        // `flatten` only emits moves, lines and closes.
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });

    if current != start {
        edges.extend(Edge::new(current, start));
    }

    edges
}

/// Evaluate per-pixel coverage of the path row by row.
///
/// Coverage is exact in x (fractional span ends) and supersampled in y.
/// The callback receives each touched row index together with that row's
/// coverage values.
fn scan(
    edges: &[Edge],
    width: u32,
    height: u32,
    rule: FillRule,
    samples: usize,
    mut row_cb: impl FnMut(u32, &[f32]),
) {
    if width == 0 || height == 0 || edges.is_empty() {
        return;
    }

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for e in edges {
        y_min = y_min.min(e.y0);
        y_max = y_max.max(e.y1);
    }

    let row_start = (y_min.floor().max(0.0)) as u32;
    let row_end = (y_max.ceil().min(f64::from(height))) as u32;

    let mut row = vec![0f32; width as usize];
    let mut crossings: Vec<(f64, i32)> = vec![];
    let sample_weight = 1.0 / samples as f32;

    for y in row_start..row_end {
        row.iter_mut().for_each(|c| *c = 0.0);
        let mut touched = false;

        for s in 0..samples {
            let sy = f64::from(y) + (s as f64 + 0.5) / samples as f64;

            crossings.clear();
            for e in edges {
                if let Some(x) = e.crossing(sy) {
                    crossings.push((x, e.dir));
                }
            }

            if crossings.is_empty() {
                continue;
            }

            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            // Walk the crossings, opening a span whenever the rule says
            // "inside" and closing it when it says "outside" again.
            let mut winding = 0i32;
            let mut span_start = 0f64;

            for (x, dir) in crossings.iter().copied() {
                let was_inside = inside(winding, rule);

                winding += dir;

                let is_inside = inside(winding, rule);

                if !was_inside && is_inside {
                    span_start = x;
                } else if was_inside && !is_inside {
                    touched |= add_span(&mut row, span_start, x, sample_weight, width);
                }
            }
        }

        if touched {
            row_cb(y, &row);
        }
    }
}

#[inline]
fn inside(winding: i32, rule: FillRule) -> bool {
    match rule {
        FillRule::NonZero => winding != 0,
        FillRule::EvenOdd => winding % 2 != 0,
    }
}

/// Accumulate the coverage of the horizontal span `[xa, xb)` into a row,
/// with exact fractions at the ends.
fn add_span(row: &mut [f32], xa: f64, xb: f64, weight: f32, width: u32) -> bool {
    let xa = xa.max(0.0);
    let xb = xb.min(f64::from(width));

    if xa >= xb {
        return false;
    }

    let first = xa.floor() as usize;
    let last = (xb.ceil() as usize).min(row.len()) - 1;

    if first == last {
        row[first] += (xb - xa) as f32 * weight;

        return true;
    }

    // Partial first pixel.
    row[first] += ((first + 1) as f64 - xa) as f32 * weight;

    // Full middle pixels.
    for c in &mut row[first + 1..last] {
        *c += weight;
    }

    // Partial last pixel.
    row[last] += (xb - last as f64) as f32 * weight;

    true
}

/// Fill `path` (already in device coordinates) into the pixmap.
pub fn fill_path(
    pix: &mut Pixmap,
    path: &BezPath,
    color: Rgba,
    rule: FillRule,
    anti_alias: bool,
    clip: Option<&Mask>,
) {
    let edges = collect_edges(path);
    let samples = if anti_alias { SAMPLES } else { 1 };
    let width = pix.width();

    scan(&edges, width, pix.height(), rule, samples, |y, row| {
        for (x, cov) in row.iter().enumerate() {
            let mut cov = cov.min(1.0);

            if cov <= 0.0 {
                continue;
            }

            if !anti_alias {
                cov = if cov >= 0.5 { 1.0 } else { 0.0 };
            }

            if let Some(mask) = clip {
                cov *= mask.coverage(x as u32, y);
            }

            pix.blend_pixel(x as u32, y, color, cov);
        }
    });
}

/// Rasterize `path` into a coverage mask of the given dimensions.
pub fn make_mask(
    path: &BezPath,
    width: u32,
    height: u32,
    rule: FillRule,
    anti_alias: bool,
) -> Mask {
    let edges = collect_edges(path);
    let samples = if anti_alias { SAMPLES } else { 1 };

    let mut mask = Mask {
        width,
        height,
        data: vec![0.0; width as usize * height as usize],
    };

    scan(&edges, width, height, rule, samples, |y, row| {
        let base = y as usize * width as usize;

        for (x, cov) in row.iter().enumerate() {
            mask.data[base + x] = cov.min(1.0);
        }
    });

    mask
}

#[cfg(test)]
mod tests {
    use crate::fill::{fill_path, make_mask, FillRule, Mask};
    use crate::pixmap::{Pixmap, Rgba};
    use kurbo::BezPath;

    fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64, clockwise: bool) -> BezPath {
        let mut p = BezPath::new();
        p.move_to((x0, y0));

        if clockwise {
            p.line_to((x1, y0));
            p.line_to((x1, y1));
            p.line_to((x0, y1));
        } else {
            p.line_to((x0, y1));
            p.line_to((x1, y1));
            p.line_to((x1, y0));
        }

        p.close_path();
        p
    }

    #[test]
    fn simple_rect_fill() {
        let mut pix = Pixmap::new(10, 10);
        pix.clear(Rgba::WHITE);

        fill_path(
            &mut pix,
            &rect_path(2.0, 2.0, 8.0, 8.0, true),
            Rgba::BLACK,
            FillRule::NonZero,
            true,
            None,
        );

        // Interior black, exterior white.
        assert_eq!(pix.pixel(5, 5), Rgba::BLACK);
        assert_eq!(pix.pixel(0, 0), Rgba::WHITE);
        assert_eq!(pix.pixel(9, 9), Rgba::WHITE);
    }

    #[test]
    fn fractional_coverage_at_edges() {
        let mut pix = Pixmap::new(4, 4);
        pix.clear(Rgba::WHITE);

        // A rect covering half of column 1.
        fill_path(
            &mut pix,
            &rect_path(1.5, 0.0, 4.0, 4.0, true),
            Rgba::BLACK,
            FillRule::NonZero,
            true,
            None,
        );

        let px = pix.pixel(1, 2);
        assert!((px.r - 0.5).abs() < 0.05, "got {px:?}");
        assert_eq!(pix.pixel(2, 2), Rgba::BLACK);
        assert_eq!(pix.pixel(0, 2), Rgba::WHITE);
    }

    /// An outer square with a smaller same-orientation inner square: the
    /// even-odd rule leaves the inner square unfilled, non-zero fills it.
    #[test]
    fn fill_rules_on_nested_squares() {
        let mut outer = rect_path(0.0, 0.0, 10.0, 10.0, true);
        let inner = rect_path(3.0, 3.0, 7.0, 7.0, true);
        outer.extend(inner.elements().iter().copied());

        let mut even_odd = Pixmap::new(10, 10);
        even_odd.clear(Rgba::WHITE);
        fill_path(&mut even_odd, &outer, Rgba::BLACK, FillRule::EvenOdd, true, None);

        assert_eq!(even_odd.pixel(5, 5), Rgba::WHITE);
        assert_eq!(even_odd.pixel(1, 1), Rgba::BLACK);

        let mut non_zero = Pixmap::new(10, 10);
        non_zero.clear(Rgba::WHITE);
        fill_path(&mut non_zero, &outer, Rgba::BLACK, FillRule::NonZero, true, None);

        assert_eq!(non_zero.pixel(5, 5), Rgba::BLACK);
        assert_eq!(non_zero.pixel(1, 1), Rgba::BLACK);
    }

    /// With the inner square reversed, both rules agree on the annulus.
    #[test]
    fn non_zero_respects_orientation() {
        let mut ring = rect_path(0.0, 0.0, 10.0, 10.0, true);
        ring.extend(rect_path(3.0, 3.0, 7.0, 7.0, false).iter());

        let mut pix = Pixmap::new(10, 10);
        pix.clear(Rgba::WHITE);
        fill_path(&mut pix, &ring, Rgba::BLACK, FillRule::NonZero, true, None);

        assert_eq!(pix.pixel(5, 5), Rgba::WHITE);
        assert_eq!(pix.pixel(1, 1), Rgba::BLACK);
    }

    #[test]
    fn open_subpath_closed_implicitly() {
        let mut p = BezPath::new();
        p.move_to((0.0, 0.0));
        p.line_to((8.0, 0.0));
        p.line_to((8.0, 8.0));
        p.line_to((0.0, 8.0));
        // No close.

        let mut pix = Pixmap::new(8, 8);
        pix.clear(Rgba::WHITE);
        fill_path(&mut pix, &p, Rgba::BLACK, FillRule::NonZero, true, None);

        assert_eq!(pix.pixel(4, 4), Rgba::BLACK);
    }

    #[test]
    fn clip_mask_limits_fill() {
        let clip = make_mask(
            &rect_path(0.0, 0.0, 5.0, 10.0, true),
            10,
            10,
            FillRule::NonZero,
            true,
        );

        let mut pix = Pixmap::new(10, 10);
        pix.clear(Rgba::WHITE);
        fill_path(
            &mut pix,
            &rect_path(0.0, 0.0, 10.0, 10.0, true),
            Rgba::BLACK,
            FillRule::NonZero,
            true,
            Some(&clip),
        );

        assert_eq!(pix.pixel(2, 5), Rgba::BLACK);
        assert_eq!(pix.pixel(8, 5), Rgba::WHITE);
    }

    #[test]
    fn mask_intersection() {
        let mut a = Mask::full(4, 4);
        let b = make_mask(
            &rect_path(0.0, 0.0, 2.0, 4.0, true),
            4,
            4,
            FillRule::NonZero,
            true,
        );

        a.intersect(&b);

        assert_eq!(a.coverage(1, 1), 1.0);
        assert_eq!(a.coverage(3, 1), 0.0);
    }

    #[test]
    fn curves_are_flattened() {
        let mut p = BezPath::new();
        p.move_to((5.0, 0.0));
        p.curve_to((10.0, 0.0), (10.0, 10.0), (5.0, 10.0));
        p.curve_to((0.0, 10.0), (0.0, 0.0), (5.0, 0.0));
        p.close_path();

        let mut pix = Pixmap::new(10, 10);
        pix.clear(Rgba::WHITE);
        fill_path(&mut pix, &p, Rgba::BLACK, FillRule::NonZero, true, None);

        assert_eq!(pix.pixel(5, 5), Rgba::BLACK);
        assert_eq!(pix.pixel(0, 0), Rgba::WHITE);
    }
}
