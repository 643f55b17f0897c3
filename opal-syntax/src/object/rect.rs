//! Rectangles.

use crate::object::{Array, Object};
use crate::reader::{Readable, Reader, ReaderContext, ReaderExt};

/// A rectangle, given as a four-number array `[x0 y0 x1 y1]`.
///
/// The corners are normalized so that `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    /// The smaller x coordinate.
    pub x0: f64,
    /// The smaller y coordinate.
    pub y0: f64,
    /// The larger x coordinate.
    pub x1: f64,
    /// The larger y coordinate.
    pub y1: f64,
}

impl Rect {
    /// Create a rectangle from two corner points.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// The width of the rectangle.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// The height of the rectangle.
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    fn from_array(arr: &Array<'_>) -> Option<Self> {
        let nums = arr.iter::<f64>().take(4).collect::<Vec<_>>();

        if nums.len() != 4 {
            return None;
        }

        Some(Rect::new(nums[0], nums[1], nums[2], nums[3]))
    }
}

impl<'a> TryFrom<Object<'a>> for Rect {
    type Error = ();

    fn try_from(value: Object<'a>) -> Result<Self, ()> {
        let arr: Array = value.try_into()?;
        Rect::from_array(&arr).ok_or(())
    }
}

impl<'a> Readable<'a> for Rect {
    fn read(r: &mut Reader<'a>, ctx: &ReaderContext<'a>) -> Option<Self> {
        let arr = r.read::<Array>(ctx)?;
        Rect::from_array(&arr)
    }
}

impl<'a> crate::object::ObjectLike<'a> for Rect {}

#[cfg(test)]
mod tests {
    use crate::object::Rect;
    use crate::reader::Readable;

    #[test]
    fn rect_1() {
        let rect = Rect::from_bytes(b"[0 0 612 792]").unwrap();
        assert_eq!(rect.width(), 612.0);
        assert_eq!(rect.height(), 792.0);
    }

    #[test]
    fn rect_unordered_corners() {
        let rect = Rect::from_bytes(b"[612 792 0 0]").unwrap();
        assert_eq!(rect.x0, 0.0);
        assert_eq!(rect.y1, 792.0);
    }

    #[test]
    fn rect_too_short() {
        assert!(Rect::from_bytes(b"[0 0 612]").is_none());
    }
}
