//! Integer source-space rectangles and the float helpers shared by the
//! viewport math. Points, offsets and float rects are `kurbo` types.

pub use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Rectangle in source pixels, right/bottom exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl SourceRect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.left as f64,
            self.top as f64,
            self.right as f64,
            self.bottom as f64,
        )
    }

    /// Overlap test with touching edges counted as overlap.
    pub fn touches(&self, other: &Rect) -> bool {
        rects_touch(&self.to_rect(), other)
    }
}

/// Closed-interval overlap test between two float rects.
pub fn rects_touch(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_edges_count_as_overlap() {
        let tile = SourceRect::new(0, 0, 100, 100);
        assert!(tile.touches(&Rect::new(100.0, 0.0, 200.0, 50.0)));
        assert!(!tile.touches(&Rect::new(100.5, 0.0, 200.0, 50.0)));
    }

    #[test]
    fn test_dimensions() {
        let r = SourceRect::new(10, 20, 110, 70);
        assert_eq!(r.width(), 100);
        assert_eq!(r.height(), 50);
        assert_eq!(r.area(), 5000);
    }
}
