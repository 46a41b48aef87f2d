use crate::geometry::{Point, Rect, Vec2};

/// Uniform scale plus translate mapping source pixels to view pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub translate: Vec2,
}

impl ViewTransform {
    pub fn new(scale: f64, translate: Vec2) -> Self {
        Self { scale, translate }
    }

    pub fn view_to_source(&self, v: Point) -> Point {
        Point::new(
            (v.x - self.translate.x) / self.scale,
            (v.y - self.translate.y) / self.scale,
        )
    }

    pub fn source_to_view(&self, s: Point) -> Point {
        Point::new(
            s.x * self.scale + self.translate.x,
            s.y * self.scale + self.translate.y,
        )
    }

    pub fn view_to_source_rect(&self, r: Rect) -> Rect {
        Rect::from_points(
            self.view_to_source(Point::new(r.x0, r.y0)),
            self.view_to_source(Point::new(r.x1, r.y1)),
        )
    }

    pub fn source_to_view_rect(&self, r: Rect) -> Rect {
        Rect::from_points(
            self.source_to_view(Point::new(r.x0, r.y0)),
            self.source_to_view(Point::new(r.x1, r.y1)),
        )
    }

    /// Source point displayed at the middle of a viewport of the given size.
    pub fn center(&self, view_width: f64, view_height: f64) -> Point {
        self.view_to_source(Point::new(view_width / 2.0, view_height / 2.0))
    }

    /// Translate that puts `source_center` at the middle of the viewport at `scale`.
    pub fn centered_on(source_center: Point, scale: f64, view_width: f64, view_height: f64) -> Self {
        Self {
            scale,
            translate: Vec2::new(
                view_width / 2.0 - source_center.x * scale,
                view_height / 2.0 - source_center.y * scale,
            ),
        }
    }
}
