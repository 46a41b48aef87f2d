//! Scale and translate limits for the live viewport and animation endpoints.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubscaleError};
use crate::geometry::{Point, Rect, Size, Vec2};
use crate::transform::ViewTransform;

/// How far the image may be panned relative to the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanLimit {
    /// The image edge never enters the viewport once the image fills it.
    #[default]
    Inside,
    /// The image may be panned until it just leaves the viewport.
    Outside,
    /// Any image point may be panned to the viewport center.
    Center,
}

impl TryFrom<i32> for PanLimit {
    type Error = SubscaleError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(PanLimit::Inside),
            2 => Ok(PanLimit::Outside),
            3 => Ok(PanLimit::Center),
            other => Err(SubscaleError::InvalidPanLimit(other)),
        }
    }
}

/// Inputs of the clamp: viewport and displayed source sizes plus the limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitBounds {
    pub view: Size,
    pub source: Size,
    pub max_scale: f64,
    pub min_scale_override: Option<f64>,
    pub pan_limit: PanLimit,
}

impl FitBounds {
    /// Scale at which the whole image just fits the viewport.
    pub fn min_scale(&self) -> f64 {
        match self.min_scale_override {
            Some(min) if min > 0.0 => min,
            _ => (self.view.width / self.source.width).min(self.view.height / self.source.height),
        }
    }

    pub fn limited_scale(&self, target: f64) -> f64 {
        target.max(self.min_scale()).min(self.max_scale)
    }

    /// Clamp `transform` into bounds. `center` keeps an image smaller than
    /// the viewport centered instead of merely inside it.
    pub fn fit(&self, transform: ViewTransform, center: bool) -> ViewTransform {
        let center = center && self.pan_limit != PanLimit::Outside;
        let scale = self.limited_scale(transform.scale);
        let scaled = Size::new(self.source.width * scale, self.source.height * scale);
        let (vw, vh) = (self.view.width, self.view.height);
        let mut t = transform.translate;

        match self.pan_limit {
            PanLimit::Center => {
                t.x = t.x.max(vw / 2.0 - scaled.width);
                t.y = t.y.max(vh / 2.0 - scaled.height);
            }
            _ if center => {
                t.x = t.x.max(vw - scaled.width);
                t.y = t.y.max(vh - scaled.height);
            }
            PanLimit::Inside => {
                t.x = t.x.max((vw - scaled.width).min(0.0));
                t.y = t.y.max((vh - scaled.height).min(0.0));
            }
            PanLimit::Outside => {
                t.x = t.x.max(-scaled.width);
                t.y = t.y.max(-scaled.height);
            }
        }

        let (max_x, max_y) = match self.pan_limit {
            PanLimit::Center => ((vw / 2.0).max(0.0), (vh / 2.0).max(0.0)),
            _ if center => (
                ((vw - scaled.width) / 2.0).max(0.0),
                ((vh - scaled.height) / 2.0).max(0.0),
            ),
            // The image stays within the viewport, or covers it when larger.
            PanLimit::Inside => ((vw - scaled.width).max(0.0), (vh - scaled.height).max(0.0)),
            PanLimit::Outside => (vw.max(0.0), vh.max(0.0)),
        };
        t.x = t.x.min(max_x);
        t.y = t.y.min(max_y);

        ViewTransform::new(scale, t)
    }

    /// Transform displaying `source_center` as close to the viewport center
    /// as the limits allow.
    pub fn transform_for_center(&self, source_center: Point, scale: f64) -> ViewTransform {
        let wanted = ViewTransform::centered_on(source_center, scale, self.view.width, self.view.height);
        self.fit(wanted, true)
    }

    /// Nearest reachable center for `source_center` at `scale`.
    pub fn limited_center(&self, source_center: Point, scale: f64) -> Point {
        self.transform_for_center(source_center, scale)
            .center(self.view.width, self.view.height)
    }

    /// Image center, used whenever panning is disabled.
    pub fn source_center(&self) -> Point {
        Point::new(self.source.width / 2.0, self.source.height / 2.0)
    }

    pub fn view_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.view)
    }

    pub fn view_center(&self) -> Point {
        Point::new(self.view.width / 2.0, self.view.height / 2.0)
    }
}

/// Scale and center waiting to be applied on the next tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingView {
    pub scale: f64,
    pub center: Point,
}

/// Live viewport. `transform` stays `None` until the image geometry is known.
#[derive(Clone, Debug, Default)]
pub struct ViewportState {
    pub transform: Option<ViewTransform>,
    /// Center requested while panning is disabled.
    pub requested_center: Option<Point>,
    pub pending: Option<PendingView>,
}

impl ViewportState {
    pub fn scale(&self) -> Option<f64> {
        self.transform.map(|t| t.scale)
    }

    pub fn translate(&self) -> Option<Vec2> {
        self.transform.map(|t| t.translate)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
