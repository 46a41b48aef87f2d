//! Single-slot scale/center animation with quadratic easing.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_ANIMATION_DURATION_MS;
use crate::error::{Result, SubscaleError};
use crate::events::ChangeOrigin;
use crate::geometry::{Point, Vec2};
use crate::transform::ViewTransform;
use crate::viewport::FitBounds;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    OutQuad,
    #[default]
    InOutQuad,
}

impl Easing {
    /// Value at `elapsed` of a transition from `from` by `change` lasting `duration`.
    pub fn ease(self, elapsed: f64, from: f64, change: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return from + change;
        }
        match self {
            Easing::OutQuad => {
                let p = elapsed / duration;
                -change * p * (p - 2.0) + from
            }
            Easing::InOutQuad => {
                let mut t = elapsed / (duration / 2.0);
                if t < 1.0 {
                    change / 2.0 * t * t + from
                } else {
                    t -= 1.0;
                    -change / 2.0 * (t * (t - 2.0) - 1.0) + from
                }
            }
        }
    }
}

impl TryFrom<i32> for Easing {
    type Error = SubscaleError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Easing::OutQuad),
            2 => Ok(Easing::InOutQuad),
            other => Err(SubscaleError::InvalidEasing(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationConfig {
    pub duration: Duration,
    pub easing: Easing,
    /// Touch input cancels the animation instead of being ignored.
    pub interruptible: bool,
    /// Clamp the target center into pan limits before starting.
    pub pan_limited: bool,
    pub origin: ChangeOrigin,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(DEFAULT_ANIMATION_DURATION_MS),
            easing: Easing::default(),
            interruptible: true,
            pan_limited: true,
            origin: ChangeOrigin::Animation,
        }
    }
}

/// Where an animation is heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationTarget {
    pub scale: f64,
    pub center: Point,
    /// View point that should stay over `center` while zooming.
    pub focus: Option<Point>,
}

/// One in-flight animation.
///
/// Each frame places `center_end` under a view point interpolated from
/// `focus_start` to `focus_end` while the scale is interpolated.
#[derive(Clone, Debug)]
pub struct Animation {
    pub scale_start: f64,
    pub scale_end: f64,
    pub center_start: Point,
    pub center_end: Point,
    pub focus_start: Point,
    pub focus_end: Point,
    pub started: Instant,
    pub config: AnimationConfig,
}

/// Unclamped transform for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationFrame {
    pub transform: ViewTransform,
    pub finished: bool,
}

impl Animation {
    pub fn plan(
        current: ViewTransform,
        bounds: &FitBounds,
        target: AnimationTarget,
        config: AnimationConfig,
        now: Instant,
    ) -> Self {
        let scale_end = bounds.limited_scale(target.scale);
        let view_center = bounds.view_center();
        let center_start = current.view_to_source(view_center);

        let (center_end, focus_end) = match target.focus {
            Some(focus) => {
                let wanted = ViewTransform::new(
                    scale_end,
                    Vec2::new(
                        focus.x - scale_end * target.center.x,
                        focus.y - scale_end * target.center.y,
                    ),
                );
                let focus_end = if config.pan_limited {
                    let fitted = bounds.fit(wanted, true);
                    focus + (fitted.translate - wanted.translate)
                } else {
                    focus
                };
                (target.center, focus_end)
            }
            None => {
                let center_end = if config.pan_limited {
                    bounds.limited_center(target.center, scale_end)
                } else {
                    target.center
                };
                (center_end, view_center)
            }
        };

        Self {
            scale_start: current.scale,
            scale_end,
            center_start,
            center_end,
            focus_start: current.source_to_view(center_end),
            focus_end,
            started: now,
            config,
        }
    }

    pub fn changes_scale(&self) -> bool {
        self.scale_start != self.scale_end
    }

    pub fn frame(&self, now: Instant) -> AnimationFrame {
        let elapsed = now.saturating_duration_since(self.started);
        let finished = elapsed > self.config.duration;
        let t = elapsed.min(self.config.duration).as_secs_f64() * 1000.0;
        let d = self.config.duration.as_secs_f64() * 1000.0;
        let easing = self.config.easing;

        let scale = easing.ease(t, self.scale_start, self.scale_end - self.scale_start, d);
        let focus = Point::new(
            easing.ease(t, self.focus_start.x, self.focus_end.x - self.focus_start.x, d),
            easing.ease(t, self.focus_start.y, self.focus_end.y - self.focus_start.y, d),
        );
        let translate = Vec2::new(
            focus.x - scale * self.center_end.x,
            focus.y - scale * self.center_end.y,
        );

        AnimationFrame {
            transform: ViewTransform::new(scale, translate),
            finished,
        }
    }
}
