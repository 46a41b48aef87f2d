//! Pointer events to viewport changes: pan, pinch zoom, fling, taps,
//! double taps and long presses.
//!
//! The mapper owns only gesture bookkeeping. The viewport transform is passed
//! in on every event and clamped through [`FitBounds`] before returning.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::consts::{
    DOUBLE_TAP_SLOP, DOUBLE_TAP_TIMEOUT_MS, DRAG_DEAD_ZONE, FLING_MIN_DISTANCE,
    FLING_MIN_VELOCITY, LONG_PRESS_TIMEOUT_MS, VELOCITY_WINDOW_MS, VERTICAL_PAN_THRESHOLD,
};
use crate::error::{Result, SubscaleError};
use crate::geometry::{Point, Vec2};
use crate::transform::ViewTransform;
use crate::viewport::FitBounds;

/// How a double tap zoom-in positions the tapped point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomStyle {
    /// The tapped point stays under the finger.
    #[default]
    Fixed,
    /// The tapped point animates to the viewport center.
    Center,
    /// Jump to the target without animating.
    CenterImmediate,
}

impl TryFrom<i32> for ZoomStyle {
    type Error = SubscaleError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(ZoomStyle::Fixed),
            2 => Ok(ZoomStyle::Center),
            3 => Ok(ZoomStyle::CenterImmediate),
            other => Err(SubscaleError::InvalidZoomStyle(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Cancel,
}

/// One pointer change in view coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub id: u64,
    pub position: Point,
    pub time: Instant,
    pub kind: PointerKind,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, id: u64, position: Point, time: Instant) -> Self {
        Self {
            id,
            position,
            time,
            kind,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    /// One pointer down, still inside the dead zone.
    Pressed,
    Panning,
    /// Two or more pointers down, still inside the dead zone.
    PinchPending,
    Zooming,
    /// Gesture handed off (edge swipe, long press, zoom disabled); ignored
    /// until every pointer is up.
    Detached,
}

/// Flags the mapper needs from the engine configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSettings {
    pub pan_enabled: bool,
    pub zoom_enabled: bool,
    /// Center kept while zooming with panning disabled.
    pub requested_center: Option<Point>,
}

/// What the engine should do after an event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureOutcome {
    None,
    /// The transform changed during a gesture.
    Moved,
    /// A gesture ended.
    Released,
    Fling { velocity: Vec2 },
    DoubleTap { position: Point },
    /// An earlier tap was superseded by a tap too far away to pair with it.
    Click { position: Point },
}

/// Values captured when the current pan or pinch started.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Anchor {
    scale: f64,
    translate: Vec2,
    /// Pointer position for a pan, pointer midpoint for a pinch.
    focus: Point,
    distance: f64,
}

/// Release velocity from the last [`VELOCITY_WINDOW_MS`] of samples.
#[derive(Clone, Debug, Default)]
struct VelocityTracker {
    samples: VecDeque<(Instant, Point)>,
}

impl VelocityTracker {
    fn reset(&mut self) {
        self.samples.clear();
    }

    fn add(&mut self, time: Instant, position: Point) {
        self.samples.push_back((time, position));
        let window = Duration::from_millis(VELOCITY_WINDOW_MS);
        while let Some(&(oldest, _)) = self.samples.front() {
            if time.saturating_duration_since(oldest) > window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Pixels per second.
    fn velocity(&self) -> Vec2 {
        match (self.samples.front(), self.samples.back()) {
            (Some(&(t0, p0)), Some(&(t1, p1))) => {
                let dt = t1.saturating_duration_since(t0).as_secs_f64();
                if dt < 1e-3 {
                    Vec2::ZERO
                } else {
                    (p1 - p0) / dt
                }
            }
            _ => Vec2::ZERO,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GestureMapper {
    phase: GesturePhase,
    /// Active pointers in press order.
    pointers: Vec<(u64, Point)>,
    max_pointers: usize,
    anchor: Option<Anchor>,
    press: Option<(Point, Instant)>,
    long_press_at: Option<Instant>,
    long_pressed: bool,
    /// First tap of a possible double tap: position and release time.
    pending_tap: Option<(Point, Instant)>,
    velocity: VelocityTracker,
}

impl Default for GestureMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureMapper {
    pub fn new() -> Self {
        Self {
            phase: GesturePhase::Idle,
            pointers: Vec::new(),
            max_pointers: 0,
            anchor: None,
            press: None,
            long_press_at: None,
            long_pressed: false,
            pending_tap: None,
            velocity: VelocityTracker::default(),
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// When the host should call [`GestureMapper::long_press`].
    pub fn long_press_deadline(&self) -> Option<Instant> {
        self.long_press_at
    }

    /// Confirm a single tap once the double tap window has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Point> {
        let (position, released) = self.pending_tap?;
        if now.saturating_duration_since(released) > Duration::from_millis(DOUBLE_TAP_TIMEOUT_MS) {
            self.pending_tap = None;
            Some(position)
        } else {
            None
        }
    }

    /// Fire the long press if its deadline passed with the press still held.
    pub fn long_press(&mut self, now: Instant) -> Option<Point> {
        let deadline = self.long_press_at?;
        if now < deadline || self.phase != GesturePhase::Pressed || self.pointers.len() != 1 {
            return None;
        }
        self.long_press_at = None;
        self.long_pressed = true;
        self.phase = GesturePhase::Detached;
        self.press.map(|(p, _)| p)
    }

    pub fn handle(
        &mut self,
        event: &PointerEvent,
        transform: &mut ViewTransform,
        bounds: &FitBounds,
        settings: GestureSettings,
    ) -> GestureOutcome {
        match event.kind {
            PointerKind::Down => self.on_down(event, transform, settings),
            PointerKind::Move => self.on_move(event, transform, bounds, settings),
            PointerKind::Up => self.on_up(event, transform, settings),
            PointerKind::Cancel => {
                let active = self.phase != GesturePhase::Idle;
                self.end_sequence();
                self.pending_tap = None;
                if active {
                    GestureOutcome::Released
                } else {
                    GestureOutcome::None
                }
            }
        }
    }

    fn on_down(
        &mut self,
        event: &PointerEvent,
        transform: &ViewTransform,
        settings: GestureSettings,
    ) -> GestureOutcome {
        self.pointers.retain(|(id, _)| *id != event.id);
        self.pointers.push((event.id, event.position));
        self.max_pointers = self.max_pointers.max(self.pointers.len());

        if self.pointers.len() == 1 {
            self.phase = GesturePhase::Pressed;
            self.anchor = Some(Anchor {
                scale: transform.scale,
                translate: transform.translate,
                focus: event.position,
                distance: 0.0,
            });
            self.press = Some((event.position, event.time));
            self.long_press_at = Some(event.time + Duration::from_millis(LONG_PRESS_TIMEOUT_MS));
            self.long_pressed = false;
            self.velocity.reset();
            self.velocity.add(event.time, event.position);
            return GestureOutcome::None;
        }

        self.long_press_at = None;
        if !settings.zoom_enabled {
            self.phase = GesturePhase::Detached;
            return GestureOutcome::None;
        }
        if self.phase == GesturePhase::Detached {
            return GestureOutcome::None;
        }
        self.anchor_pinch(transform);
        self.phase = match self.phase {
            GesturePhase::Panning | GesturePhase::Zooming => GesturePhase::Zooming,
            _ => GesturePhase::PinchPending,
        };
        GestureOutcome::None
    }

    fn on_move(
        &mut self,
        event: &PointerEvent,
        transform: &mut ViewTransform,
        bounds: &FitBounds,
        settings: GestureSettings,
    ) -> GestureOutcome {
        if let Some(p) = self.pointers.iter_mut().find(|(id, _)| *id == event.id) {
            p.1 = event.position;
        } else {
            return GestureOutcome::None;
        }
        if self.pointers.len() == 1 {
            self.velocity.add(event.time, event.position);
        }

        match self.phase {
            GesturePhase::Idle | GesturePhase::Detached => GestureOutcome::None,
            GesturePhase::PinchPending | GesturePhase::Zooming if self.pointers.len() >= 2 => {
                self.pinch(transform, bounds, settings)
            }
            GesturePhase::Pressed | GesturePhase::Panning if self.pointers.len() == 1 => {
                self.pan(event.position, transform, bounds, settings)
            }
            _ => GestureOutcome::None,
        }
    }

    fn pinch(
        &mut self,
        transform: &mut ViewTransform,
        bounds: &FitBounds,
        settings: GestureSettings,
    ) -> GestureOutcome {
        let Some(anchor) = self.anchor else {
            return GestureOutcome::None;
        };
        let (a, b) = (self.pointers[0].1, self.pointers[1].1);
        let distance = a.distance(b);
        let midpoint = a.midpoint(b);

        if self.phase == GesturePhase::PinchPending
            && midpoint.distance(anchor.focus) <= DRAG_DEAD_ZONE
            && (distance - anchor.distance).abs() <= DRAG_DEAD_ZONE
        {
            return GestureOutcome::None;
        }
        self.phase = GesturePhase::Zooming;

        if anchor.distance <= 0.0 {
            self.anchor_pinch(transform);
            return GestureOutcome::None;
        }

        let scale = (distance / anchor.distance * anchor.scale).min(bounds.max_scale);
        if scale <= bounds.min_scale() {
            *transform = bounds.fit(ViewTransform::new(scale, transform.translate), true);
            // Restart from here so spreading the fingers zooms straight back in.
            self.anchor = Some(Anchor {
                scale: transform.scale,
                translate: transform.translate,
                focus: midpoint,
                distance,
            });
            return GestureOutcome::Moved;
        }

        if settings.pan_enabled {
            let ratio = scale / anchor.scale;
            let left = (anchor.focus.x - anchor.translate.x) * ratio;
            let top = (anchor.focus.y - anchor.translate.y) * ratio;
            *transform = ViewTransform::new(scale, Vec2::new(midpoint.x - left, midpoint.y - top));
        } else {
            let center = settings
                .requested_center
                .unwrap_or_else(|| bounds.source_center());
            let view = bounds.view;
            *transform = ViewTransform::centered_on(center, scale, view.width, view.height);
        }
        *transform = bounds.fit(*transform, true);
        GestureOutcome::Moved
    }

    fn pan(
        &mut self,
        position: Point,
        transform: &mut ViewTransform,
        bounds: &FitBounds,
        settings: GestureSettings,
    ) -> GestureOutcome {
        let Some(anchor) = self.anchor else {
            return GestureOutcome::None;
        };
        let dx = (position.x - anchor.focus.x).abs();
        let dy = (position.y - anchor.focus.y).abs();
        if self.phase == GesturePhase::Pressed && dx <= DRAG_DEAD_ZONE && dy <= DRAG_DEAD_ZONE {
            return GestureOutcome::None;
        }
        self.long_press_at = None;

        let wanted = ViewTransform::new(
            transform.scale,
            anchor.translate + (position - anchor.focus),
        );
        let fitted = bounds.fit(wanted, true);
        let at_x_edge = fitted.translate.x != wanted.translate.x;
        let at_y_edge = fitted.translate.y != wanted.translate.y;
        let panning = self.phase == GesturePhase::Panning;
        let edge_x_swipe = at_x_edge && dx > dy && !panning;
        let edge_y_swipe = at_y_edge && dy > dx && !panning;
        let y_pan = !at_y_edge && dy > VERTICAL_PAN_THRESHOLD;

        *transform = fitted;
        if !edge_x_swipe && !edge_y_swipe && (!at_x_edge || !at_y_edge || y_pan || panning) {
            self.phase = GesturePhase::Panning;
        } else if dx > DRAG_DEAD_ZONE || dy > DRAG_DEAD_ZONE {
            self.phase = GesturePhase::Detached;
        }

        if !settings.pan_enabled {
            transform.translate = anchor.translate;
        }
        GestureOutcome::Moved
    }

    fn on_up(
        &mut self,
        event: &PointerEvent,
        transform: &ViewTransform,
        settings: GestureSettings,
    ) -> GestureOutcome {
        let count = self.pointers.len();
        if !self.pointers.iter().any(|(id, _)| *id == event.id) {
            return GestureOutcome::None;
        }
        self.pointers.retain(|(id, _)| *id != event.id);

        if count >= 2 {
            match self.phase {
                GesturePhase::Zooming | GesturePhase::PinchPending if count == 2 => {
                    // Keep panning with the finger that stayed down.
                    let remaining = self.pointers[0].1;
                    self.anchor = Some(Anchor {
                        scale: transform.scale,
                        translate: transform.translate,
                        focus: remaining,
                        distance: 0.0,
                    });
                    self.phase = if self.phase == GesturePhase::Zooming {
                        GesturePhase::Panning
                    } else {
                        GesturePhase::Pressed
                    };
                }
                GesturePhase::Zooming | GesturePhase::PinchPending => self.anchor_pinch(transform),
                _ => {}
            }
            return GestureOutcome::Released;
        }

        self.velocity.add(event.time, event.position);
        let phase = self.phase;
        let single = self.max_pointers == 1 && !self.long_pressed;
        let press = self.press;
        let velocity = self.velocity.velocity();
        self.end_sequence();

        if phase == GesturePhase::Pressed && single {
            let quick = press.is_some_and(|(_, t)| {
                event.time.saturating_duration_since(t) < Duration::from_millis(LONG_PRESS_TIMEOUT_MS)
            });
            if !quick {
                return GestureOutcome::None;
            }
            return self.tap(event.position, event.time);
        }

        if single && settings.pan_enabled && matches!(phase, GesturePhase::Panning | GesturePhase::Detached) {
            if let Some((start, _)) = press {
                let travel = event.position - start;
                let far = travel.x.abs() > FLING_MIN_DISTANCE || travel.y.abs() > FLING_MIN_DISTANCE;
                let fast = velocity.x.abs() > FLING_MIN_VELOCITY || velocity.y.abs() > FLING_MIN_VELOCITY;
                if far && fast {
                    return GestureOutcome::Fling { velocity };
                }
            }
        }

        match phase {
            GesturePhase::Idle => GestureOutcome::None,
            _ => GestureOutcome::Released,
        }
    }

    fn tap(&mut self, position: Point, time: Instant) -> GestureOutcome {
        match self.pending_tap.take() {
            Some((first, released))
                if time.saturating_duration_since(released)
                    <= Duration::from_millis(DOUBLE_TAP_TIMEOUT_MS)
                    && first.distance(position) <= DOUBLE_TAP_SLOP =>
            {
                GestureOutcome::DoubleTap { position: first }
            }
            displaced => {
                self.pending_tap = Some((position, time));
                match displaced {
                    Some((first, _)) => GestureOutcome::Click { position: first },
                    None => GestureOutcome::None,
                }
            }
        }
    }

    fn anchor_pinch(&mut self, transform: &ViewTransform) {
        if self.pointers.len() < 2 {
            return;
        }
        let (a, b) = (self.pointers[0].1, self.pointers[1].1);
        self.anchor = Some(Anchor {
            scale: transform.scale,
            translate: transform.translate,
            focus: a.midpoint(b),
            distance: a.distance(b),
        });
    }

    fn end_sequence(&mut self) {
        self.phase = GesturePhase::Idle;
        self.pointers.clear();
        self.max_pointers = 0;
        self.anchor = None;
        self.press = None;
        self.long_press_at = None;
        self.long_pressed = false;
    }
}
