use crate::error::SubscaleError;
use crate::geometry::Point;
use crate::pyramid::TileKey;

/// What moved the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A programmatic animation.
    Animation,
    Touch,
    Fling,
    DoubleTapZoom,
}

/// Notifications queued for the host, drained with
/// [`ImageViewEngine::drain_events`](crate::engine::ImageViewEngine::drain_events).
#[derive(Debug)]
pub enum EngineEvent {
    /// The base layer is resident; the view can draw, animate and take gestures.
    Ready,
    /// Sent right after `Ready` for the first full draw of a new source.
    ImageLoaded,
    ImageLoadError(SubscaleError),
    TileLoadError { key: TileKey, error: SubscaleError },
    ScaleChanged { scale: f64, origin: ChangeOrigin },
    CenterChanged { center: Point, origin: ChangeOrigin },
    AnimationComplete,
    AnimationInterruptedByUser,
    AnimationInterruptedByNewAnimation,
    /// Single tap, confirmed once the double tap window closed. View coordinates.
    Click(Point),
    LongClick(Point),
}
