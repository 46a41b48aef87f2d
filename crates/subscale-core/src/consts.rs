/// Largest tile edge handed to a region decoder when the decoder reports no limit.
pub const DEFAULT_MAX_TILE_DIMENSION: u32 = 2048;

/// Largest RGBA buffer (bytes) a whole-file image decoder may allocate.
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 512 * 1024 * 1024;

/// Default maximum scale (2 screen pixels per source pixel).
pub const DEFAULT_MAX_SCALE: f64 = 2.0;

/// Default scale targeted by a double tap zoom-in.
pub const DEFAULT_DOUBLE_TAP_ZOOM_SCALE: f64 = 1.0;

/// Sample size returned when the viewport requirement rounds to zero pixels.
pub const FALLBACK_SAMPLE_SIZE: u32 = 32;

/// Pointer travel (view px) before a press becomes a pan or a pinch.
pub const DRAG_DEAD_ZONE: f64 = 5.0;

/// Vertical travel (view px) that keeps a pan alive against a horizontal edge.
pub const VERTICAL_PAN_THRESHOLD: f64 = 15.0;

/// Minimum release velocity (px/s) on one axis for a fling.
pub const FLING_MIN_VELOCITY: f64 = 500.0;

/// Minimum total travel (view px) on one axis for a fling.
pub const FLING_MIN_DISTANCE: f64 = 50.0;

/// Seconds of release velocity added to the translate by a fling.
pub const FLING_VELOCITY_FACTOR: f64 = 0.25;

/// Window (ms) of pointer samples used to estimate release velocity.
pub const VELOCITY_WINDOW_MS: u64 = 100;

/// Duration of scale/center animations unless configured otherwise.
pub const DEFAULT_ANIMATION_DURATION_MS: u64 = 500;

/// A press held this long without moving is a long click.
pub const LONG_PRESS_TIMEOUT_MS: u64 = 600;

/// A tap is promoted to a click when no second tap follows within this window.
pub const DOUBLE_TAP_TIMEOUT_MS: u64 = 300;

/// Maximum distance (view px) between the two taps of a double tap.
pub const DOUBLE_TAP_SLOP: f64 = 100.0;

/// Double tap zooms in while the scale is at most this fraction of the target.
pub const DOUBLE_TAP_ZOOM_IN_FRACTION: f64 = 0.9;

/// Screen density assumed when the host does not provide one.
pub const DEFAULT_SCREEN_DPI: f64 = 160.0;
