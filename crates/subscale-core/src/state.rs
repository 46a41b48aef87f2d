use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::orientation::Orientation;

/// Scale, center and orientation of a view, for restoring it later.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageViewState {
    pub scale: f64,
    pub center: Point,
    pub orientation: Orientation,
}
