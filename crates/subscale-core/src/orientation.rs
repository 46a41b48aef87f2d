//! Display orientation of the source and the fixed remaps between the
//! displayed (rotated) frame and the decoder's native frame.

use std::fmt;

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SubscaleError};
use crate::geometry::SourceRect;

/// Requested orientation. `UseExif` defers to the file's metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    UseExif,
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    /// Resolve to a concrete rotation. `exif` is only consulted for `UseExif`.
    pub fn resolve(self, exif: Option<Rotation>) -> Rotation {
        match self {
            Orientation::UseExif => exif.unwrap_or(Rotation::Deg0),
            Orientation::Deg0 => Rotation::Deg0,
            Orientation::Deg90 => Rotation::Deg90,
            Orientation::Deg180 => Rotation::Deg180,
            Orientation::Deg270 => Rotation::Deg270,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Orientation::UseExif => -1,
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }
}

impl TryFrom<i32> for Orientation {
    type Error = SubscaleError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            -1 => Ok(Orientation::UseExif),
            0 => Ok(Orientation::Deg0),
            90 => Ok(Orientation::Deg90),
            180 => Ok(Orientation::Deg180),
            270 => Ok(Orientation::Deg270),
            other => Err(SubscaleError::InvalidOrientation(other)),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::UseExif => write!(f, "EXIF"),
            other => write!(f, "{}\u{b0}", other.code()),
        }
    }
}

/// Clockwise rotation applied to the decoded pixels for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Quarter turns swap the displayed width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Displayed dimensions for a source with the given native dimensions.
    pub fn displayed_size(self, native_width: u32, native_height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (native_height, native_width)
        } else {
            (native_width, native_height)
        }
    }

    /// Map a rect in displayed coordinates to the native frame of the decoder.
    pub fn file_rect(self, rect: SourceRect, native_width: u32, native_height: u32) -> SourceRect {
        let (w, h) = (native_width, native_height);
        match self {
            Rotation::Deg0 => rect,
            Rotation::Deg90 => SourceRect::new(rect.top, h - rect.right, rect.bottom, h - rect.left),
            Rotation::Deg180 => {
                SourceRect::new(w - rect.right, h - rect.bottom, w - rect.left, h - rect.top)
            }
            Rotation::Deg270 => SourceRect::new(w - rect.bottom, rect.left, w - rect.top, rect.right),
        }
    }

    /// Rotate a decoded native-frame buffer into display orientation.
    pub fn apply(self, buffer: RgbaImage) -> RgbaImage {
        match self {
            Rotation::Deg0 => buffer,
            Rotation::Deg90 => imageops::rotate90(&buffer),
            Rotation::Deg180 => imageops::rotate180(&buffer),
            Rotation::Deg270 => imageops::rotate270(&buffer),
        }
    }
}

/// Native decoder dimensions plus the rotation applied for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageGeometry {
    pub native_width: u32,
    pub native_height: u32,
    pub rotation: Rotation,
}

impl ImageGeometry {
    pub fn new(native_width: u32, native_height: u32, rotation: Rotation) -> Self {
        Self {
            native_width,
            native_height,
            rotation,
        }
    }

    /// Displayed width (`sWidth`).
    pub fn width(&self) -> u32 {
        self.rotation.displayed_size(self.native_width, self.native_height).0
    }

    /// Displayed height (`sHeight`).
    pub fn height(&self) -> u32 {
        self.rotation.displayed_size(self.native_width, self.native_height).1
    }

    pub fn file_rect(&self, rect: SourceRect) -> SourceRect {
        self.rotation
            .file_rect(rect, self.native_width, self.native_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_codes() {
        for code in [-1, 0, 90, 180, 270] {
            let o = Orientation::try_from(code).unwrap();
            assert_eq!(o.code(), code);
        }
        assert!(matches!(
            Orientation::try_from(45),
            Err(SubscaleError::InvalidOrientation(45))
        ));
    }

    #[test]
    fn test_use_exif_falls_back_to_zero() {
        assert_eq!(Orientation::UseExif.resolve(None), Rotation::Deg0);
        assert_eq!(
            Orientation::UseExif.resolve(Some(Rotation::Deg270)),
            Rotation::Deg270
        );
        assert_eq!(Orientation::Deg90.resolve(Some(Rotation::Deg180)), Rotation::Deg90);
    }

    #[test]
    fn test_file_rect_full_image_maps_to_full_image() {
        // Native 400x300. Displayed at 90/270 it is 300x400.
        let full = SourceRect::new(0, 0, 300, 400);
        assert_eq!(
            Rotation::Deg90.file_rect(full, 400, 300),
            SourceRect::new(0, 0, 400, 300)
        );
        assert_eq!(
            Rotation::Deg270.file_rect(full, 400, 300),
            SourceRect::new(0, 0, 400, 300)
        );
        let full0 = SourceRect::new(0, 0, 400, 300);
        assert_eq!(Rotation::Deg180.file_rect(full0, 400, 300), full0);
    }

    #[test]
    fn test_file_rect_180_corner() {
        let r = SourceRect::new(0, 0, 10, 20);
        assert_eq!(
            Rotation::Deg180.file_rect(r, 400, 300),
            SourceRect::new(390, 280, 400, 300)
        );
    }

    #[test]
    fn test_apply_rotates_buffer_dimensions() {
        let img = RgbaImage::new(4, 2);
        let rotated = Rotation::Deg90.apply(img.clone());
        assert_eq!(rotated.dimensions(), (2, 4));
        assert_eq!(Rotation::Deg180.apply(img).dimensions(), (4, 2));
    }
}
