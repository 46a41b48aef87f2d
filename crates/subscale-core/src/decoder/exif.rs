use std::path::Path;

use image::metadata::Orientation as ExifOrientation;
use image::{ImageDecoder, ImageReader};
use tracing::warn;

use super::{is_ser, OrientationReader};
use crate::error::Result;
use crate::orientation::Rotation;

/// Reads the EXIF orientation tag through the `image` crate's decoders.
///
/// Mirrored orientations cannot be expressed as a rotation; they are
/// reported as 0 with a warning.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExifOrientationReader;

impl OrientationReader for ExifOrientationReader {
    fn read(&self, path: &Path) -> Result<Option<Rotation>> {
        if is_ser(path) {
            return Ok(None);
        }
        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        let rotation = match decoder.orientation()? {
            ExifOrientation::NoTransforms => Rotation::Deg0,
            ExifOrientation::Rotate90 => Rotation::Deg90,
            ExifOrientation::Rotate180 => Rotation::Deg180,
            ExifOrientation::Rotate270 => Rotation::Deg270,
            other => {
                warn!(orientation = ?other, path = %path.display(), "Unsupported EXIF orientation");
                Rotation::Deg0
            }
        };
        Ok(Some(rotation))
    }
}
