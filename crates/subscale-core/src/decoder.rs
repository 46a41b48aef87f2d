//! Region decoders: open a source, report its native size, and decode any
//! sub-rectangle at a power-of-two sample size.

pub mod exif;
pub mod image_file;
pub mod ser;

use std::path::Path;

use image::{GenericImageView, Rgba, RgbaImage};

use crate::error::{Result, SubscaleError};
use crate::geometry::SourceRect;
use crate::orientation::Rotation;

pub use exif::ExifOrientationReader;
pub use image_file::ImageRegionDecoder;
pub use ser::SerRegionDecoder;

/// Decodes regions of one opened source. Calls are serialized by the owner.
pub trait RegionDecoder: Send {
    /// Native (unrotated) width and height.
    fn dimensions(&self) -> (u32, u32);

    /// Decode `rect` (native frame) keeping every `sample_size`th pixel.
    fn decode_region(&mut self, rect: SourceRect, sample_size: u32) -> Result<RgbaImage>;

    fn is_recycled(&self) -> bool;

    /// Release decoder resources. Later decodes fail with `DecoderRecycled`.
    fn recycle(&mut self);
}

/// Opens a region decoder for a source path.
pub trait DecoderFactory: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn RegionDecoder>>;
}

/// Reads the display rotation stored in a file's metadata, if any.
pub trait OrientationReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Option<Rotation>>;
}

/// Picks a decoder from the file extension: `.ser` video captures use the
/// memory-mapped SER decoder, everything else goes through `image`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileDecoderFactory;

impl DecoderFactory for FileDecoderFactory {
    fn open(&self, path: &Path) -> Result<Box<dyn RegionDecoder>> {
        if is_ser(path) {
            Ok(Box::new(SerRegionDecoder::open(path)?))
        } else {
            Ok(Box::new(ImageRegionDecoder::open(path)?))
        }
    }
}

pub(crate) fn is_ser(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ser"))
}

/// Reject rects that are empty or reach past the native bounds.
pub(crate) fn check_region(rect: SourceRect, width: u32, height: u32) -> Result<()> {
    if rect.width() == 0 || rect.height() == 0 || rect.right > width || rect.bottom > height {
        return Err(SubscaleError::Decode(format!(
            "region {}..{} x {}..{} outside {}x{} image",
            rect.left, rect.right, rect.top, rect.bottom, width, height
        )));
    }
    Ok(())
}

/// Output size of a region decoded at `sample_size` (rounded up).
pub fn sampled_size(rect: SourceRect, sample_size: u32) -> (u32, u32) {
    let n = sample_size.max(1);
    (rect.width().div_ceil(n), rect.height().div_ceil(n))
}

/// Keep every `sample_size`th pixel of `view` on both axes.
pub(crate) fn subsample<V>(view: &V, sample_size: u32) -> RgbaImage
where
    V: GenericImageView<Pixel = Rgba<u8>>,
{
    let n = sample_size.max(1);
    let (w, h) = view.dimensions();
    let out_w = w.div_ceil(n);
    let out_h = h.div_ceil(n);
    RgbaImage::from_fn(out_w, out_h, |x, y| view.get_pixel(x * n, y * n))
}
