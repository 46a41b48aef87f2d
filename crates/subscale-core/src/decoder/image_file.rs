use std::path::{Path, PathBuf};

use image::{imageops, ImageReader, Limits, RgbaImage};
use tracing::{debug, info};

use super::{check_region, subsample, RegionDecoder};
use crate::consts::DEFAULT_MAX_DECODE_BYTES;
use crate::error::{Result, SubscaleError};
use crate::geometry::SourceRect;

/// Region decoder for any format the `image` crate reads (PNG, JPEG, TIFF...).
///
/// These formats cannot be decoded by region, so this is not a true region
/// decoder: opening only reads the header, and the first region request
/// decodes the whole file into memory and keeps it until the decoder is
/// recycled. Sources whose RGBA buffer would exceed the allocation cap are
/// rejected at open. Use SER captures for sources that must not be held in
/// memory whole.
pub struct ImageRegionDecoder {
    path: Option<PathBuf>,
    width: u32,
    height: u32,
    pixels: Option<RgbaImage>,
    recycled: bool,
    max_alloc: u64,
}

impl ImageRegionDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_max_alloc(path, DEFAULT_MAX_DECODE_BYTES)
    }

    /// Open with a cap, in bytes, on the decoded buffer.
    pub fn open_with_max_alloc(path: &Path, max_alloc: u64) -> Result<Self> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?;
        if width == 0 || height == 0 {
            return Err(SubscaleError::InvalidDimensions { width, height });
        }
        let needed = width as u64 * height as u64 * 4;
        if needed > max_alloc {
            return Err(SubscaleError::Decode(format!(
                "{}x{} image needs {} bytes decoded, limit is {}",
                width, height, needed, max_alloc
            )));
        }
        debug!(path = %path.display(), width, height, "Opened image decoder");
        Ok(Self {
            path: Some(path.to_path_buf()),
            width,
            height,
            pixels: None,
            recycled: false,
            max_alloc,
        })
    }

    /// Decoder over pixels already in memory.
    pub fn from_buffer(pixels: RgbaImage) -> Result<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(SubscaleError::InvalidDimensions { width, height });
        }
        Ok(Self {
            path: None,
            width,
            height,
            pixels: Some(pixels),
            recycled: false,
            max_alloc: DEFAULT_MAX_DECODE_BYTES,
        })
    }

    fn pixels(&mut self) -> Result<&RgbaImage> {
        if self.pixels.is_none() {
            let path = self.path.as_ref().ok_or(SubscaleError::DecoderRecycled)?;
            let mut reader = ImageReader::open(path)?.with_guessed_format()?;
            let mut limits = Limits::default();
            limits.max_alloc = Some(self.max_alloc);
            reader.limits(limits);
            let decoded = reader.decode()?.into_rgba8();
            info!(path = %path.display(), "Decoded full image");
            self.pixels = Some(decoded);
        }
        self.pixels
            .as_ref()
            .ok_or_else(|| SubscaleError::Decode("image pixels unavailable".into()))
    }
}

impl RegionDecoder for ImageRegionDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn decode_region(&mut self, rect: SourceRect, sample_size: u32) -> Result<RgbaImage> {
        if self.recycled {
            return Err(SubscaleError::DecoderRecycled);
        }
        check_region(rect, self.width, self.height)?;
        let pixels = self.pixels()?;
        let region = imageops::crop_imm(pixels, rect.left, rect.top, rect.width(), rect.height());
        if sample_size <= 1 {
            return Ok(region.to_image());
        }
        Ok(subsample(&*region, sample_size))
    }

    fn is_recycled(&self) -> bool {
        self.recycled
    }

    fn recycle(&mut self) {
        self.recycled = true;
        self.pixels = None;
    }
}
