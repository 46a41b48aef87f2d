use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use image::{Rgba, RgbaImage};
use memmap2::Mmap;
use tracing::debug;

use super::{check_region, RegionDecoder};
use crate::error::{Result, SubscaleError};
use crate::geometry::SourceRect;

pub const SER_HEADER_SIZE: usize = 178;
const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// Pixel layout declared by the SER `ColorID` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerColorMode {
    Mono,
    /// Raw Bayer mosaic, shown undebayered as grey.
    Bayer,
    Rgb,
    Bgr,
}

impl SerColorMode {
    fn from_color_id(color_id: i32) -> Self {
        match color_id {
            8..=19 => SerColorMode::Bayer,
            100 => SerColorMode::Rgb,
            101 => SerColorMode::Bgr,
            _ => SerColorMode::Mono,
        }
    }

    pub fn planes(self) -> usize {
        match self {
            SerColorMode::Rgb | SerColorMode::Bgr => 3,
            _ => 1,
        }
    }
}

/// The fields of the 178-byte SER header this decoder needs.
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_mode: SerColorMode,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
}

impl SerHeader {
    pub fn bytes_per_sample(&self) -> usize {
        if self.pixel_depth <= 8 {
            1
        } else {
            2
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_sample() * self.color_mode.planes()
    }

    pub fn frame_byte_size(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.bytes_per_pixel())
    }
}

/// Region decoder over one frame of a memory-mapped SER capture.
///
/// Rows outside the requested region are never touched, so decoding a tile
/// of a large capture only faults in the pages that tile covers.
pub struct SerRegionDecoder {
    mmap: Option<Mmap>,
    header: SerHeader,
    frame_offset: usize,
}

impl SerRegionDecoder {
    /// Open `path` and decode regions of its first frame.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_frame(path, 0)
    }

    pub fn open_frame(path: &Path, frame_index: usize) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(SubscaleError::InvalidSer(
                "File too small for SER header".into(),
            ));
        }
        if &mmap[0..14] != SER_MAGIC {
            return Err(SubscaleError::InvalidSer(
                "Missing LUCAM-RECORDER magic".into(),
            ));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        if frame_index >= header.frame_count as usize {
            return Err(SubscaleError::InvalidSer(format!(
                "Frame {} requested but file holds {}",
                frame_index, header.frame_count
            )));
        }

        let frame_size = header
            .frame_byte_size()
            .ok_or_else(|| SubscaleError::InvalidSer("Frame size overflow".into()))?;
        let frame_offset = SER_HEADER_SIZE + frame_index * frame_size;
        if mmap.len() < frame_offset + frame_size {
            return Err(SubscaleError::InvalidSer(format!(
                "File truncated: frame {} needs {} bytes, got {}",
                frame_index,
                frame_offset + frame_size,
                mmap.len()
            )));
        }

        debug!(
            path = %path.display(),
            width = header.width,
            height = header.height,
            depth = header.pixel_depth,
            mode = ?header.color_mode,
            "Opened SER decoder"
        );
        Ok(Self {
            mmap: Some(mmap),
            header,
            frame_offset,
        })
    }

    pub fn header(&self) -> &SerHeader {
        &self.header
    }

    fn sample(&self, raw: &[u8], idx: usize) -> u8 {
        if self.header.bytes_per_sample() == 1 {
            return raw[idx];
        }
        let pair = [raw[idx], raw[idx + 1]];
        let value = if self.header.little_endian {
            u16::from_le_bytes(pair)
        } else {
            u16::from_be_bytes(pair)
        };
        let shift = self.header.pixel_depth.clamp(9, 16) - 8;
        (value >> shift).min(255) as u8
    }
}

impl RegionDecoder for SerRegionDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.header.width, self.header.height)
    }

    fn decode_region(&mut self, rect: SourceRect, sample_size: u32) -> Result<RgbaImage> {
        let mmap = self.mmap.as_ref().ok_or(SubscaleError::DecoderRecycled)?;
        check_region(rect, self.header.width, self.header.height)?;

        let n = sample_size.max(1);
        let out_w = rect.width().div_ceil(n);
        let out_h = rect.height().div_ceil(n);
        let stride = self.header.width as usize * self.header.bytes_per_pixel();
        let bps = self.header.bytes_per_sample();
        let raw = &mmap[self.frame_offset..];

        let mut out = RgbaImage::new(out_w, out_h);
        for oy in 0..out_h {
            let row = (rect.top + oy * n) as usize;
            for ox in 0..out_w {
                let col = (rect.left + ox * n) as usize;
                let base = row * stride + col * self.header.bytes_per_pixel();
                let pixel = match self.header.color_mode {
                    SerColorMode::Mono | SerColorMode::Bayer => {
                        let v = self.sample(raw, base);
                        Rgba([v, v, v, 255])
                    }
                    SerColorMode::Rgb => Rgba([
                        self.sample(raw, base),
                        self.sample(raw, base + bps),
                        self.sample(raw, base + 2 * bps),
                        255,
                    ]),
                    SerColorMode::Bgr => Rgba([
                        self.sample(raw, base + 2 * bps),
                        self.sample(raw, base + bps),
                        self.sample(raw, base),
                        255,
                    ]),
                };
                out.put_pixel(ox, oy, pixel);
            }
        }
        Ok(out)
    }

    fn is_recycled(&self) -> bool {
        self.mmap.is_none()
    }

    fn recycle(&mut self) {
        self.mmap = None;
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]);

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()?.max(0) as u32;
    let height = cursor.read_i32::<LittleEndian>()?.max(0) as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()?.max(0) as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()?.max(0) as u32;

    if width == 0 || height == 0 {
        return Err(SubscaleError::InvalidDimensions { width, height });
    }
    if pixel_depth == 0 || pixel_depth > 16 {
        return Err(SubscaleError::InvalidSer(format!(
            "Unsupported pixel depth {}",
            pixel_depth
        )));
    }

    // Most writers store 0 for little-endian data despite the field's name.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_mode: SerColorMode::from_color_id(color_id),
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
    })
}
