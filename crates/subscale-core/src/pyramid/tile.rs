use image::RgbaImage;

use crate::geometry::SourceRect;

/// Address of a tile inside a pyramid: its level and its index in that level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub sample_size: u32,
    pub index: usize,
}

/// One cell of a pyramid level.
#[derive(Debug)]
pub struct Tile {
    /// Rect in displayed (rotated) source coordinates.
    pub source_rect: SourceRect,
    /// The same rect in the decoder's native frame.
    pub file_rect: SourceRect,
    pub sample_size: u32,
    /// Decoded pixels, already rotated for display.
    pub bitmap: Option<RgbaImage>,
    pub loading: bool,
    pub visible: bool,
}

impl Tile {
    pub fn new(source_rect: SourceRect, file_rect: SourceRect, sample_size: u32) -> Self {
        Self {
            source_rect,
            file_rect,
            sample_size,
            bitmap: None,
            loading: false,
            visible: false,
        }
    }

    /// Drop the bitmap and mark the tile as not needed.
    pub fn evict(&mut self) {
        self.visible = false;
        self.bitmap = None;
    }

    pub fn is_resident(&self) -> bool {
        self.bitmap.is_some()
    }
}

/// All tiles decoded at one sample size.
#[derive(Debug)]
pub struct TileLevel {
    pub sample_size: u32,
    /// Tiles per row and per column.
    pub grid: (u32, u32),
    pub tiles: Vec<Tile>,
}
