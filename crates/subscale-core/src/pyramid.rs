//! Multi-resolution tile grid for one image.
//!
//! Level `fullImageSampleSize` (the base layer) covers the image with the
//! fewest tiles and is never evicted. Each finer level halves the sample size
//! until native resolution, and every level partitions the displayed source
//! exactly.

pub mod sample;
pub mod tile;

use tracing::debug;

use crate::consts::DEFAULT_MAX_TILE_DIMENSION;
use crate::geometry::SourceRect;
use crate::orientation::ImageGeometry;

pub use sample::{full_image_sample_size, ideal_sample_size, tile_density_factor};
pub use tile::{Tile, TileKey, TileLevel};

/// Largest region, in decoded pixels, handed to the decoder in one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileLimits {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for TileLimits {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_TILE_DIMENSION,
            max_height: DEFAULT_MAX_TILE_DIMENSION,
        }
    }
}

#[derive(Debug)]
pub struct TilePyramid {
    /// Levels ordered coarsest (base layer) first.
    levels: Vec<TileLevel>,
    full_sample_size: u32,
    generation: u64,
}

impl TilePyramid {
    /// Build every level from `full_sample_size` down to 1.
    pub fn build(
        geometry: &ImageGeometry,
        full_sample_size: u32,
        limits: TileLimits,
        generation: u64,
    ) -> Self {
        let width = geometry.width();
        let height = geometry.height();
        let full_sample_size = full_sample_size.max(1).next_power_of_two();
        let max_width = limits.max_width.max(1);
        let max_height = limits.max_height.max(1);

        let mut levels = Vec::new();
        let mut sample_size = full_sample_size;
        let mut tiles_per_side: u32 = 1;

        loop {
            while (width / tiles_per_side) / sample_size > max_width
                || (height / tiles_per_side) / sample_size > max_height
            {
                tiles_per_side *= 2;
            }

            let level = build_level(geometry, sample_size, tiles_per_side);
            debug!(
                sample_size,
                columns = level.grid.0,
                rows = level.grid.1,
                "Built pyramid level"
            );
            levels.push(level);

            if sample_size == 1 {
                break;
            }
            sample_size /= 2;
            tiles_per_side = if tiles_per_side == 1 {
                4
            } else {
                tiles_per_side * 2
            };
        }

        Self {
            levels,
            full_sample_size,
            generation,
        }
    }

    pub fn levels(&self) -> &[TileLevel] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut [TileLevel] {
        &mut self.levels
    }

    pub fn full_sample_size(&self) -> u32 {
        self.full_sample_size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn base_layer(&self) -> &TileLevel {
        &self.levels[0]
    }

    pub fn base_layer_mut(&mut self) -> &mut TileLevel {
        &mut self.levels[0]
    }

    /// Base layer is loaded once every base tile has pixels.
    pub fn is_base_layer_ready(&self) -> bool {
        self.base_layer().tiles.iter().all(Tile::is_resident)
    }

    pub fn level(&self, sample_size: u32) -> Option<&TileLevel> {
        self.levels.iter().find(|l| l.sample_size == sample_size)
    }

    pub fn tile(&self, key: TileKey) -> Option<&Tile> {
        self.level(key.sample_size)?.tiles.get(key.index)
    }

    pub fn tile_mut(&mut self, key: TileKey) -> Option<&mut Tile> {
        self.levels
            .iter_mut()
            .find(|l| l.sample_size == key.sample_size)?
            .tiles
            .get_mut(key.index)
    }

    pub fn tile_count(&self) -> usize {
        self.levels.iter().map(|l| l.tiles.len()).sum()
    }

    pub fn resident_count(&self) -> usize {
        self.levels
            .iter()
            .flat_map(|l| l.tiles.iter())
            .filter(|t| t.is_resident())
            .count()
    }

    pub fn loading_count(&self) -> usize {
        self.levels
            .iter()
            .flat_map(|l| l.tiles.iter())
            .filter(|t| t.loading)
            .count()
    }
}

fn build_level(geometry: &ImageGeometry, sample_size: u32, tiles_per_side: u32) -> TileLevel {
    let width = geometry.width();
    let height = geometry.height();
    let columns = tiles_per_side.min(width).max(1);
    let rows = tiles_per_side.min(height).max(1);
    let tile_width = width / columns;
    let tile_height = height / rows;

    let mut tiles = Vec::with_capacity((columns * rows) as usize);
    for x in 0..columns {
        for y in 0..rows {
            let right = if x + 1 == columns {
                width
            } else {
                (x + 1) * tile_width
            };
            let bottom = if y + 1 == rows {
                height
            } else {
                (y + 1) * tile_height
            };
            let rect = SourceRect::new(x * tile_width, y * tile_height, right, bottom);
            tiles.push(Tile::new(rect, geometry.file_rect(rect), sample_size));
        }
    }

    TileLevel {
        sample_size,
        grid: (columns, rows),
        tiles,
    }
}
