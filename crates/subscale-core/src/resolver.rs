//! Decides which tiles are needed for the current viewport and in what order
//! resident tiles are drawn.

use crate::geometry::Rect;
use crate::pyramid::{Tile, TileKey, TilePyramid};

/// Whether a resolver pass may schedule decodes. Passes during a gesture
/// are throttled unless eager loading is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPass {
    Load,
    NoLoad,
}

/// Sample size to display at, never finer than the base layer is coarse.
pub fn required_sample_size(full_sample_size: u32, ideal: u32) -> u32 {
    full_sample_size.min(ideal)
}

/// Update tile visibility for `visible_source` and return the tiles that
/// should be decoded. Bitmaps of tiles that are no longer needed are released.
pub fn refresh_required_tiles(
    pyramid: &mut TilePyramid,
    required: u32,
    visible_source: &Rect,
    pass: RefreshPass,
) -> Vec<TileKey> {
    let full = pyramid.full_sample_size();
    let mut to_load = Vec::new();

    for level in pyramid.levels_mut() {
        let sample_size = level.sample_size;
        for (index, tile) in level.tiles.iter_mut().enumerate() {
            let is_base = sample_size == full;
            if sample_size < required || (sample_size > required && !is_base) {
                tile.evict();
            }

            if sample_size == required && tile.source_rect.touches(visible_source) {
                tile.visible = true;
            } else if is_base {
                // The base layer stays wanted wherever the viewport is.
                tile.visible = true;
            } else if sample_size == required {
                tile.evict();
            }

            if tile.visible && wants_load(tile, pass) {
                to_load.push(TileKey { sample_size, index });
            }
        }
    }

    to_load
}

fn wants_load(tile: &Tile, pass: RefreshPass) -> bool {
    pass == RefreshPass::Load && !tile.loading && tile.bitmap.is_none()
}

/// Whether any visible tile at the required level still lacks pixels.
pub fn has_missing_tiles(pyramid: &TilePyramid, required: u32) -> bool {
    pyramid
        .level(required)
        .map(|level| {
            level
                .tiles
                .iter()
                .any(|t| t.visible && t.bitmap.is_none())
        })
        .unwrap_or(false)
}

/// Resident tiles to draw, coarsest first so finer tiles paint over them.
///
/// When the required level is complete only that level is drawn; otherwise
/// every resident tile is drawn, the base layer underneath.
pub fn draw_order(pyramid: &TilePyramid, required: u32) -> Vec<&Tile> {
    let all_levels = has_missing_tiles(pyramid, required);
    pyramid
        .levels()
        .iter()
        .filter(|level| all_levels || level.sample_size == required)
        .flat_map(|level| level.tiles.iter())
        .filter(|tile| tile.visible && tile.bitmap.is_some())
        .collect()
}
