use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use kurbo::{Size, Vec2};
use subscale_core::decoder::{
    DecoderFactory, ExifOrientationReader, FileDecoderFactory, OrientationReader,
    RegionDecoder,
};
use subscale_core::orientation::ImageGeometry;
use subscale_core::pyramid::{full_image_sample_size, tile_density_factor, TilePyramid};
use subscale_core::transform::ViewTransform;
use subscale_core::viewport::FitBounds;

use super::ViewArgs;

#[derive(Args)]
pub struct PyramidArgs {
    /// Input image or SER file
    pub file: PathBuf,

    #[command(flatten)]
    pub view: ViewArgs,
}

pub fn run(args: &PyramidArgs) -> Result<()> {
    let config = args.view.engine_config()?;
    if args.view.width == 0 || args.view.height == 0 {
        bail!("Viewport must be at least 1x1");
    }

    let decoder = FileDecoderFactory.open(&args.file)?;
    let (native_width, native_height) = decoder.dimensions();
    let exif = ExifOrientationReader.read(&args.file)?;
    let geometry = ImageGeometry::new(native_width, native_height, config.orientation.resolve(exif));

    let bounds = FitBounds {
        view: Size::new(args.view.width as f64, args.view.height as f64),
        source: Size::new(geometry.width() as f64, geometry.height() as f64),
        max_scale: config.max_scale,
        min_scale_override: config.min_scale,
        pan_limit: config.pan_limit,
    };
    let fitted = bounds.fit(ViewTransform::new(0.0, Vec2::ZERO), true);
    let density = tile_density_factor(config.minimum_tile_dpi, config.screen_dpi);
    let full_sample_size =
        full_image_sample_size(geometry.width(), geometry.height(), fitted.scale * density);
    let pyramid = TilePyramid::build(&geometry, full_sample_size, config.tile_limits(), 0);

    println!(
        "Source {}x{} rotated {}\u{b0}, viewport {}x{}, fit scale {:.4}",
        geometry.width(),
        geometry.height(),
        geometry.rotation.degrees(),
        args.view.width,
        args.view.height,
        fitted.scale
    );
    println!();
    println!("{:>8}  {:>9}  {:>7}  {:>13}", "Sample", "Grid", "Tiles", "Tile (px)");
    println!("{}", "-".repeat(44));
    for level in pyramid.levels() {
        let (cols, rows) = level.grid;
        let largest = level
            .tiles
            .iter()
            .map(|t| (t.source_rect.width(), t.source_rect.height()))
            .max()
            .unwrap_or((0, 0));
        println!(
            "{:>8}  {:>9}  {:>7}  {:>13}",
            level.sample_size,
            format!("{}x{}", cols, rows),
            level.tiles.len(),
            format!("{}x{}", largest.0, largest.1)
        );
    }
    println!("\nTotal tiles: {}", pyramid.tile_count());

    Ok(())
}
