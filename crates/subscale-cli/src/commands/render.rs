use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use kurbo::Point;
use subscale_core::render::SoftwareSurface;

use super::{parse_point, HeadlessView, ViewArgs};
use crate::summary::{print_render_summary, RenderSummary};

#[derive(Args)]
pub struct RenderArgs {
    /// Input image or SER file
    pub file: PathBuf,

    /// Output PNG
    #[arg(short, long, default_value = "view.png")]
    pub output: PathBuf,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Scale to show, clamped to the configured limits
    #[arg(long)]
    pub scale: Option<f64>,

    /// Source point to center on, as x,y
    #[arg(long, value_parser = parse_point)]
    pub center: Option<Point>,

    /// Give up if tiles are still loading after this many seconds
    #[arg(long, default_value = "60")]
    pub timeout: u64,
}

pub fn run(args: &RenderArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout);
    let mut view = HeadlessView::open(&args.view, &args.file)?;
    view.settle("Loading base layer", timeout)?;

    if args.scale.is_some() || args.center.is_some() {
        let engine = &mut view.engine;
        let scale = args.scale.or(engine.scale()).unwrap_or(1.0);
        let center = args.center.or(engine.center()).unwrap_or(Point::ORIGIN);
        engine.set_scale_and_center(scale, center);
        view.settle("Loading tiles", timeout)?;
    }

    let engine = &view.engine;
    let mut surface = SoftwareSurface::new(args.view.width, args.view.height);
    let drawn = engine.draw(&mut surface);
    surface
        .into_image()
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    print_render_summary(&RenderSummary {
        input: &args.file,
        output: &args.output,
        engine,
        tiles_drawn: drawn,
    });
    Ok(())
}
