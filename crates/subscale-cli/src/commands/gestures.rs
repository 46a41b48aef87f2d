use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use kurbo::Point;
use serde::Deserialize;
use subscale_core::gesture::{PointerEvent, PointerKind};
use subscale_core::{EngineEvent, ImageViewEngine};
use tracing::debug;

use super::{HeadlessView, ViewArgs};

#[derive(Args)]
pub struct GesturesArgs {
    /// Input image or SER file
    pub file: PathBuf,

    /// Pointer script TOML
    pub script: PathBuf,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Give up if tiles are still loading after this many seconds
    #[arg(long, default_value = "60")]
    pub timeout: u64,
}

/// A recorded pointer sequence, times relative to the first step.
#[derive(Debug, Deserialize)]
struct Script {
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StepKind {
    Down,
    Move,
    Up,
    Cancel,
    /// Fire the host long-press timer.
    LongPress,
    /// Advance the clock without input.
    Tick,
}

#[derive(Debug, Deserialize)]
struct Step {
    at_ms: u64,
    kind: StepKind,
    #[serde(default)]
    id: u64,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

pub fn run(args: &GesturesArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let script: Script = toml::from_str(&text)
        .with_context(|| format!("Failed to parse script {}", args.script.display()))?;

    let mut view = HeadlessView::open(&args.view, &args.file)?;
    view.settle("Loading base layer", Duration::from_secs(args.timeout))?;
    let engine = &mut view.engine;

    let start = Instant::now();
    let mut last = start;
    for step in &script.steps {
        let at = start + Duration::from_millis(step.at_ms);
        last = last.max(at);
        engine.tick(at);
        print_events(engine, step.at_ms);

        let position = Point::new(step.x, step.y);
        let kind = match step.kind {
            StepKind::Down => PointerKind::Down,
            StepKind::Move => PointerKind::Move,
            StepKind::Up => PointerKind::Up,
            StepKind::Cancel => PointerKind::Cancel,
            StepKind::LongPress => {
                engine.on_long_press(at);
                print_events(engine, step.at_ms);
                continue;
            }
            StepKind::Tick => continue,
        };
        debug!(?kind, id = step.id, x = step.x, y = step.y, "Replaying pointer event");
        engine.on_pointer_event(PointerEvent::new(kind, step.id, position, at));
        print_events(engine, step.at_ms);
    }

    // Let animations and the double tap window run out.
    let end = last + Duration::from_secs(2);
    engine.tick(end);
    print_events(engine, end.duration_since(start).as_millis() as u64);

    if let (Some(scale), Some(center)) = (engine.scale(), engine.center()) {
        println!(
            "\nFinal view: scale {:.4}, center ({:.1}, {:.1})",
            scale, center.x, center.y
        );
    }
    Ok(())
}

fn print_events(engine: &mut ImageViewEngine, at_ms: u64) {
    for event in engine.drain_events() {
        match event {
            EngineEvent::ScaleChanged { scale, origin } => {
                println!("{:>6} ms  scale {:.4} ({:?})", at_ms, scale, origin)
            }
            EngineEvent::CenterChanged { center, origin } => println!(
                "{:>6} ms  center ({:.1}, {:.1}) ({:?})",
                at_ms, center.x, center.y, origin
            ),
            other => println!("{:>6} ms  {:?}", at_ms, other),
        }
    }
}
