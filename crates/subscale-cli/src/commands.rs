pub mod config;
pub mod gestures;
pub mod info;
pub mod pyramid;
pub mod render;

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use kurbo::Point;
use subscale_core::loader::RedrawRequester;
use subscale_core::orientation::Orientation;
use subscale_core::{Collaborators, EngineConfig, EngineEvent, ImageViewEngine};

/// Viewport options shared by the commands that drive an engine.
#[derive(Args)]
pub struct ViewArgs {
    /// Viewport width in pixels
    #[arg(long, default_value = "1080")]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value = "1920")]
    pub height: u32,

    /// Engine config TOML (see `subscale config`)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Orientation code: -1 (EXIF), 0, 90, 180 or 270
    #[arg(long, allow_hyphen_values = true)]
    pub orientation: Option<i32>,
}

impl ViewArgs {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(code) = self.orientation {
            config.orientation = Orientation::try_from(code)?;
        }
        Ok(config)
    }
}

/// Wakes the command loop whenever a decode result arrives.
struct Wakeup(mpsc::Sender<()>);

impl RedrawRequester for Wakeup {
    fn request_redraw(&self) {
        let _ = self.0.send(());
    }
}

pub struct HeadlessView {
    pub engine: ImageViewEngine,
    wakeups: mpsc::Receiver<()>,
}

impl HeadlessView {
    pub fn open(view: &ViewArgs, file: &std::path::Path) -> Result<Self> {
        let (tx, wakeups) = mpsc::channel();
        let collaborators = Collaborators {
            redraw: Arc::new(Wakeup(tx)),
            ..Collaborators::default()
        };
        let mut engine = ImageViewEngine::with_collaborators(view.engine_config()?, collaborators)?;
        engine.set_viewport_size(view.width, view.height);
        engine.set_image(file, None);
        Ok(Self { engine, wakeups })
    }

    /// Tick until the view is ready and idle. Returns the events seen.
    pub fn settle(&mut self, message: &str, timeout: Duration) -> Result<Vec<EngineEvent>> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        pb.set_message(message.to_string());

        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        loop {
            self.engine.tick(Instant::now());
            let stats = self.engine.stats();
            let done = stats.applied + stats.failed;
            pb.set_length(stats.scheduled as u64);
            pb.set_position(done.min(stats.scheduled) as u64);

            for event in self.engine.drain_events() {
                if let EngineEvent::ImageLoadError(error) = event {
                    pb.abandon_with_message("Load failed");
                    return Err(error.into());
                }
                events.push(event);
            }
            if self.engine.is_ready() && self.engine.is_settled() {
                break;
            }
            if Instant::now() > deadline {
                pb.abandon();
                bail!(
                    "Timed out after {:?} with {} decodes in flight",
                    timeout,
                    self.engine.in_flight()
                );
            }
            let _ = self.wakeups.recv_timeout(Duration::from_millis(16));
        }
        pb.finish_with_message(message.to_string());
        Ok(events)
    }
}

/// Parse `x,y` source coordinates.
pub fn parse_point(s: &str) -> std::result::Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x '{}': {}", x, e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y '{}': {}", y, e))?;
    Ok(Point::new(x, y))
}
