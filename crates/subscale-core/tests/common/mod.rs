#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use subscale_core::decoder::{sampled_size, DecoderFactory, OrientationReader, RegionDecoder};
use subscale_core::decoder::ser::SER_HEADER_SIZE;
use subscale_core::geometry::SourceRect;
use subscale_core::loader::NoRedraw;
use subscale_core::orientation::Rotation;
use subscale_core::{
    Collaborators, EngineConfig, EngineEvent, ImageViewEngine, Result, SubscaleError,
};

// ---------------------------------------------------------------------------
// Synthetic decoders
// ---------------------------------------------------------------------------

/// Blocks decodes until opened. Starts open.
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            cv: Condvar::new(),
        }
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }

    pub fn close(&self) {
        *self.open.lock().unwrap() = false;
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cv.wait(open).unwrap();
        }
    }
}

/// Shared record of what the synthetic decoders were asked to do.
pub struct DecodeLog {
    pub gate: Gate,
    pub calls: Mutex<Vec<(SourceRect, u32)>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    /// Number of upcoming decodes that fail, whatever their rect.
    pub fail_next: AtomicUsize,
    /// Native rects that fail every time.
    pub fail_rects: Mutex<Vec<SourceRect>>,
}

impl DecodeLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Gate::new(true),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
            fail_rects: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Decode calls made for `rect`, failed ones included.
    pub fn calls_for(&self, rect: SourceRect) -> usize {
        self.calls.lock().unwrap().iter().filter(|(r, _)| *r == rect).count()
    }
}

/// Decoder producing flat tiles whose colour encodes the requested rect.
pub struct SyntheticDecoder {
    width: u32,
    height: u32,
    log: Arc<DecodeLog>,
    recycled: bool,
}

impl RegionDecoder for SyntheticDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn decode_region(&mut self, rect: SourceRect, sample_size: u32) -> Result<RgbaImage> {
        if self.recycled {
            return Err(SubscaleError::DecoderRecycled);
        }
        let active = self.log.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_active.fetch_max(active, Ordering::SeqCst);
        self.log.gate.wait();
        self.log.calls.lock().unwrap().push((rect, sample_size));
        let transient = self
            .log
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient || self.log.fail_rects.lock().unwrap().contains(&rect) {
            self.log.active.fetch_sub(1, Ordering::SeqCst);
            return Err(SubscaleError::Decode(format!("synthetic failure at {:?}", rect)));
        }
        let (w, h) = sampled_size(rect, sample_size);
        let colour = Rgba([(rect.left % 256) as u8, (rect.top % 256) as u8, sample_size as u8, 255]);
        self.log.active.fetch_sub(1, Ordering::SeqCst);
        Ok(RgbaImage::from_pixel(w, h, colour))
    }

    fn is_recycled(&self) -> bool {
        self.recycled
    }

    fn recycle(&mut self) {
        self.recycled = true;
    }
}

/// Opens every path as a `width` x `height` synthetic image.
pub struct SyntheticFactory {
    pub width: u32,
    pub height: u32,
    pub log: Arc<DecodeLog>,
}

impl DecoderFactory for SyntheticFactory {
    fn open(&self, path: &Path) -> Result<Box<dyn RegionDecoder>> {
        if path.to_string_lossy().contains("missing") {
            return Err(SubscaleError::Decode(format!("no such source {}", path.display())));
        }
        Ok(Box::new(SyntheticDecoder {
            width: self.width,
            height: self.height,
            log: Arc::clone(&self.log),
            recycled: false,
        }))
    }
}

/// Reports a fixed EXIF rotation for every path.
pub struct FixedExif(pub Option<Rotation>);

impl OrientationReader for FixedExif {
    fn read(&self, _path: &Path) -> Result<Option<Rotation>> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Engine helpers
// ---------------------------------------------------------------------------

/// Engine over a synthetic `width` x `height` source with the given viewport.
pub fn synthetic_engine(
    config: EngineConfig,
    width: u32,
    height: u32,
    exif: Option<Rotation>,
) -> (ImageViewEngine, Arc<DecodeLog>) {
    let log = DecodeLog::new();
    let collaborators = Collaborators {
        decoders: Arc::new(SyntheticFactory {
            width,
            height,
            log: Arc::clone(&log),
        }),
        orientation: Arc::new(FixedExif(exif)),
        redraw: Arc::new(NoRedraw),
    };
    let engine = ImageViewEngine::with_collaborators(config, collaborators).expect("engine");
    (engine, log)
}

/// 400x300 synthetic source in a 100x80 viewport, ticked until ready.
pub fn ready_engine(config: EngineConfig) -> (ImageViewEngine, Arc<DecodeLog>) {
    let (mut engine, log) = synthetic_engine(config, 400, 300, None);
    engine.set_viewport_size(100, 80);
    engine.set_image("synthetic.png", None);
    settle(&mut engine);
    engine.drain_events();
    (engine, log)
}

/// Tick on the wall clock until `done` holds, collecting events.
pub fn pump(
    engine: &mut ImageViewEngine,
    done: impl Fn(&ImageViewEngine, &[EngineEvent]) -> bool,
) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut events = Vec::new();
    loop {
        engine.tick(Instant::now());
        events.extend(engine.drain_events());
        if done(engine, &events) {
            return events;
        }
        assert!(Instant::now() < deadline, "engine did not settle: {:?}", events);
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Tick until ready with nothing in flight.
pub fn settle(engine: &mut ImageViewEngine) -> Vec<EngineEvent> {
    pump(engine, |e, _| e.is_ready() && e.is_settled())
}

// ---------------------------------------------------------------------------
// SER files
// ---------------------------------------------------------------------------

/// Build a SER file header with configurable bit depth and color mode.
///
/// `color_id`: 0=MONO, 8..=19 Bayer, 100=RGB, 101=BGR
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID (4 bytes)
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID (4 bytes)
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0 (little-endian per Siril convention)
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, Instrument, Telescope (40 bytes each)
    buf.extend_from_slice(&[0u8; 120]);
    // DateTime, DateTimeUTC (8 bytes each)
    buf.extend_from_slice(&[0u8; 16]);

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Mono 8-bit SER with one frame whose pixel (x, y) is `x + y * width`.
pub fn build_gradient_ser(width: u32, height: u32) -> Vec<u8> {
    let mut buf = build_ser_header_full(width, height, 8, 1, 0);
    buf.extend((0..width * height).map(|i| (i % 256) as u8));
    buf
}

/// Write a SER buffer to a temporary `.ser` file.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::Builder::new()
        .suffix(".ser")
        .tempfile()
        .expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}
