//! Background decoding. Work runs on a rayon pool and comes back to the
//! owning thread as [`LoadMessage`]s over an mpsc channel, each tagged with
//! the pyramid generation it was issued for.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info, warn};

use crate::decoder::{DecoderFactory, OrientationReader, RegionDecoder};
use crate::error::{Result, SubscaleError};
use crate::geometry::SourceRect;
use crate::orientation::Rotation;
use crate::pyramid::{Tile, TileKey};

/// Asks the host to run another tick. Called from worker threads.
pub trait RedrawRequester: Send + Sync {
    fn request_redraw(&self);
}

/// For hosts that tick on their own schedule.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRedraw;

impl RedrawRequester for NoRedraw {
    fn request_redraw(&self) {}
}

/// Decoder shared by all decode tasks; the mutex serializes decode calls.
pub type SharedDecoder = Arc<Mutex<Box<dyn RegionDecoder>>>;

/// Results sent from the decode pool back to the owner.
pub enum LoadMessage {
    ImageOpened {
        generation: u64,
        decoder: Box<dyn RegionDecoder>,
        exif_rotation: Option<Rotation>,
    },
    ImageFailed {
        generation: u64,
        error: SubscaleError,
    },
    TileDecoded {
        generation: u64,
        key: TileKey,
        bitmap: RgbaImage,
    },
    TileFailed {
        generation: u64,
        key: TileKey,
        error: SubscaleError,
    },
}

impl LoadMessage {
    pub fn generation(&self) -> u64 {
        match self {
            LoadMessage::ImageOpened { generation, .. }
            | LoadMessage::ImageFailed { generation, .. }
            | LoadMessage::TileDecoded { generation, .. }
            | LoadMessage::TileFailed { generation, .. } => *generation,
        }
    }
}

pub struct TileLoader {
    pool: ThreadPool,
    result_tx: mpsc::Sender<LoadMessage>,
    result_rx: mpsc::Receiver<LoadMessage>,
    redraw: Arc<dyn RedrawRequester>,
    in_flight: usize,
}

impl TileLoader {
    /// `threads == 0` lets rayon pick one thread per core.
    pub fn new(threads: usize, redraw: Arc<dyn RedrawRequester>) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("subscale-decode-{i}"))
            .build()
            .map_err(|e| SubscaleError::Worker(e.to_string()))?;
        let (result_tx, result_rx) = mpsc::channel();
        Ok(Self {
            pool,
            result_tx,
            result_rx,
            redraw,
            in_flight: 0,
        })
    }

    /// Tasks submitted whose result has not been drained yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Open the decoder for `path` and, when asked, read its EXIF rotation.
    pub fn open_image(
        &mut self,
        generation: u64,
        path: PathBuf,
        factory: Arc<dyn DecoderFactory>,
        exif: Option<Arc<dyn OrientationReader>>,
    ) {
        let tx = self.result_tx.clone();
        let redraw = Arc::clone(&self.redraw);
        self.in_flight += 1;
        self.pool.spawn(move || {
            let message = match factory.open(&path) {
                Ok(decoder) => {
                    let (width, height) = decoder.dimensions();
                    info!(path = %path.display(), width, height, "Image opened");
                    let exif_rotation = exif.and_then(|reader| match reader.read(&path) {
                        Ok(rotation) => rotation,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "Could not read EXIF orientation");
                            None
                        }
                    });
                    LoadMessage::ImageOpened {
                        generation,
                        decoder,
                        exif_rotation,
                    }
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to open image");
                    LoadMessage::ImageFailed {
                        generation,
                        error: e,
                    }
                }
            };
            send(&tx, redraw.as_ref(), message);
        });
    }

    /// Schedule a decode of `tile`. Marks it loading before returning so a
    /// tile never has two decodes in flight.
    pub fn load_tile(
        &mut self,
        generation: u64,
        key: TileKey,
        tile: &mut Tile,
        decoder: &SharedDecoder,
        rotation: Rotation,
    ) {
        debug_assert!(!tile.loading, "tile {:?} already loading", key);
        tile.loading = true;

        let tx = self.result_tx.clone();
        let redraw = Arc::clone(&self.redraw);
        let decoder = Arc::clone(decoder);
        let file_rect = tile.file_rect;
        let sample_size = tile.sample_size;
        self.in_flight += 1;
        debug!(?key, ?file_rect, "Scheduling tile decode");

        self.pool.spawn(move || {
            let message = match decode_tile(&decoder, file_rect, sample_size, rotation) {
                Ok(bitmap) => LoadMessage::TileDecoded {
                    generation,
                    key,
                    bitmap,
                },
                Err(error) => LoadMessage::TileFailed {
                    generation,
                    key,
                    error,
                },
            };
            send(&tx, redraw.as_ref(), message);
        });
    }

    /// Recycle `decoder` once every queued decode on it has released the lock.
    pub fn recycle(&self, decoder: SharedDecoder) {
        self.pool.spawn(move || match decoder.lock() {
            Ok(mut guard) => guard.recycle(),
            Err(poisoned) => poisoned.into_inner().recycle(),
        });
    }

    /// Every result delivered so far.
    pub fn drain(&mut self) -> Vec<LoadMessage> {
        let messages: Vec<_> = self.result_rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(messages.len());
        messages
    }
}

fn send(tx: &mpsc::Sender<LoadMessage>, redraw: &dyn RedrawRequester, message: LoadMessage) {
    let _ = tx.send(message);
    redraw.request_redraw();
}

fn decode_tile(
    decoder: &SharedDecoder,
    file_rect: SourceRect,
    sample_size: u32,
    rotation: Rotation,
) -> Result<RgbaImage> {
    let mut guard = decoder
        .lock()
        .map_err(|_| SubscaleError::Decode("decoder lock poisoned".into()))?;
    if guard.is_recycled() {
        return Err(SubscaleError::DecoderRecycled);
    }
    let bitmap = guard.decode_region(file_rect, sample_size)?;
    drop(guard);
    Ok(rotation.apply(bitmap))
}
