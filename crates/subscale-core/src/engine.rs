//! The viewport engine: owns the pyramid, viewport, gesture and animation
//! state on one thread and drives background decodes through [`TileLoader`].
//!
//! Hosts call [`ImageViewEngine::tick`] once per frame, forward pointer
//! events, and draw with [`ImageViewEngine::draw`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::animation::{Animation, AnimationConfig, AnimationTarget, Easing};
use crate::config::{validate_scale_bounds, EngineConfig};
use crate::consts::{DOUBLE_TAP_ZOOM_IN_FRACTION, FLING_VELOCITY_FACTOR};
use crate::decoder::{
    DecoderFactory, ExifOrientationReader, FileDecoderFactory, OrientationReader,
};
use crate::error::{Result, SubscaleError};
use crate::events::{ChangeOrigin, EngineEvent};
use crate::geometry::{Point, Rect, Size, Vec2};
use crate::gesture::{GestureMapper, GestureOutcome, GestureSettings, PointerEvent, ZoomStyle};
use crate::loader::{LoadMessage, NoRedraw, RedrawRequester, SharedDecoder, TileLoader};
use crate::orientation::{ImageGeometry, Orientation, Rotation};
use crate::pyramid::{
    full_image_sample_size, ideal_sample_size, tile_density_factor, TilePyramid,
};
use crate::render::RenderSurface;
use crate::resolver::{self, RefreshPass};
use crate::state::ImageViewState;
use crate::transform::ViewTransform;
use crate::viewport::{FitBounds, PanLimit, PendingView, ViewportState};

/// External services the engine depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub decoders: Arc<dyn DecoderFactory>,
    pub orientation: Arc<dyn OrientationReader>,
    pub redraw: Arc<dyn RedrawRequester>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            decoders: Arc::new(FileDecoderFactory),
            orientation: Arc::new(ExifOrientationReader),
            redraw: Arc::new(NoRedraw),
        }
    }
}

/// Counters of decode results, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub scheduled: usize,
    pub applied: usize,
    pub discarded_stale: usize,
    pub failed: usize,
}

struct LoadedImage {
    decoder: SharedDecoder,
    native_width: u32,
    native_height: u32,
    exif_rotation: Option<Rotation>,
}

pub struct ImageViewEngine {
    config: EngineConfig,
    collaborators: Collaborators,
    loader: TileLoader,
    /// Bumped for every new source; tags image-open results.
    image_generation: u64,
    /// Bumped whenever the pyramid is discarded; tags tile results.
    pyramid_generation: u64,
    source: Option<PathBuf>,
    image: Option<LoadedImage>,
    view_size: Option<Size>,
    viewport: ViewportState,
    pyramid: Option<TilePyramid>,
    gestures: GestureMapper,
    animation: Option<Animation>,
    events: Vec<EngineEvent>,
    ready_sent: bool,
    image_loaded_sent: bool,
    stats: LoadStats,
}

impl ImageViewEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_collaborators(config, Collaborators::default())
    }

    pub fn with_collaborators(config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let loader = TileLoader::new(config.worker_threads, Arc::clone(&collaborators.redraw))?;
        Ok(Self {
            config,
            collaborators,
            loader,
            image_generation: 0,
            pyramid_generation: 0,
            source: None,
            image: None,
            view_size: None,
            viewport: ViewportState::default(),
            pyramid: None,
            gestures: GestureMapper::new(),
            animation: None,
            events: Vec::new(),
            ready_sent: false,
            image_loaded_sent: false,
            stats: LoadStats::default(),
        })
    }

    // ------------------------------------------------------------------
    // Source lifecycle
    // ------------------------------------------------------------------

    /// Show a new source, optionally restoring a saved state once it is ready.
    pub fn set_image(&mut self, path: impl Into<PathBuf>, state: Option<ImageViewState>) {
        self.reset(true);
        let path = path.into();
        if let Some(state) = state {
            self.config.orientation = state.orientation;
            self.viewport.pending = Some(PendingView {
                scale: state.scale,
                center: state.center,
            });
        }
        info!(path = %path.display(), "Loading image");
        self.loader.open_image(
            self.image_generation,
            path.clone(),
            Arc::clone(&self.collaborators.decoders),
            Some(Arc::clone(&self.collaborators.orientation)),
        );
        self.source = Some(path);
    }

    /// Release the decoder and every tile.
    pub fn recycle(&mut self) {
        self.reset(true);
    }

    fn reset(&mut self, new_image: bool) {
        debug!(new_image, "Resetting view");
        self.viewport.clear();
        self.gestures.reset();
        self.animation = None;
        self.pyramid = None;
        self.pyramid_generation += 1;
        if new_image {
            self.image_generation += 1;
            self.source = None;
            if let Some(image) = self.image.take() {
                self.loader.recycle(image.decoder);
            }
            self.ready_sent = false;
            self.image_loaded_sent = false;
        }
    }

    // ------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------

    /// Apply finished decodes, pending view changes and the running animation.
    pub fn tick(&mut self, now: Instant) {
        self.process_messages();
        if let Some(position) = self.gestures.poll(now) {
            self.events.push(EngineEvent::Click(position));
        }
        if self.view_size.is_none() || self.image.is_none() {
            return;
        }
        if self.pyramid.is_none() {
            self.initialise_base_layer();
        }
        self.apply_pending();
        self.step_animation(now);
        // Base tiles that failed are retried until the view can draw.
        if self
            .pyramid
            .as_ref()
            .is_some_and(|p| !p.is_base_layer_ready())
        {
            self.refresh_required_tiles(RefreshPass::Load);
        }
        self.check_ready();
    }

    fn process_messages(&mut self) {
        for message in self.loader.drain() {
            match message {
                LoadMessage::ImageOpened {
                    generation,
                    mut decoder,
                    exif_rotation,
                } => {
                    if generation != self.image_generation {
                        decoder.recycle();
                        self.stats.discarded_stale += 1;
                        continue;
                    }
                    let (native_width, native_height) = decoder.dimensions();
                    if native_width == 0 || native_height == 0 {
                        self.fail_image(SubscaleError::InvalidDimensions {
                            width: native_width,
                            height: native_height,
                        });
                        continue;
                    }
                    self.image = Some(LoadedImage {
                        decoder: Arc::new(Mutex::new(decoder)),
                        native_width,
                        native_height,
                        exif_rotation,
                    });
                }
                LoadMessage::ImageFailed { generation, error } => {
                    if generation == self.image_generation {
                        self.fail_image(error);
                    }
                }
                LoadMessage::TileDecoded {
                    generation,
                    key,
                    bitmap,
                } => {
                    let tile = self
                        .pyramid
                        .as_mut()
                        .filter(|p| p.generation() == generation)
                        .and_then(|p| p.tile_mut(key));
                    match tile {
                        Some(tile) => {
                            tile.loading = false;
                            if tile.visible {
                                tile.bitmap = Some(bitmap);
                                self.stats.applied += 1;
                            } else {
                                self.stats.discarded_stale += 1;
                            }
                        }
                        None => self.stats.discarded_stale += 1,
                    }
                }
                LoadMessage::TileFailed {
                    generation,
                    key,
                    error,
                } => {
                    let tile = self
                        .pyramid
                        .as_mut()
                        .filter(|p| p.generation() == generation)
                        .and_then(|p| p.tile_mut(key));
                    match tile {
                        Some(tile) => {
                            tile.loading = false;
                            warn!(?key, error = %error, "Tile decode failed");
                            self.stats.failed += 1;
                            self.events.push(EngineEvent::TileLoadError { key, error });
                        }
                        None => self.stats.discarded_stale += 1,
                    }
                }
            }
        }
    }

    fn fail_image(&mut self, error: SubscaleError) {
        error!(error = %error, "Image failed to load");
        self.reset(true);
        self.events.push(EngineEvent::ImageLoadError(error));
    }

    fn initialise_base_layer(&mut self) {
        let (Some(bounds), Some(geometry)) = (self.fit_bounds(), self.geometry()) else {
            return;
        };
        let fitted = bounds.fit(ViewTransform::new(0.0, Vec2::ZERO), true);
        let density = tile_density_factor(self.config.minimum_tile_dpi, self.config.screen_dpi);
        let full_sample_size =
            full_image_sample_size(geometry.width(), geometry.height(), fitted.scale * density);
        info!(
            width = geometry.width(),
            height = geometry.height(),
            rotation = geometry.rotation.degrees(),
            full_sample_size,
            "Initialising base layer"
        );

        let mut pyramid = TilePyramid::build(
            &geometry,
            full_sample_size,
            self.config.tile_limits(),
            self.pyramid_generation,
        );
        for tile in &mut pyramid.base_layer_mut().tiles {
            tile.visible = true;
        }
        self.pyramid = Some(pyramid);
        if self.viewport.transform.is_none() {
            self.viewport.transform = Some(fitted);
        }
        self.refresh_required_tiles(RefreshPass::Load);
    }

    fn apply_pending(&mut self) {
        let Some(bounds) = self.fit_bounds() else {
            return;
        };
        if let Some(pending) = self.viewport.pending.take() {
            let view = bounds.view;
            let wanted = ViewTransform::centered_on(pending.center, pending.scale, view.width, view.height);
            self.viewport.transform = Some(bounds.fit(wanted, true));
            self.refresh_required_tiles(RefreshPass::Load);
        }
        if let Some(t) = self.viewport.transform {
            self.viewport.transform = Some(bounds.fit(t, false));
        }
    }

    fn step_animation(&mut self, now: Instant) {
        let (Some(anim), Some(bounds), Some(before)) =
            (self.animation.as_ref(), self.fit_bounds(), self.viewport.transform)
        else {
            return;
        };
        let frame = anim.frame(now);
        let origin = anim.config.origin;
        let center = frame.finished || !anim.changes_scale();
        self.viewport.transform = Some(bounds.fit(frame.transform, center));
        self.notify_changes(before, origin);

        let pass = if frame.finished || self.config.eager_loading {
            RefreshPass::Load
        } else {
            RefreshPass::NoLoad
        };
        self.refresh_required_tiles(pass);
        if frame.finished {
            debug!(?origin, "Animation complete");
            self.animation = None;
            self.events.push(EngineEvent::AnimationComplete);
        }
    }

    fn check_ready(&mut self) {
        let base_ready = self
            .pyramid
            .as_ref()
            .is_some_and(TilePyramid::is_base_layer_ready);
        if !base_ready || self.viewport.transform.is_none() {
            return;
        }
        if !self.ready_sent {
            self.ready_sent = true;
            info!("Image ready");
            self.events.push(EngineEvent::Ready);
        }
        if !self.image_loaded_sent {
            self.image_loaded_sent = true;
            self.events.push(EngineEvent::ImageLoaded);
        }
    }

    /// Run the resolver for the current viewport and schedule its decodes.
    fn refresh_required_tiles(&mut self, pass: RefreshPass) {
        let (Some(transform), Some(bounds), Some(geometry)) =
            (self.viewport.transform, self.fit_bounds(), self.geometry())
        else {
            return;
        };
        let Some(required) = self.required_sample_size() else {
            return;
        };
        let (Some(pyramid), Some(image)) = (self.pyramid.as_mut(), self.image.as_ref()) else {
            return;
        };

        let visible = transform.view_to_source_rect(bounds.view_rect());
        let keys = resolver::refresh_required_tiles(pyramid, required, &visible, pass);
        let generation = pyramid.generation();
        for key in keys {
            if let Some(tile) = pyramid.tile_mut(key) {
                self.loader
                    .load_tile(generation, key, tile, &image.decoder, geometry.rotation);
                self.stats.scheduled += 1;
            }
        }
    }

    fn required_sample_size(&self) -> Option<u32> {
        let transform = self.viewport.transform?;
        let geometry = self.geometry()?;
        let pyramid = self.pyramid.as_ref()?;
        let density = tile_density_factor(self.config.minimum_tile_dpi, self.config.screen_dpi);
        let ideal = ideal_sample_size(geometry.width(), geometry.height(), transform.scale * density);
        Some(resolver::required_sample_size(pyramid.full_sample_size(), ideal))
    }

    /// Draw resident tiles for the current viewport. Returns the number drawn.
    pub fn draw(&self, surface: &mut dyn RenderSurface) -> usize {
        let (Some(pyramid), Some(transform), Some(required)) = (
            self.pyramid.as_ref(),
            self.viewport.transform,
            self.required_sample_size(),
        ) else {
            return 0;
        };
        if !pyramid.is_base_layer_ready() {
            return 0;
        }
        let mut drawn = 0;
        for tile in resolver::draw_order(pyramid, required) {
            if let Some(bitmap) = tile.bitmap.as_ref() {
                let dest = transform.source_to_view_rect(tile.source_rect.to_rect());
                surface.draw_tile(bitmap, dest);
                drawn += 1;
            }
        }
        drawn
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Feed one pointer event. Returns whether the engine consumed it.
    pub fn on_pointer_event(&mut self, event: PointerEvent) -> bool {
        if let Some(position) = self.gestures.poll(event.time) {
            self.events.push(EngineEvent::Click(position));
        }
        if let Some(anim) = &self.animation {
            if !anim.config.interruptible {
                return true;
            }
            self.animation = None;
            self.events.push(EngineEvent::AnimationInterruptedByUser);
        }
        if !self.is_ready() {
            return false;
        }
        let (Some(mut transform), Some(bounds)) = (self.viewport.transform, self.fit_bounds())
        else {
            return false;
        };

        let before = transform;
        let settings = GestureSettings {
            pan_enabled: self.config.pan_enabled,
            zoom_enabled: self.config.zoom_enabled,
            requested_center: self.viewport.requested_center,
        };
        let outcome = self.gestures.handle(&event, &mut transform, &bounds, settings);
        self.viewport.transform = Some(transform);

        match outcome {
            GestureOutcome::None => {}
            GestureOutcome::Moved => {
                self.notify_changes(before, ChangeOrigin::Touch);
                let pass = if self.config.eager_loading {
                    RefreshPass::Load
                } else {
                    RefreshPass::NoLoad
                };
                self.refresh_required_tiles(pass);
            }
            GestureOutcome::Released => {
                self.notify_changes(before, ChangeOrigin::Touch);
                self.refresh_required_tiles(RefreshPass::Load);
            }
            GestureOutcome::Fling { velocity } => self.fling(velocity, event.time),
            GestureOutcome::DoubleTap { position } => {
                self.double_tap_zoom(position, event.time)
            }
            GestureOutcome::Click { position } => self.events.push(EngineEvent::Click(position)),
        }
        true
    }

    /// Host timer callback for long presses; see [`Self::long_press_deadline`].
    pub fn on_long_press(&mut self, now: Instant) {
        if let Some(position) = self.gestures.long_press(now) {
            self.events.push(EngineEvent::LongClick(position));
        }
    }

    pub fn long_press_deadline(&self) -> Option<Instant> {
        self.gestures.long_press_deadline()
    }

    fn fling(&mut self, velocity: Vec2, now: Instant) {
        let (Some(transform), Some(bounds)) = (self.viewport.transform, self.fit_bounds()) else {
            return;
        };
        let end = transform.translate + velocity * FLING_VELOCITY_FACTOR;
        let center = Point::new(
            (bounds.view.width / 2.0 - end.x) / transform.scale,
            (bounds.view.height / 2.0 - end.y) / transform.scale,
        );
        debug!(vx = velocity.x, vy = velocity.y, "Fling");
        let config = AnimationConfig {
            easing: Easing::OutQuad,
            pan_limited: false,
            origin: ChangeOrigin::Fling,
            ..AnimationConfig::default()
        };
        let target = AnimationTarget {
            scale: transform.scale,
            center,
            focus: None,
        };
        if let Err(e) = self.start_animation(target, config, now) {
            debug!(error = %e, "Fling not started");
        }
    }

    fn double_tap_zoom(&mut self, position: Point, now: Instant) {
        if !self.config.zoom_enabled {
            return;
        }
        let (Some(transform), Some(bounds)) = (self.viewport.transform, self.fit_bounds()) else {
            return;
        };
        let tapped = transform.view_to_source(position);
        let double_tap_scale = self.config.max_scale.min(self.config.double_tap_zoom_scale);
        let min_scale = bounds.min_scale();
        let zoom_in = transform.scale <= double_tap_scale * DOUBLE_TAP_ZOOM_IN_FRACTION
            || (transform.scale - min_scale).abs() < f64::EPSILON;
        let scale = if zoom_in { double_tap_scale } else { min_scale };
        let center = if self.config.pan_enabled {
            tapped
        } else {
            self.viewport
                .requested_center
                .unwrap_or_else(|| bounds.source_center())
        };

        let style = self.config.double_tap_zoom_style;
        if style == ZoomStyle::CenterImmediate {
            self.set_scale_and_center(scale, center);
            return;
        }
        let focus = (style == ZoomStyle::Fixed && zoom_in && self.config.pan_enabled)
            .then_some(position);
        let config = AnimationConfig {
            duration: Duration::from_millis(self.config.double_tap_zoom_duration_ms),
            interruptible: false,
            origin: ChangeOrigin::DoubleTapZoom,
            ..AnimationConfig::default()
        };
        let target = AnimationTarget {
            scale,
            center,
            focus,
        };
        if let Err(e) = self.start_animation(target, config, now) {
            debug!(error = %e, "Double tap zoom not started");
        }
    }

    // ------------------------------------------------------------------
    // Programmatic view changes
    // ------------------------------------------------------------------

    /// Jump to `scale` centered on `center`; applied on the next tick.
    pub fn set_scale_and_center(&mut self, scale: f64, center: Point) {
        self.animation = None;
        self.viewport.pending = Some(PendingView { scale, center });
        self.viewport.requested_center = Some(center);
    }

    /// Zoom out fully and center the image; applied on the next tick.
    pub fn reset_scale_and_center(&mut self) {
        self.animation = None;
        match self.fit_bounds() {
            Some(bounds) => {
                self.viewport.pending = Some(PendingView {
                    scale: bounds.limited_scale(0.0),
                    center: bounds.source_center(),
                });
            }
            None => self.viewport.pending = None,
        }
    }

    pub fn animate_scale(&mut self, scale: f64, config: AnimationConfig) -> Result<()> {
        let center = self.center().ok_or(SubscaleError::NotReady)?;
        self.animate_scale_and_center(scale, center, config)
    }

    pub fn animate_center(&mut self, center: Point, config: AnimationConfig) -> Result<()> {
        let scale = self.scale().ok_or(SubscaleError::NotReady)?;
        self.animate_scale_and_center(scale, center, config)
    }

    pub fn animate_scale_and_center(
        &mut self,
        scale: f64,
        center: Point,
        config: AnimationConfig,
    ) -> Result<()> {
        self.start_animation(
            AnimationTarget {
                scale,
                center,
                focus: None,
            },
            config,
            Instant::now(),
        )
    }

    fn start_animation(
        &mut self,
        target: AnimationTarget,
        config: AnimationConfig,
        now: Instant,
    ) -> Result<()> {
        if !self.is_ready() {
            return Err(SubscaleError::NotReady);
        }
        let (Some(transform), Some(bounds)) = (self.viewport.transform, self.fit_bounds()) else {
            return Err(SubscaleError::NotReady);
        };
        if self.animation.take().is_some() {
            self.events.push(EngineEvent::AnimationInterruptedByNewAnimation);
        }
        self.animation = Some(Animation::plan(transform, &bounds, target, config, now));
        Ok(())
    }

    fn notify_changes(&mut self, before: ViewTransform, origin: ChangeOrigin) {
        let (Some(after), Some(view)) = (self.viewport.transform, self.view_size) else {
            return;
        };
        if after.scale != before.scale {
            self.events.push(EngineEvent::ScaleChanged {
                scale: after.scale,
                origin,
            });
        }
        let (old, new) = (
            before.center(view.width, view.height),
            after.center(view.width, view.height),
        );
        if old != new {
            self.events.push(EngineEvent::CenterChanged { center: new, origin });
        }
    }

    // ------------------------------------------------------------------
    // Host configuration
    // ------------------------------------------------------------------

    /// Viewport size in view pixels. Keeps scale and center across resizes
    /// unless `reset_scale_on_size_change` is set.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        let size = Size::new(width as f64, height as f64);
        if self.view_size == Some(size) {
            return;
        }
        let previous = self.view_size.replace(size);
        if width == 0 || height == 0 {
            self.view_size = None;
            return;
        }
        let (Some(old), Some(transform)) = (previous, self.viewport.transform) else {
            return;
        };
        if self.is_ready() && !self.config.reset_scale_on_size_change {
            self.viewport.pending = Some(PendingView {
                scale: transform.scale,
                center: transform.center(old.width, old.height),
            });
        } else {
            self.reset_scale_and_center();
        }
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        if self.config.orientation == orientation {
            return;
        }
        self.config.orientation = orientation;
        self.reset(false);
    }

    /// Legacy integer orientation codes: -1 (EXIF), 0, 90, 180, 270.
    pub fn set_orientation_code(&mut self, code: i32) -> Result<()> {
        self.set_orientation(Orientation::try_from(code)?);
        Ok(())
    }

    pub fn set_max_scale(&mut self, max_scale: f64) -> Result<()> {
        validate_scale_bounds(max_scale, self.config.min_scale)?;
        self.config.max_scale = max_scale;
        Ok(())
    }

    /// Override the fit-to-viewport minimum scale, or restore it with `None`.
    pub fn set_min_scale(&mut self, min_scale: Option<f64>) -> Result<()> {
        validate_scale_bounds(self.config.max_scale, min_scale)?;
        self.config.min_scale = min_scale;
        Ok(())
    }

    /// Max scale such that the image is never shown below `dpi` pixels per inch.
    pub fn set_minimum_dpi(&mut self, dpi: f64) -> Result<()> {
        self.set_max_scale(self.config.screen_dpi / dpi)
    }

    /// Min scale such that the image is never shown above `dpi` pixels per inch.
    pub fn set_maximum_dpi(&mut self, dpi: f64) -> Result<()> {
        self.set_min_scale(Some(self.config.screen_dpi / dpi))
    }

    pub fn set_double_tap_zoom_dpi(&mut self, dpi: f64) -> Result<()> {
        let scale = self.config.screen_dpi / dpi;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SubscaleError::InvalidScaleBounds(format!(
                "double tap zoom dpi must be positive, got {}",
                dpi
            )));
        }
        self.config.double_tap_zoom_scale = scale;
        Ok(())
    }

    pub fn set_double_tap_zoom_scale(&mut self, scale: f64) -> Result<()> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SubscaleError::InvalidScaleBounds(format!(
                "double tap zoom scale must be positive, got {}",
                scale
            )));
        }
        self.config.double_tap_zoom_scale = scale;
        Ok(())
    }

    pub fn set_double_tap_zoom_style(&mut self, style: ZoomStyle) {
        self.config.double_tap_zoom_style = style;
    }

    pub fn set_double_tap_zoom_duration(&mut self, duration: Duration) {
        self.config.double_tap_zoom_duration_ms = duration.as_millis() as u64;
    }

    pub fn set_pan_limit(&mut self, pan_limit: PanLimit) {
        self.config.pan_limit = pan_limit;
        if let (Some(t), Some(bounds)) = (self.viewport.transform, self.fit_bounds()) {
            self.viewport.transform = Some(bounds.fit(t, true));
            self.refresh_required_tiles(RefreshPass::Load);
        }
    }

    /// Disabling pan re-centers the image.
    pub fn set_pan_enabled(&mut self, enabled: bool) {
        self.config.pan_enabled = enabled;
        if enabled {
            return;
        }
        if let (Some(t), Some(bounds)) = (self.viewport.transform, self.fit_bounds()) {
            let centered = ViewTransform::centered_on(
                bounds.source_center(),
                t.scale,
                bounds.view.width,
                bounds.view.height,
            );
            self.viewport.transform = Some(bounds.fit(centered, true));
            self.refresh_required_tiles(RefreshPass::Load);
        }
    }

    pub fn set_zoom_enabled(&mut self, enabled: bool) {
        self.config.zoom_enabled = enabled;
    }

    pub fn set_eager_loading(&mut self, enabled: bool) {
        self.config.eager_loading = enabled;
    }

    /// Changing the density rebuilds the pyramid, keeping scale and center.
    pub fn set_minimum_tile_dpi(&mut self, dpi: Option<f64>) {
        if self.config.minimum_tile_dpi == dpi {
            return;
        }
        self.config.minimum_tile_dpi = dpi;
        if self.is_ready() {
            let view = self.scale().zip(self.center());
            self.reset(false);
            if let Some((scale, center)) = view {
                self.viewport.pending = Some(PendingView { scale, center });
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Base layer resident and the viewport established.
    pub fn is_ready(&self) -> bool {
        self.ready_sent
            && self.viewport.transform.is_some()
            && self
                .pyramid
                .as_ref()
                .is_some_and(TilePyramid::is_base_layer_ready)
    }

    pub fn is_image_loaded(&self) -> bool {
        self.image_loaded_sent
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Nothing queued: no decodes in flight, no animation, no pending jump.
    pub fn is_settled(&self) -> bool {
        self.loader.in_flight() == 0
            && self.animation.is_none()
            && self.viewport.pending.is_none()
            && (self.source.is_none() || (self.image.is_some() && self.pyramid.is_some()))
    }

    pub fn scale(&self) -> Option<f64> {
        self.viewport.scale()
    }

    pub fn translate(&self) -> Option<Vec2> {
        self.viewport.translate()
    }

    pub fn transform(&self) -> Option<ViewTransform> {
        self.viewport.transform
    }

    /// Source point at the viewport center.
    pub fn center(&self) -> Option<Point> {
        let view = self.view_size?;
        Some(self.viewport.transform?.center(view.width, view.height))
    }

    pub fn min_scale(&self) -> Option<f64> {
        self.fit_bounds().map(|b| b.min_scale())
    }

    pub fn max_scale(&self) -> f64 {
        self.config.max_scale
    }

    /// Displayed source size, after rotation.
    pub fn source_size(&self) -> Option<(u32, u32)> {
        self.geometry().map(|g| (g.width(), g.height()))
    }

    /// Rotation currently applied to the source.
    pub fn applied_rotation(&self) -> Option<Rotation> {
        self.geometry().map(|g| g.rotation)
    }

    pub fn view_to_source(&self, v: Point) -> Option<Point> {
        self.viewport.transform.map(|t| t.view_to_source(v))
    }

    pub fn source_to_view(&self, s: Point) -> Option<Point> {
        self.viewport.transform.map(|t| t.source_to_view(s))
    }

    /// Source rectangle currently shown by the viewport.
    pub fn visible_source_rect(&self) -> Option<Rect> {
        let bounds = self.fit_bounds()?;
        Some(self.viewport.transform?.view_to_source_rect(bounds.view_rect()))
    }

    pub fn state(&self) -> Option<ImageViewState> {
        Some(ImageViewState {
            scale: self.scale()?,
            center: self.center()?,
            orientation: self.config.orientation,
        })
    }

    pub fn pyramid(&self) -> Option<&TilePyramid> {
        self.pyramid.as_ref()
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn geometry(&self) -> Option<ImageGeometry> {
        let image = self.image.as_ref()?;
        Some(ImageGeometry::new(
            image.native_width,
            image.native_height,
            self.config.orientation.resolve(image.exif_rotation),
        ))
    }

    fn fit_bounds(&self) -> Option<FitBounds> {
        let view = self.view_size?;
        let geometry = self.geometry()?;
        Some(FitBounds {
            view,
            source: Size::new(geometry.width() as f64, geometry.height() as f64),
            max_scale: self.config.max_scale,
            min_scale_override: self.config.min_scale,
            pan_limit: self.config.pan_limit,
        })
    }
}
