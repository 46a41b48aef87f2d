mod common;

use std::sync::atomic::Ordering;
use std::time::Instant;

use approx::assert_relative_eq;
use image::{Rgba, RgbaImage};
use kurbo::Point;
use subscale_core::animation::AnimationConfig;
use subscale_core::geometry::SourceRect;
use subscale_core::gesture::{PointerEvent, PointerKind};
use subscale_core::orientation::{Orientation, Rotation};
use subscale_core::pyramid::TileKey;
use subscale_core::render::SoftwareSurface;
use subscale_core::{ChangeOrigin, EngineConfig, EngineEvent, ImageViewEngine, SubscaleError};

use common::{pump, ready_engine, settle, synthetic_engine};

fn small_tiles() -> EngineConfig {
    EngineConfig {
        max_tile_width: 100,
        max_tile_height: 100,
        ..EngineConfig::default()
    }
}

fn assert_center(engine: &ImageViewEngine, x: f64, y: f64) {
    let center = engine.center().expect("center");
    assert_relative_eq!(center.x, x, epsilon = 1e-6);
    assert_relative_eq!(center.y, y, epsilon = 1e-6);
}

// ---------------------------------------------------------------------------
// Loading and readiness
// ---------------------------------------------------------------------------

#[test]
fn test_ready_then_image_loaded_once_base_layer_is_resident() {
    let (mut engine, _log) = synthetic_engine(EngineConfig::default(), 400, 300, None);
    engine.set_viewport_size(100, 80);
    engine.set_image("synthetic.png", None);
    assert!(!engine.is_ready());

    let events = settle(&mut engine);
    let ready = events.iter().position(|e| matches!(e, EngineEvent::Ready));
    let loaded = events.iter().position(|e| matches!(e, EngineEvent::ImageLoaded));
    assert!(ready.is_some() && loaded.is_some());
    assert!(ready < loaded, "Ready must precede ImageLoaded: {:?}", events);

    assert!(engine.is_image_loaded());
    assert_relative_eq!(engine.scale().unwrap(), 0.25);
    assert_center(&engine, 200.0, 150.0);
    assert_eq!(engine.stats().applied, 1);

    // A further tick emits nothing new.
    engine.tick(Instant::now());
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_fit_scale_and_base_sample_size_for_large_source() {
    let (mut engine, _log) = synthetic_engine(EngineConfig::default(), 4000, 3000, None);
    engine.set_viewport_size(1000, 800);
    engine.set_image("large.jpg", None);
    settle(&mut engine);

    assert_relative_eq!(engine.min_scale().unwrap(), 0.25);
    assert_relative_eq!(engine.scale().unwrap(), 0.25);
    let pyramid = engine.pyramid().unwrap();
    // Ideal sample size at 0.25 is 4; the base layer is decoded at twice that resolution.
    assert_eq!(pyramid.full_sample_size(), 2);
    assert_eq!(pyramid.levels().len(), 2);
}

#[test]
fn test_load_error_is_reported() {
    let (mut engine, _log) = synthetic_engine(EngineConfig::default(), 400, 300, None);
    engine.set_viewport_size(100, 80);
    engine.set_image("missing.png", None);

    let events = pump(&mut engine, |_, events| {
        events.iter().any(|e| matches!(e, EngineEvent::ImageLoadError(_)))
    });
    assert!(!events.iter().any(|e| matches!(e, EngineEvent::Ready)));
    assert!(!engine.is_ready());
    assert!(engine.source().is_none());
    assert!(engine.is_settled());
}

#[test]
fn test_draw_before_ready_draws_nothing() {
    let (mut engine, log) = synthetic_engine(EngineConfig::default(), 400, 300, None);
    log.gate.close();
    engine.set_viewport_size(100, 80);
    engine.set_image("synthetic.png", None);
    pump(&mut engine, |e, _| e.pyramid().is_some());

    let mut surface = SoftwareSurface::new(100, 80);
    assert_eq!(engine.draw(&mut surface), 0);
    log.gate.open();
    settle(&mut engine);
    assert_eq!(engine.draw(&mut surface), 1);
}

// ---------------------------------------------------------------------------
// Decode failures
// ---------------------------------------------------------------------------

#[test]
fn test_failed_base_tile_is_retried_until_ready() {
    let (mut engine, log) = synthetic_engine(EngineConfig::default(), 400, 300, None);
    log.fail_next.store(1, Ordering::SeqCst);
    engine.set_viewport_size(100, 80);
    engine.set_image("synthetic.png", None);
    let events = settle(&mut engine);

    let failed_at = events
        .iter()
        .position(|e| matches!(e, EngineEvent::TileLoadError { key, .. } if key.sample_size == 2))
        .expect("tile load error");
    let ready_at = events
        .iter()
        .position(|e| matches!(e, EngineEvent::Ready))
        .expect("ready");
    assert!(failed_at < ready_at);
    assert!(engine.is_ready());
    assert_eq!(log.call_count(), 2);
    assert_eq!(engine.stats().failed, 1);
    assert_eq!(engine.stats().applied, 1);
}

#[test]
fn test_undecodable_tile_reports_error_and_base_layer_shows_through() {
    let (mut engine, log) = ready_engine(EngineConfig::default());
    let broken = SourceRect::new(100, 75, 200, 150);
    log.fail_rects.lock().unwrap().push(broken);

    engine.set_scale_and_center(1.0, Point::new(200.0, 150.0));
    let events = pump(&mut engine, |e, _| e.stats().failed >= 1 && e.is_settled());

    let index = engine
        .pyramid()
        .unwrap()
        .level(1)
        .unwrap()
        .tiles
        .iter()
        .position(|t| t.source_rect == broken)
        .unwrap();
    let key = TileKey {
        sample_size: 1,
        index,
    };
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::TileLoadError { key: k, error: SubscaleError::Decode(_) } if *k == key
    )));
    let tile = engine.pyramid().unwrap().tile(key).unwrap();
    assert!(!tile.loading);
    assert!(tile.bitmap.is_none());
    assert!(tile.visible);

    // Base layer plus the three native tiles that did decode.
    let mut surface = SoftwareSurface::new(100, 80);
    assert_eq!(engine.draw(&mut surface), 4);

    // The next load pass retries it.
    log.fail_rects.lock().unwrap().clear();
    engine.set_scale_and_center(1.0, Point::new(200.0, 150.0));
    settle(&mut engine);
    assert!(engine.pyramid().unwrap().tile(key).unwrap().is_resident());
    assert_eq!(log.calls_for(broken), 2);
    assert_eq!(engine.draw(&mut surface), 4);
}

// ---------------------------------------------------------------------------
// Tile scheduling
// ---------------------------------------------------------------------------

#[test]
fn test_zoom_loads_only_tiles_touching_viewport() {
    let (mut engine, log) = ready_engine(EngineConfig::default());
    engine.set_scale_and_center(1.0, Point::new(50.0, 37.5));
    settle(&mut engine);

    assert_relative_eq!(engine.scale().unwrap(), 1.0);
    let translate = engine.translate().unwrap();
    assert_relative_eq!(translate.x, 0.0);
    assert_relative_eq!(translate.y, 0.0);

    // Native level is 4x4 tiles of 100x75; the 100x80 view touches a 2x2 block.
    let native_calls = log
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, sample)| *sample == 1)
        .count();
    assert_eq!(native_calls, 4);
    assert_eq!(engine.stats().applied, 5);

    let mut surface = SoftwareSurface::new(100, 80);
    assert_eq!(engine.draw(&mut surface), 4);
}

#[test]
fn test_zoom_out_releases_fine_tiles() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.set_scale_and_center(1.0, Point::new(200.0, 150.0));
    settle(&mut engine);
    assert!(engine.pyramid().unwrap().resident_count() > 1);

    engine.reset_scale_and_center();
    settle(&mut engine);
    assert_relative_eq!(engine.scale().unwrap(), 0.25);
    assert_eq!(engine.pyramid().unwrap().resident_count(), 1);
}

#[test]
fn test_tile_is_never_scheduled_twice() {
    let (mut engine, log) = synthetic_engine(small_tiles(), 400, 300, None);
    log.gate.close();
    engine.set_viewport_size(100, 80);
    engine.set_image("synthetic.png", None);
    pump(&mut engine, |e, _| e.pyramid().is_some());

    assert_eq!(engine.in_flight(), 4);
    for _ in 0..5 {
        engine.tick(Instant::now());
    }
    assert_eq!(engine.in_flight(), 4);
    assert_eq!(engine.pyramid().unwrap().loading_count(), 4);

    log.gate.open();
    settle(&mut engine);
    assert_eq!(log.call_count(), 4);
    assert_eq!(engine.stats().scheduled, 4);
}

#[test]
fn test_decodes_on_one_decoder_are_serialized() {
    let config = EngineConfig {
        worker_threads: 4,
        ..small_tiles()
    };
    let (mut engine, log) = synthetic_engine(config, 400, 300, None);
    engine.set_viewport_size(100, 80);
    engine.set_image("synthetic.png", None);
    settle(&mut engine);
    engine.set_scale_and_center(2.0, Point::new(200.0, 150.0));
    settle(&mut engine);

    assert!(log.call_count() > 4);
    assert_eq!(log.max_active.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn test_stale_results_are_discarded_after_new_source() {
    let (mut engine, log) = synthetic_engine(small_tiles(), 400, 300, None);
    log.gate.close();
    engine.set_viewport_size(100, 80);
    engine.set_image("first.png", None);
    pump(&mut engine, |e, _| e.pyramid().is_some());
    assert_eq!(engine.in_flight(), 4);

    engine.set_image("second.png", None);
    log.gate.open();
    settle(&mut engine);

    let stats = engine.stats();
    assert_eq!(stats.discarded_stale, 4);
    // Only the second source's base layer was applied.
    assert_eq!(stats.applied, 4);
    assert_eq!(engine.source().unwrap().to_str(), Some("second.png"));
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

#[test]
fn test_orientation_change_rebuilds_pyramid() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.set_orientation(Orientation::Deg90);
    assert!(engine.pyramid().is_none());
    settle(&mut engine);

    assert_eq!(engine.source_size(), Some((300, 400)));
    assert_eq!(engine.applied_rotation(), Some(Rotation::Deg90));
    let base = engine
        .pyramid()
        .unwrap()
        .tile(TileKey { sample_size: 2, index: 0 })
        .unwrap();
    let bitmap = base.bitmap.as_ref().unwrap();
    assert_eq!(bitmap.dimensions(), (150, 200));
}

#[test]
fn test_orientation_code_rejects_unknown_values() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    assert!(matches!(
        engine.set_orientation_code(45),
        Err(SubscaleError::InvalidOrientation(45))
    ));
    assert!(engine.set_orientation_code(180).is_ok());
    assert_eq!(engine.config().orientation, Orientation::Deg180);
}

#[test]
fn test_exif_rotation_is_applied_when_requested() {
    let config = EngineConfig {
        orientation: Orientation::UseExif,
        ..EngineConfig::default()
    };
    let (mut engine, _log) = synthetic_engine(config, 400, 300, Some(Rotation::Deg270));
    engine.set_viewport_size(100, 80);
    engine.set_image("photo.jpg", None);
    settle(&mut engine);

    assert_eq!(engine.source_size(), Some((300, 400)));
    assert_eq!(engine.applied_rotation(), Some(Rotation::Deg270));
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

#[test]
fn test_saved_state_is_restored_on_load() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.set_scale_and_center(1.0, Point::new(100.0, 100.0));
    settle(&mut engine);
    let state = engine.state().unwrap();

    engine.set_image("synthetic.png", Some(state));
    settle(&mut engine);
    assert_relative_eq!(engine.scale().unwrap(), 1.0);
    assert_center(&engine, 100.0, 100.0);
}

#[test]
fn test_resize_keeps_scale_and_center() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.set_scale_and_center(1.0, Point::new(200.0, 150.0));
    settle(&mut engine);

    engine.set_viewport_size(120, 90);
    settle(&mut engine);
    assert_relative_eq!(engine.scale().unwrap(), 1.0);
    assert_center(&engine, 200.0, 150.0);
}

#[test]
fn test_resize_resets_when_configured() {
    let config = EngineConfig {
        reset_scale_on_size_change: true,
        ..EngineConfig::default()
    };
    let (mut engine, _log) = ready_engine(config);
    engine.set_scale_and_center(1.0, Point::new(200.0, 150.0));
    settle(&mut engine);

    engine.set_viewport_size(120, 90);
    settle(&mut engine);
    assert_relative_eq!(engine.scale().unwrap(), 0.3, epsilon = 1e-9);
}

#[test]
fn test_disabling_pan_recenters() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.set_scale_and_center(1.0, Point::new(100.0, 100.0));
    settle(&mut engine);

    engine.set_pan_enabled(false);
    assert_center(&engine, 200.0, 150.0);
}

#[test]
fn test_dpi_setters_map_to_scale_limits() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.set_minimum_dpi(80.0).unwrap();
    assert_relative_eq!(engine.max_scale(), 2.0);
    engine.set_maximum_dpi(320.0).unwrap();
    assert_relative_eq!(engine.min_scale().unwrap(), 0.5);
    assert!(matches!(
        engine.set_max_scale(0.1),
        Err(SubscaleError::InvalidScaleBounds(_))
    ));
    engine.set_min_scale(None).unwrap();
    assert_relative_eq!(engine.min_scale().unwrap(), 0.25);
}

#[test]
fn test_minimum_tile_dpi_rebuilds_base_layer_and_keeps_view() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.set_scale_and_center(0.5, Point::new(150.0, 120.0));
    settle(&mut engine);
    assert_eq!(engine.pyramid().unwrap().full_sample_size(), 2);

    // Half the screen density: the fitted 0.25 scale is loaded as if it were 0.125.
    engine.set_minimum_tile_dpi(Some(80.0));
    assert!(!engine.is_ready());
    settle(&mut engine);

    let pyramid = engine.pyramid().unwrap();
    assert_eq!(pyramid.full_sample_size(), 4);
    assert_eq!(pyramid.levels().len(), 3);
    assert_relative_eq!(engine.scale().unwrap(), 0.5, epsilon = 1e-9);
    assert_center(&engine, 150.0, 120.0);
}

// ---------------------------------------------------------------------------
// Animations
// ---------------------------------------------------------------------------

#[test]
fn test_animation_before_ready_fails() {
    let (mut engine, _log) = synthetic_engine(EngineConfig::default(), 400, 300, None);
    let result = engine.animate_scale(1.0, AnimationConfig::default());
    assert!(matches!(result, Err(SubscaleError::NotReady)));
}

#[test]
fn test_animation_reaches_target() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine
        .animate_scale_and_center(1.0, Point::new(200.0, 150.0), AnimationConfig::default())
        .unwrap();
    assert!(engine.is_animating());

    let events = pump(&mut engine, |_, events| {
        events.iter().any(|e| matches!(e, EngineEvent::AnimationComplete))
    });
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::ScaleChanged {
            origin: ChangeOrigin::Animation,
            ..
        }
    )));
    assert!(!engine.is_animating());
    assert_relative_eq!(engine.scale().unwrap(), 1.0, epsilon = 1e-9);
    assert_center(&engine, 200.0, 150.0);
}

#[test]
fn test_new_animation_interrupts_running_one() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.animate_scale(1.0, AnimationConfig::default()).unwrap();
    engine.animate_scale(2.0, AnimationConfig::default()).unwrap();
    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::AnimationInterruptedByNewAnimation)));
}

#[test]
fn test_touch_interrupts_interruptible_animation() {
    let (mut engine, _log) = ready_engine(EngineConfig::default());
    engine.animate_scale(1.0, AnimationConfig::default()).unwrap();
    let down = PointerEvent::new(PointerKind::Down, 0, Point::new(10.0, 10.0), Instant::now());
    assert!(engine.on_pointer_event(down));
    assert!(!engine.is_animating());
    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::AnimationInterruptedByUser)));
}

// ---------------------------------------------------------------------------
// Real files
// ---------------------------------------------------------------------------

#[test]
fn test_png_source_renders_through_default_decoders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("halves.png");
    RgbaImage::from_fn(64, 48, |x, _| {
        if x < 32 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    })
    .save(&path)
    .unwrap();

    let mut engine = ImageViewEngine::new(EngineConfig::default()).unwrap();
    engine.set_viewport_size(32, 24);
    engine.set_image(&path, None);
    settle(&mut engine);

    let mut surface = SoftwareSurface::new(32, 24);
    assert_eq!(engine.draw(&mut surface), 1);
    let img = surface.into_image();
    assert_eq!(img.get_pixel(4, 12).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(28, 12).0, [0, 0, 255, 255]);
}

#[test]
fn test_ser_source_renders_first_frame() {
    let file = common::write_test_ser(&common::build_gradient_ser(64, 48));
    let mut engine = ImageViewEngine::new(EngineConfig::default()).unwrap();
    engine.set_viewport_size(32, 24);
    engine.set_image(file.path(), None);
    settle(&mut engine);

    assert_eq!(engine.source_size(), Some((64, 48)));
    let mut surface = SoftwareSurface::new(32, 24);
    assert_eq!(engine.draw(&mut surface), 1);
    // View (3, 2) samples source (7, 5): 7 + 5 * 64 = 327, wrapped to 71.
    assert_eq!(surface.image().get_pixel(3, 2).0, [71, 71, 71, 255]);
}
