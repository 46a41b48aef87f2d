use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_ANIMATION_DURATION_MS, DEFAULT_DOUBLE_TAP_ZOOM_SCALE, DEFAULT_MAX_SCALE,
    DEFAULT_MAX_TILE_DIMENSION, DEFAULT_SCREEN_DPI,
};
use crate::error::{Result, SubscaleError};
use crate::gesture::ZoomStyle;
use crate::orientation::Orientation;
use crate::pyramid::TileLimits;
use crate::viewport::PanLimit;

/// Engine settings. Every field has a default, so a TOML file only needs the
/// values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub orientation: Orientation,
    pub max_scale: f64,
    /// Overrides the fit-to-viewport minimum scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<f64>,
    pub pan_limit: PanLimit,
    pub pan_enabled: bool,
    pub zoom_enabled: bool,
    pub double_tap_zoom_scale: f64,
    pub double_tap_zoom_style: ZoomStyle,
    pub double_tap_zoom_duration_ms: u64,
    pub max_tile_width: u32,
    pub max_tile_height: u32,
    /// Load coarser tiles on dense screens: tiles never exceed this density.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_tile_dpi: Option<f64>,
    pub screen_dpi: f64,
    /// Decode tiles during gestures instead of waiting for release.
    pub eager_loading: bool,
    pub reset_scale_on_size_change: bool,
    /// Decode threads. 1 decodes tiles one at a time; 0 uses one per core.
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Deg0,
            max_scale: DEFAULT_MAX_SCALE,
            min_scale: None,
            pan_limit: PanLimit::Inside,
            pan_enabled: true,
            zoom_enabled: true,
            double_tap_zoom_scale: DEFAULT_DOUBLE_TAP_ZOOM_SCALE,
            double_tap_zoom_style: ZoomStyle::Fixed,
            double_tap_zoom_duration_ms: DEFAULT_ANIMATION_DURATION_MS,
            max_tile_width: DEFAULT_MAX_TILE_DIMENSION,
            max_tile_height: DEFAULT_MAX_TILE_DIMENSION,
            minimum_tile_dpi: None,
            screen_dpi: DEFAULT_SCREEN_DPI,
            eager_loading: true,
            reset_scale_on_size_change: false,
            worker_threads: 1,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        validate_scale_bounds(self.max_scale, self.min_scale)?;
        if !(self.double_tap_zoom_scale.is_finite() && self.double_tap_zoom_scale > 0.0) {
            return Err(SubscaleError::InvalidScaleBounds(format!(
                "double tap zoom scale must be positive, got {}",
                self.double_tap_zoom_scale
            )));
        }
        if self.max_tile_width == 0 || self.max_tile_height == 0 {
            return Err(SubscaleError::InvalidDimensions {
                width: self.max_tile_width,
                height: self.max_tile_height,
            });
        }
        if !(self.screen_dpi.is_finite() && self.screen_dpi > 0.0) {
            return Err(SubscaleError::InvalidScaleBounds(format!(
                "screen dpi must be positive, got {}",
                self.screen_dpi
            )));
        }
        if let Some(dpi) = self.minimum_tile_dpi {
            if !(dpi.is_finite() && dpi > 0.0) {
                return Err(SubscaleError::InvalidScaleBounds(format!(
                    "minimum tile dpi must be positive, got {}",
                    dpi
                )));
            }
        }
        Ok(())
    }

    pub fn tile_limits(&self) -> TileLimits {
        TileLimits {
            max_width: self.max_tile_width,
            max_height: self.max_tile_height,
        }
    }
}

pub(crate) fn validate_scale_bounds(max_scale: f64, min_scale: Option<f64>) -> Result<()> {
    if !(max_scale.is_finite() && max_scale > 0.0) {
        return Err(SubscaleError::InvalidScaleBounds(format!(
            "max scale must be positive, got {}",
            max_scale
        )));
    }
    if let Some(min) = min_scale {
        if !(min.is_finite() && min > 0.0 && min <= max_scale) {
            return Err(SubscaleError::InvalidScaleBounds(format!(
                "min scale {} must be in (0, {}]",
                min, max_scale
            )));
        }
    }
    Ok(())
}
