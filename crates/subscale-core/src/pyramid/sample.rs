use crate::consts::FALLBACK_SAMPLE_SIZE;

/// Largest power-of-two sample size whose decoded resolution still covers
/// the viewport requirement at `scale`. Never below 1.
pub fn ideal_sample_size(source_width: u32, source_height: u32, scale: f64) -> u32 {
    let required_width = (source_width as f64 * scale) as u32;
    let required_height = (source_height as f64 * scale) as u32;
    if required_width == 0 || required_height == 0 {
        return FALLBACK_SAMPLE_SIZE;
    }

    let ratio = (source_width / required_width).min(source_height / required_height);
    let mut power = 1;
    while power * 2 <= ratio {
        power *= 2;
    }
    power
}

/// Sample size of the base layer for an image first shown at `fitted_scale`.
///
/// Halved once above 1 so the base layer is decoded at double the resolution
/// it is first displayed at.
pub fn full_image_sample_size(source_width: u32, source_height: u32, fitted_scale: f64) -> u32 {
    let ideal = ideal_sample_size(source_width, source_height, fitted_scale);
    if ideal > 1 {
        ideal / 2
    } else {
        ideal
    }
}

/// Multiplier applied to the scale before picking a sample size when a
/// minimum tile density is configured.
pub fn tile_density_factor(minimum_tile_dpi: Option<f64>, screen_dpi: f64) -> f64 {
    match minimum_tile_dpi {
        Some(dpi) if dpi > 0.0 && screen_dpi > 0.0 => dpi / screen_dpi,
        _ => 1.0,
    }
}
