//! Intensity windowing of a single displayed slice.
//!
//! The threshold slider shifts every pixel by a bias derived from the
//! slice's own maximum and then clips back into the slice's original
//! range, so contrast always follows the displayed slice and never the
//! whole volume.

use ndarray::{Array2, ArrayView2};

/// Neutral slider position: zero bias.
pub const NEUTRAL_THRESHOLD: u8 = 50;

/// Minimum and maximum of a grid, `None` for an empty grid.
pub fn min_max(grid: &ArrayView2<'_, f32>) -> Option<(f32, f32)> {
    if grid.is_empty() {
        return None;
    }
    Some(grid.fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
        (min.min(v), max.max(v))
    }))
}

/// Maps a threshold in `[0, 100]` to a bias in `[-img_max, img_max]`.
#[inline]
pub fn threshold_bias(img_max: f32, threshold_percent: u8) -> f32 {
    img_max * (2.0 * f32::from(threshold_percent) / 100.0 - 1.0)
}

/// Adds `bias` to every pixel and clips the result to the grid's original range.
pub fn filter_image(grid: &ArrayView2<'_, f32>, bias: f32) -> Array2<f32> {
    let Some((img_min, img_max)) = min_max(grid) else {
        return grid.to_owned();
    };
    // all-NaN grids fold to (INF, -INF)
    if !(img_min <= img_max) {
        return grid.to_owned();
    }
    grid.mapv(|v| (v + bias).clamp(img_min, img_max))
}

/// Rescales a grid linearly into `[0, 1]`.
///
/// A flat grid has no range to stretch and comes back as all zeros.
pub fn normalize_image(grid: &ArrayView2<'_, f32>) -> Array2<f32> {
    let Some((min, max)) = min_max(grid) else {
        return grid.to_owned();
    };
    let range = max - min;
    if !(range > 0.0) {
        log::warn!("Degenerate slice with range [{min}, {max}], rendering as zeros");
        return Array2::zeros(grid.raw_dim());
    }
    grid.mapv(|v| (v - min) / range)
}

/// Bias, clip and normalize a displayed slice for the given threshold.
///
/// The bias is taken from the maximum of `grid` itself, so for coronal and
/// sagittal views it follows the resampled grid rather than the raw plane.
pub fn window(grid: &ArrayView2<'_, f32>, threshold_percent: u8) -> Array2<f32> {
    let img_max = min_max(grid).map_or(0.0, |(_, max)| max);
    let bias = threshold_bias(img_max, threshold_percent);
    normalize_image(&filter_image(grid, bias).view())
}
