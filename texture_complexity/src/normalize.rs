//! Percentile Normalizer
//!
//! Maps raw metric values into `[0, 1]` between a low and a high percentile so
//! heterogeneous metrics can be weighted against each other. The bounds below
//! were calibrated so typical game textures land inside the range instead of
//! clipping.

/// Low/high percentile pair for one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileBounds {
    pub low: f64,
    pub high: f64,
}

impl PercentileBounds {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        normalize(value, self.low, self.high)
    }
}

// Grayscale and color metrics (values are on [0, 1] channel scale).
pub const GRADIENT_BOUNDS: PercentileBounds = PercentileBounds::new(0.0, 0.6);
pub const SPATIAL_FREQUENCY_BOUNDS: PercentileBounds = PercentileBounds::new(0.0, 0.3);
pub const COLOR_VARIANCE_BOUNDS: PercentileBounds = PercentileBounds::new(0.0, 0.06);
pub const GRAYSCALE_VARIANCE_BOUNDS: PercentileBounds = PercentileBounds::new(0.0, 0.06);
pub const BLOCK_VARIANCE_BOUNDS: PercentileBounds = PercentileBounds::new(0.0, 0.02);

pub const DCT_HIGH_FREQUENCY_BOUNDS: PercentileBounds = PercentileBounds::new(0.02, 0.5);
/// GLCM contrast in quantized gray levels squared.
pub const GLCM_CONTRAST_BOUNDS: PercentileBounds = PercentileBounds::new(0.0, 600.0);
/// Applied to `1 - homogeneity`.
pub const GLCM_HETEROGENEITY_BOUNDS: PercentileBounds = PercentileBounds::new(0.0, 0.85);
/// Applied to `1 - energy`.
pub const GLCM_DISORDER_BOUNDS: PercentileBounds = PercentileBounds::new(0.0, 0.98);
/// Bits over 256 bins.
pub const ENTROPY_BOUNDS: PercentileBounds = PercentileBounds::new(1.0, 7.5);

// Normal-map metrics (unit vector space).
pub const NORMAL_TILT_BOUNDS: PercentileBounds = PercentileBounds::new(0.005, 0.25);
pub const NORMAL_SPREAD_BOUNDS: PercentileBounds = PercentileBounds::new(0.002, 0.2);
pub const NORMAL_NEIGHBOR_BOUNDS: PercentileBounds = PercentileBounds::new(0.001, 0.08);

/// `0` at or below `low`, `1` at or above `high`, linear in between.
///
/// `low < high` is a caller contract; the constants above are the only callers
/// in this crate.
#[inline]
pub fn normalize(value: f64, low: f64, high: f64) -> f64 {
    debug_assert!(low < high, "percentile bounds inverted: {low} >= {high}");
    if value <= low {
        0.0
    } else if value >= high {
        1.0
    } else {
        (value - low) / (high - low)
    }
}
