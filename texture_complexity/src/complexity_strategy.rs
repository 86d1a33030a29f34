//! Complexity Strategies
//!
//! Interchangeable scorers that turn a [`ProcessedPixelData`] into a single
//! [`ComplexityResult`]. Every strategy combines image-math metrics through
//! the percentile normalizer and clamps its score to `[0, 1]`.
//!
//! ```text
//! Fast          gradient + spatial frequency + color variance
//! HighAccuracy  DCT high-frequency + GLCM (contrast, homogeneity, energy) + entropy
//! Perceptual    variance + edge strength + block detail
//! Combined      weighted blend of the three above
//! NormalMap     see crate::normal_map::analyzer
//! ```

use crate::alpha::ProcessedPixelData;
use crate::image_math::{
    block_variance, color_variance, dct_high_frequency_ratio, glcm_features, grayscale_variance,
    shannon_entropy, sobel_gradient_magnitude, spatial_frequency,
};
use crate::normalize::{
    BLOCK_VARIANCE_BOUNDS, COLOR_VARIANCE_BOUNDS, DCT_HIGH_FREQUENCY_BOUNDS, ENTROPY_BOUNDS,
    GLCM_CONTRAST_BOUNDS, GLCM_DISORDER_BOUNDS, GLCM_HETEROGENEITY_BOUNDS, GRADIENT_BOUNDS,
    GRAYSCALE_VARIANCE_BOUNDS, SPATIAL_FREQUENCY_BOUNDS,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Images with a side below this are not analyzed by Perceptual/NormalMap.
pub const MIN_ANALYZABLE_DIMENSION: u32 = 8;
/// Fewer opaque pixels than this short-circuits Perceptual/NormalMap.
pub const MIN_OPAQUE_PIXELS: usize = 64;
/// Score reported by the short-circuits: no evidence either way.
pub const DEFAULT_SHORT_CIRCUIT_SCORE: f64 = 0.5;
/// Combined weights below this are treated as zero.
pub const WEIGHT_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityResult {
    pub score: f64,
    pub summary: String,
}

impl ComplexityResult {
    /// Clamps `score` into `[0, 1]`; NaN collapses to 0.
    pub fn new(score: f64, summary: impl Into<String>) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            score,
            summary: summary.into(),
        }
    }
}

/// Every complexity scorer implements this.
pub trait ComplexityAnalyzer: Send + Sync {
    fn analyze(&self, data: &ProcessedPixelData) -> ComplexityResult;

    /// Name used in logs and summaries.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Fast,
    HighAccuracy,
    Perceptual,
    Combined,
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fast" => Ok(StrategyKind::Fast),
            "high_accuracy" | "accurate" => Ok(StrategyKind::HighAccuracy),
            "perceptual" => Ok(StrategyKind::Perceptual),
            "combined" => Ok(StrategyKind::Combined),
            other => Err(format!("unknown analysis strategy: {other}")),
        }
    }
}

// ============================================================================
// Weights
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastWeights {
    pub gradient: f64,
    pub spatial_frequency: f64,
    pub color_variance: f64,
}

impl Default for FastWeights {
    fn default() -> Self {
        Self {
            gradient: 0.4,
            spatial_frequency: 0.3,
            color_variance: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighAccuracyWeights {
    pub dct_high_frequency: f64,
    pub glcm_contrast: f64,
    pub glcm_homogeneity: f64,
    pub glcm_energy: f64,
    pub entropy: f64,
}

impl Default for HighAccuracyWeights {
    fn default() -> Self {
        Self {
            dct_high_frequency: 0.25,
            glcm_contrast: 0.2,
            glcm_homogeneity: 0.15,
            glcm_energy: 0.15,
            entropy: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptualWeights {
    pub variance: f64,
    pub edge: f64,
    pub block_detail: f64,
}

impl Default for PerceptualWeights {
    fn default() -> Self {
        Self {
            variance: 0.3,
            edge: 0.4,
            block_detail: 0.3,
        }
    }
}

/// Blend of the three base strategies. All-zero falls back to equal thirds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedWeights {
    pub fast: f64,
    pub high_accuracy: f64,
    pub perceptual: f64,
}

impl Default for CombinedWeights {
    fn default() -> Self {
        Self {
            fast: 0.3,
            high_accuracy: 0.4,
            perceptual: 0.3,
        }
    }
}

impl CombinedWeights {
    pub const EQUAL: CombinedWeights = CombinedWeights {
        fast: 1.0 / 3.0,
        high_accuracy: 1.0 / 3.0,
        perceptual: 1.0 / 3.0,
    };

    pub fn is_degenerate(&self) -> bool {
        self.fast.max(0.0) < WEIGHT_EPSILON
            && self.high_accuracy.max(0.0) < WEIGHT_EPSILON
            && self.perceptual.max(0.0) < WEIGHT_EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyWeights {
    pub fast: FastWeights,
    pub high_accuracy: HighAccuracyWeights,
    pub perceptual: PerceptualWeights,
    pub combined: CombinedWeights,
}

// ============================================================================
// Factory
// ============================================================================

pub fn create_analyzer(kind: StrategyKind, weights: &StrategyWeights) -> Box<dyn ComplexityAnalyzer> {
    match kind {
        StrategyKind::Fast => Box::new(FastAnalyzer::new(weights.fast)),
        StrategyKind::HighAccuracy => Box::new(HighAccuracyAnalyzer::new(weights.high_accuracy)),
        StrategyKind::Perceptual => Box::new(PerceptualAnalyzer::new(weights.perceptual)),
        StrategyKind::Combined => Box::new(CombinedAnalyzer::from_weights(weights)),
    }
}

/// Strategy name without building an instance.
pub fn strategy_name(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::Fast => "Fast",
        StrategyKind::HighAccuracy => "HighAccuracy",
        StrategyKind::Perceptual => "Perceptual",
        StrategyKind::Combined => "Combined",
    }
}

/// Policy short-circuit shared by Perceptual and NormalMap: too small or too
/// sparse to judge.
pub fn short_circuit(data: &ProcessedPixelData, strategy: &str) -> Option<ComplexityResult> {
    if data.width.min(data.height) < MIN_ANALYZABLE_DIMENSION {
        return Some(ComplexityResult::new(
            DEFAULT_SHORT_CIRCUIT_SCORE,
            format!(
                "{strategy}: {}x{} is below the {}px minimum; using default score",
                data.width, data.height, MIN_ANALYZABLE_DIMENSION
            ),
        ));
    }
    if data.opaque_count < MIN_OPAQUE_PIXELS {
        return Some(ComplexityResult::new(
            DEFAULT_SHORT_CIRCUIT_SCORE,
            format!(
                "{strategy}: only {} opaque pixels (need {}); using default score",
                data.opaque_count, MIN_OPAQUE_PIXELS
            ),
        ));
    }
    None
}

fn no_opaque_pixels(strategy: &str) -> ComplexityResult {
    ComplexityResult::new(0.0, format!("{strategy}: no opaque pixels; treated as flat"))
}

// ============================================================================
// Fast
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FastAnalyzer {
    weights: FastWeights,
}

impl FastAnalyzer {
    pub fn new(weights: FastWeights) -> Self {
        Self { weights }
    }
}

impl ComplexityAnalyzer for FastAnalyzer {
    fn analyze(&self, data: &ProcessedPixelData) -> ComplexityResult {
        if data.is_empty() {
            return no_opaque_pixels(self.name());
        }
        let (w, h) = (data.width, data.height);
        let gradient = sobel_gradient_magnitude(&data.grayscale, w, h);
        let frequency = spatial_frequency(&data.grayscale, w, h);
        let variance = color_variance(&data.opaque_pixels);

        let score = self.weights.gradient * GRADIENT_BOUNDS.apply(gradient)
            + self.weights.spatial_frequency * SPATIAL_FREQUENCY_BOUNDS.apply(frequency)
            + self.weights.color_variance * COLOR_VARIANCE_BOUNDS.apply(variance);

        debug!(gradient, frequency, variance, score, "Fast complexity metrics");
        ComplexityResult::new(
            score,
            format!(
                "Fast: gradient {gradient:.3}, spatial frequency {frequency:.3}, color variance {variance:.4} -> {:.3}",
                score.clamp(0.0, 1.0)
            ),
        )
    }

    fn name(&self) -> &'static str {
        "Fast"
    }
}

// ============================================================================
// HighAccuracy
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct HighAccuracyAnalyzer {
    weights: HighAccuracyWeights,
}

impl HighAccuracyAnalyzer {
    pub fn new(weights: HighAccuracyWeights) -> Self {
        Self { weights }
    }
}

impl ComplexityAnalyzer for HighAccuracyAnalyzer {
    fn analyze(&self, data: &ProcessedPixelData) -> ComplexityResult {
        if data.is_empty() {
            return no_opaque_pixels(self.name());
        }
        let (w, h) = (data.width, data.height);
        let dct = dct_high_frequency_ratio(&data.grayscale, w, h);
        let glcm = glcm_features(&data.grayscale, w, h);
        let entropy = shannon_entropy(&data.grayscale);

        let weights = &self.weights;
        let score = weights.dct_high_frequency * DCT_HIGH_FREQUENCY_BOUNDS.apply(dct)
            + weights.glcm_contrast * GLCM_CONTRAST_BOUNDS.apply(glcm.contrast)
            + weights.glcm_homogeneity * GLCM_HETEROGENEITY_BOUNDS.apply(1.0 - glcm.homogeneity)
            + weights.glcm_energy * GLCM_DISORDER_BOUNDS.apply(1.0 - glcm.energy)
            + weights.entropy * ENTROPY_BOUNDS.apply(entropy);

        debug!(
            dct,
            contrast = glcm.contrast,
            homogeneity = glcm.homogeneity,
            energy = glcm.energy,
            entropy,
            score,
            "HighAccuracy complexity metrics"
        );
        ComplexityResult::new(
            score,
            format!(
                "HighAccuracy: DCT high-frequency {dct:.3}, GLCM contrast {:.1} homogeneity {:.3} energy {:.4}, entropy {entropy:.2} bits -> {:.3}",
                glcm.contrast,
                glcm.homogeneity,
                glcm.energy,
                score.clamp(0.0, 1.0)
            ),
        )
    }

    fn name(&self) -> &'static str {
        "HighAccuracy"
    }
}

// ============================================================================
// Perceptual
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PerceptualAnalyzer {
    weights: PerceptualWeights,
}

impl PerceptualAnalyzer {
    pub fn new(weights: PerceptualWeights) -> Self {
        Self { weights }
    }
}

impl ComplexityAnalyzer for PerceptualAnalyzer {
    fn analyze(&self, data: &ProcessedPixelData) -> ComplexityResult {
        if let Some(result) = short_circuit(data, self.name()) {
            return result;
        }
        let (w, h) = (data.width, data.height);
        let variance = grayscale_variance(&data.grayscale);
        let edge = sobel_gradient_magnitude(&data.grayscale, w, h);
        let block = block_variance(&data.grayscale, w, h);

        let score = self.weights.variance * GRAYSCALE_VARIANCE_BOUNDS.apply(variance)
            + self.weights.edge * GRADIENT_BOUNDS.apply(edge)
            + self.weights.block_detail * BLOCK_VARIANCE_BOUNDS.apply(block);

        debug!(variance, edge, block, score, "Perceptual complexity metrics");
        ComplexityResult::new(
            score,
            format!(
                "Perceptual: variance {variance:.4}, edge strength {edge:.3}, block detail {block:.4} -> {:.3}",
                score.clamp(0.0, 1.0)
            ),
        )
    }

    fn name(&self) -> &'static str {
        "Perceptual"
    }
}

// ============================================================================
// Combined
// ============================================================================

pub struct CombinedAnalyzer {
    fast: FastAnalyzer,
    high_accuracy: HighAccuracyAnalyzer,
    perceptual: PerceptualAnalyzer,
    weights: CombinedWeights,
}

impl CombinedAnalyzer {
    pub fn from_weights(weights: &StrategyWeights) -> Self {
        Self {
            fast: FastAnalyzer::new(weights.fast),
            high_accuracy: HighAccuracyAnalyzer::new(weights.high_accuracy),
            perceptual: PerceptualAnalyzer::new(weights.perceptual),
            weights: weights.combined,
        }
    }
}

impl ComplexityAnalyzer for CombinedAnalyzer {
    fn analyze(&self, data: &ProcessedPixelData) -> ComplexityResult {
        let fallback = self.weights.is_degenerate();
        let weights = if fallback {
            CombinedWeights::EQUAL
        } else {
            self.weights
        };
        let (wf, wh, wp) = (
            weights.fast.max(0.0),
            weights.high_accuracy.max(0.0),
            weights.perceptual.max(0.0),
        );

        let fast = self.fast.analyze(data);
        let high = self.high_accuracy.analyze(data);
        let perceptual = self.perceptual.analyze(data);

        let score = (wf * fast.score + wh * high.score + wp * perceptual.score) / (wf + wh + wp);

        let mut summary = format!(
            "Combined: fast {:.3} (w {wf:.2}), high-accuracy {:.3} (w {wh:.2}), perceptual {:.3} (w {wp:.2}) -> {:.3}",
            fast.score,
            high.score,
            perceptual.score,
            score.clamp(0.0, 1.0)
        );
        if fallback {
            summary.push_str("; all weights were ~0, using equal weighting");
        }
        ComplexityResult::new(score, summary)
    }

    fn name(&self) -> &'static str {
        "Combined"
    }
}
