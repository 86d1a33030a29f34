//! Analysis Configuration
//!
//! Everything the engine reads but never writes: strategy selection, weights,
//! thresholds, divisor and resolution bounds, and the format policy. Shared
//! read-only across batch workers.

use crate::complexity_strategy::{StrategyKind, StrategyWeights};
use crate::divisor::ResolutionPolicy;
use crate::errors::{Result, TextureError};
use crate::format_selector::FormatPolicy;
use crate::normal_map::NormalMapWeights;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub strategy: StrategyKind,
    pub weights: StrategyWeights,
    pub normal_map_weights: NormalMapWeights,
    /// At or below: compress with `max_divisor`.
    pub low_threshold: f64,
    /// At or above: keep `min_divisor`.
    pub high_threshold: f64,
    pub min_divisor: u32,
    pub max_divisor: u32,
    pub resolution: ResolutionPolicy,
    pub format: FormatPolicy,
    /// Rewrite normal maps to canonical RGB before scoring.
    pub renormalize_normal_maps: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            weights: StrategyWeights::default(),
            normal_map_weights: NormalMapWeights::default(),
            low_threshold: 0.2,
            high_threshold: 0.7,
            min_divisor: 1,
            max_divisor: 8,
            resolution: ResolutionPolicy::default(),
            format: FormatPolicy::default(),
            renormalize_normal_maps: true,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Rejects threshold and divisor orderings the mapper cannot honor.
    /// Only files are checked here; programmatic configs are trusted.
    pub fn validate(&self) -> Result<()> {
        if !(self.low_threshold < self.high_threshold) {
            return Err(TextureError::Config(format!(
                "low_threshold ({}) must be below high_threshold ({})",
                self.low_threshold, self.high_threshold
            )));
        }
        if self.min_divisor == 0 || self.min_divisor > self.max_divisor {
            return Err(TextureError::Config(format!(
                "divisor range [{}, {}] is invalid",
                self.min_divisor, self.max_divisor
            )));
        }
        if self.resolution.min_resolution > self.resolution.max_resolution {
            return Err(TextureError::Config(format!(
                "min_resolution ({}) exceeds max_resolution ({})",
                self.resolution.min_resolution, self.resolution.max_resolution
            )));
        }
        Ok(())
    }
}
