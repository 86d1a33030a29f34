//! Normal Map Handling
//!
//! Compressed normal maps disagree on where X/Y (and optionally signed Z)
//! live. This module detects the packing, rewrites maps to one canonical RGB
//! layout and scores their geometric complexity.

pub mod analyzer;
pub mod layout;
pub mod preprocess;

pub use analyzer::{NormalMapAnalyzer, NormalMapWeights};
pub use layout::{
    classify_layout, detect_layout, explain_layout, matching_rule, LayoutDecision, LayoutRule,
    LayoutSignals, PixelSource, DEFAULT_LAYOUT, LAYOUT_RULES,
};
pub use preprocess::{preprocess_normal_map, renormalize_pixel};

use crate::pixel::Rgba;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel packing of a normal map's X/Y(/Z) data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLayout {
    /// X in red, Y in green; Z reconstructed.
    Rg,
    /// X in alpha, Y in green (red/blue unused).
    Ag,
    /// X, Y and signed Z in red, green, blue.
    Rgb,
}

impl SourceLayout {
    /// True when the alpha channel holds normal data and must survive compression.
    pub fn carries_data_in_alpha(self) -> bool {
        matches!(self, SourceLayout::Ag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceLayout::Rg => "RG",
            SourceLayout::Ag => "AG",
            SourceLayout::Rgb => "RGB",
        }
    }
}

impl fmt::Display for SourceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rg" => Ok(SourceLayout::Rg),
            "ag" => Ok(SourceLayout::Ag),
            "rgb" => Ok(SourceLayout::Rgb),
            other => Err(format!("unknown normal map layout: {other}")),
        }
    }
}

/// `[0, 1]` channel value to `[-1, 1]` component.
#[inline]
pub(crate) fn decode_component(c: f32) -> f64 {
    c as f64 * 2.0 - 1.0
}

#[inline]
pub(crate) fn encode_component(v: f64) -> f32 {
    (v * 0.5 + 0.5) as f32
}

/// Vectors shorter than this are reset to the flat normal.
pub const DEGENERATE_LENGTH: f64 = 1e-6;

/// Unit length, or flat (+Z) when `v` is degenerate.
#[inline]
pub(crate) fn unit_or_flat(v: DVec3) -> DVec3 {
    if v.length() < DEGENERATE_LENGTH {
        DVec3::Z
    } else {
        v.normalize()
    }
}

/// Encodes a unit vector as canonical RGB with full opacity.
#[inline]
pub(crate) fn encode_normal(n: DVec3) -> Rgba {
    Rgba::new(encode_component(n.x), encode_component(n.y), encode_component(n.z), 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_parsing_and_display() {
        assert_eq!("AG".parse::<SourceLayout>(), Ok(SourceLayout::Ag));
        assert_eq!("rgb".parse::<SourceLayout>(), Ok(SourceLayout::Rgb));
        assert!("xyz".parse::<SourceLayout>().is_err());
        assert_eq!(SourceLayout::Rg.to_string(), "RG");
    }

    #[test]
    fn test_component_coding() {
        assert_eq!(decode_component(0.5), 0.0);
        assert_eq!(decode_component(1.0), 1.0);
        assert_eq!(encode_component(-1.0), 0.0);
        assert!(SourceLayout::Ag.carries_data_in_alpha());
        assert!(!SourceLayout::Rgb.carries_data_in_alpha());
    }

    #[test]
    fn test_unit_or_flat() {
        assert_eq!(unit_or_flat(DVec3::ZERO), DVec3::Z);
        assert_eq!(unit_or_flat(DVec3::new(1e-7, 0.0, 0.0)), DVec3::Z);
        let n = unit_or_flat(DVec3::new(3.0, 0.0, 4.0));
        assert!((n - DVec3::new(0.6, 0.0, 0.8)).length() < 1e-12);
    }
}
