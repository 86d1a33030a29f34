//! Normal Map Channel-Layout Detection
//!
//! Two-channel formats are unambiguous. Three/four-channel formats depend on
//! how the encoder packed the data, so the layout is inferred from pixel
//! statistics and an ordered rule cascade. The first matching rule wins and
//! later rules deliberately override earlier general cases for specific
//! evidence patterns, so the order of [`LAYOUT_RULES`] must not change.
//!
//! When the evidence is inconclusive, or the pixels cannot be read, the
//! result is [`DEFAULT_LAYOUT`] (AG), the most common compressed-normal
//! convention in existing content.

use super::{decode_component, SourceLayout};
use crate::errors::Result;
use crate::format_selector::TextureFormat;
use crate::pixel::{PixelBuffer, Rgba};
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, warn};

pub const DEFAULT_LAYOUT: SourceLayout = SourceLayout::Ag;

/// Upper bound on pixels inspected per texture.
pub const MAX_LAYOUT_SAMPLES: usize = 4096;

/// Slack on the unit-disk test for quantized XY pairs.
pub const VALID_XY_TOLERANCE: f64 = 0.05;
/// Channel level counted as saturated (placeholder R/B under AG packing).
pub const SATURATION_LEVEL: f32 = 0.95;
/// Allowed gap between stored |Z| and Z reconstructed from (R, G).
pub const Z_TOLERANCE: f64 = 0.1;
/// Stored Z within this of zero carries no sign.
pub const Z_SIGN_EPSILON: f64 = 0.05;
/// Per-pixel alpha counted as opaque.
pub const OPAQUE_ALPHA_LEVEL: f32 = 0.95;

// Rule thresholds (ratios over the sample).
const STRONG_AG_SATURATED_RATIO: f64 = 0.9;
const STRONG_AG_VALID_RATIO: f64 = 0.9;
const DOMINANCE_MARGIN: f64 = 0.25;
const AG_DOMINANT_MIN_VALID: f64 = 0.8;
const MIXED_SIGN_MIN_RATIO: f64 = 0.05;
const RGB_CONSISTENT_RATIO: f64 = 0.6;
const RG_OVER_RGB_MARGIN: f64 = 0.25;
const NEGATIVE_Z_MIN_RATIO: f64 = 0.2;
const OPAQUE_ALPHA_RATIO: f64 = 0.95;
const RG_VALID_HIGH_RATIO: f64 = 0.9;
const NON_OPAQUE_MEAN_ALPHA: f64 = 0.99;
const RGB_STRONG_CONSISTENT_RATIO: f64 = 0.9;

/// Anything that can hand over a texture's pixels for inspection.
pub trait PixelSource {
    fn read_pixels(&self) -> Result<Cow<'_, [Rgba]>>;
}

impl PixelSource for PixelBuffer {
    fn read_pixels(&self) -> Result<Cow<'_, [Rgba]>> {
        Ok(Cow::Borrowed(self.pixels()))
    }
}

/// Evidence ratios measured over a bounded, strided sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutSignals {
    pub sample_count: usize,
    /// (R, G) lies in the unit disk.
    pub rg_valid: f64,
    /// (A, G) lies in the unit disk.
    pub ag_valid: f64,
    /// R and B both near 1.
    pub rb_saturated: f64,
    /// |stored Z| agrees with Z reconstructed from (R, G).
    pub z_consistent: f64,
    pub z_positive: f64,
    pub z_negative: f64,
    pub alpha_opaque: f64,
    pub mean_alpha: f64,
}

impl LayoutSignals {
    pub fn measure(pixels: &[Rgba]) -> Option<Self> {
        if pixels.is_empty() {
            return None;
        }
        let stride = pixels.len().div_ceil(MAX_LAYOUT_SAMPLES).max(1);

        let mut n = 0usize;
        let mut rg_valid = 0usize;
        let mut ag_valid = 0usize;
        let mut rb_saturated = 0usize;
        let mut z_consistent = 0usize;
        let mut z_positive = 0usize;
        let mut z_negative = 0usize;
        let mut alpha_opaque = 0usize;
        let mut alpha_sum = 0.0f64;

        for p in pixels.iter().step_by(stride).take(MAX_LAYOUT_SAMPLES) {
            n += 1;
            let x = decode_component(p.r);
            let y = decode_component(p.g);
            let ax = decode_component(p.a);

            let rg_len2 = x * x + y * y;
            if rg_len2 <= 1.0 + VALID_XY_TOLERANCE {
                rg_valid += 1;
            }
            if ax * ax + y * y <= 1.0 + VALID_XY_TOLERANCE {
                ag_valid += 1;
            }
            if p.r >= SATURATION_LEVEL && p.b >= SATURATION_LEVEL {
                rb_saturated += 1;
            }

            let stored_z = decode_component(p.b);
            let rebuilt_z = (1.0 - rg_len2).max(0.0).sqrt();
            if (stored_z.abs() - rebuilt_z).abs() <= Z_TOLERANCE {
                z_consistent += 1;
                if stored_z > Z_SIGN_EPSILON {
                    z_positive += 1;
                } else if stored_z < -Z_SIGN_EPSILON {
                    z_negative += 1;
                }
            }

            if p.a >= OPAQUE_ALPHA_LEVEL {
                alpha_opaque += 1;
            }
            alpha_sum += p.a as f64;
        }

        let ratio = |count: usize| count as f64 / n as f64;
        Some(Self {
            sample_count: n,
            rg_valid: ratio(rg_valid),
            ag_valid: ratio(ag_valid),
            rb_saturated: ratio(rb_saturated),
            z_consistent: ratio(z_consistent),
            z_positive: ratio(z_positive),
            z_negative: ratio(z_negative),
            alpha_opaque: ratio(alpha_opaque),
            mean_alpha: alpha_sum / n as f64,
        })
    }

    fn rg_dominates_ag(&self) -> bool {
        self.rg_valid - self.ag_valid >= DOMINANCE_MARGIN
    }

    fn ag_dominates_rg(&self) -> bool {
        self.ag_valid - self.rg_valid >= DOMINANCE_MARGIN && self.ag_valid >= AG_DOMINANT_MIN_VALID
    }

    fn has_mixed_sign_z(&self) -> bool {
        self.z_positive >= MIXED_SIGN_MIN_RATIO && self.z_negative >= MIXED_SIGN_MIN_RATIO
    }

    fn has_strong_rgb_evidence(&self) -> bool {
        self.z_negative >= MIXED_SIGN_MIN_RATIO && self.z_consistent >= RGB_CONSISTENT_RATIO
    }

    fn is_near_opaque(&self) -> bool {
        self.alpha_opaque >= OPAQUE_ALPHA_RATIO
    }
}

/// One step of the layout cascade.
pub struct LayoutRule {
    pub name: &'static str,
    pub applies: fn(&LayoutSignals) -> bool,
    pub layout: SourceLayout,
}

fn strong_ag_signature(s: &LayoutSignals) -> bool {
    s.rb_saturated >= STRONG_AG_SATURATED_RATIO && s.ag_valid >= STRONG_AG_VALID_RATIO
}

fn ag_validity_dominates(s: &LayoutSignals) -> bool {
    s.ag_dominates_rg()
}

fn mixed_sign_z(s: &LayoutSignals) -> bool {
    s.has_mixed_sign_z()
        && s.z_consistent >= RGB_CONSISTENT_RATIO
        && s.rg_valid - s.z_consistent < RG_OVER_RGB_MARGIN
}

fn negative_z_with_opaque_alpha(s: &LayoutSignals) -> bool {
    s.z_negative >= NEGATIVE_Z_MIN_RATIO && s.z_positive < MIXED_SIGN_MIN_RATIO && s.is_near_opaque()
}

fn opaque_alpha_rg(s: &LayoutSignals) -> bool {
    s.is_near_opaque()
        && s.rg_valid >= RG_VALID_HIGH_RATIO
        && s.rg_valid >= s.ag_valid
        && !s.has_strong_rgb_evidence()
}

fn rg_validity_dominates(s: &LayoutSignals) -> bool {
    s.rg_dominates_ag()
}

fn translucent_alpha_with_z(s: &LayoutSignals) -> bool {
    !s.is_near_opaque() && s.mean_alpha < NON_OPAQUE_MEAN_ALPHA && s.z_consistent >= RGB_CONSISTENT_RATIO
}

fn consistent_z(s: &LayoutSignals) -> bool {
    s.z_consistent >= RGB_STRONG_CONSISTENT_RATIO
}

/// Ordered cascade; evaluated top to bottom, first match wins.
pub const LAYOUT_RULES: &[LayoutRule] = &[
    LayoutRule {
        name: "strong AG signature",
        applies: strong_ag_signature,
        layout: SourceLayout::Ag,
    },
    LayoutRule {
        name: "AG validity dominates",
        applies: ag_validity_dominates,
        layout: SourceLayout::Ag,
    },
    LayoutRule {
        name: "mixed-sign Z",
        applies: mixed_sign_z,
        layout: SourceLayout::Rgb,
    },
    LayoutRule {
        name: "negative Z with opaque alpha",
        applies: negative_z_with_opaque_alpha,
        layout: SourceLayout::Rgb,
    },
    LayoutRule {
        name: "opaque alpha with valid RG",
        applies: opaque_alpha_rg,
        layout: SourceLayout::Rg,
    },
    LayoutRule {
        name: "RG validity dominates",
        applies: rg_validity_dominates,
        layout: SourceLayout::Rg,
    },
    LayoutRule {
        name: "translucent alpha with consistent Z",
        applies: translucent_alpha_with_z,
        layout: SourceLayout::Rgb,
    },
    LayoutRule {
        name: "consistent Z",
        applies: consistent_z,
        layout: SourceLayout::Rgb,
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct LayoutDecision {
    pub layout: SourceLayout,
    /// Matching rule, or `"default"` when none matched or nothing was readable.
    pub rule: &'static str,
    pub signals: Option<LayoutSignals>,
}

/// First rule of [`LAYOUT_RULES`] that accepts `signals`.
pub fn matching_rule(signals: &LayoutSignals) -> Option<&'static LayoutRule> {
    LAYOUT_RULES.iter().find(|rule| (rule.applies)(signals))
}

/// Runs the cascade over `pixels` and reports which rule decided.
pub fn explain_layout(pixels: &[Rgba]) -> LayoutDecision {
    let Some(signals) = LayoutSignals::measure(pixels) else {
        return LayoutDecision {
            layout: DEFAULT_LAYOUT,
            rule: "default",
            signals: None,
        };
    };
    let (layout, rule) = matching_rule(&signals)
        .map(|rule| (rule.layout, rule.name))
        .unwrap_or((DEFAULT_LAYOUT, "default"));

    debug!(?signals, %layout, rule, "Normal map layout classified");
    LayoutDecision {
        layout,
        rule,
        signals: Some(signals),
    }
}

pub fn classify_layout(pixels: &[Rgba]) -> SourceLayout {
    explain_layout(pixels).layout
}

/// Resolves the layout of a normal map stored as `format`.
pub fn detect_layout(format: TextureFormat, source: &dyn PixelSource) -> SourceLayout {
    if format.is_two_channel() {
        return SourceLayout::Rg;
    }
    match source.read_pixels() {
        Ok(pixels) => classify_layout(&pixels),
        Err(e) => {
            warn!(error = %e, %format, "Normal map pixels unreadable; assuming AG layout");
            DEFAULT_LAYOUT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TextureError;
    use crate::normal_map::encode_component;

    /// Unit normals on a grid over the XY disk of the given radius.
    fn grid_normals(radius: f64, steps: usize, signed_z: bool) -> Vec<(f64, f64, f64)> {
        let mut out = Vec::new();
        for i in 0..steps {
            for j in 0..steps {
                let x = -radius + 2.0 * radius * i as f64 / (steps - 1) as f64;
                let y = -radius + 2.0 * radius * j as f64 / (steps - 1) as f64;
                let len2 = x * x + y * y;
                if len2 > radius * radius {
                    continue;
                }
                let mut z = (1.0 - len2).sqrt();
                if signed_z && (i + j) % 2 == 1 {
                    z = -z;
                }
                out.push((x, y, z));
            }
        }
        out
    }

    fn ag_sample() -> Vec<Rgba> {
        grid_normals(0.7, 40, false)
            .into_iter()
            .map(|(x, y, _)| Rgba::new(1.0, encode_component(y), 1.0, encode_component(x)))
            .collect()
    }

    fn rg_sample() -> Vec<Rgba> {
        grid_normals(0.8, 40, false)
            .into_iter()
            .map(|(x, y, z)| Rgba::new(encode_component(x), encode_component(y), encode_component(z), 0.98))
            .collect()
    }

    fn rgb_sample() -> Vec<Rgba> {
        grid_normals(0.95, 40, true)
            .into_iter()
            .map(|(x, y, z)| Rgba::new(encode_component(x), encode_component(y), encode_component(z), 1.0))
            .collect()
    }

    struct Unreadable;

    impl PixelSource for Unreadable {
        fn read_pixels(&self) -> Result<Cow<'_, [Rgba]>> {
            Err(TextureError::PixelRead("texture is not CPU readable".into()))
        }
    }

    #[test]
    fn test_ag_packed_sample_is_ag() {
        let decision = explain_layout(&ag_sample());
        assert_eq!(decision.layout, SourceLayout::Ag);
        assert_eq!(decision.rule, "strong AG signature");
    }

    #[test]
    fn test_rg_packed_sample_is_rg() {
        let decision = explain_layout(&rg_sample());
        assert_eq!(decision.layout, SourceLayout::Rg, "{decision:?}");
        assert_eq!(decision.rule, "opaque alpha with valid RG");
    }

    #[test]
    fn test_rgb_mixed_sign_sample_is_rgb() {
        let decision = explain_layout(&rgb_sample());
        assert_eq!(decision.layout, SourceLayout::Rgb, "{decision:?}");
        assert_eq!(decision.rule, "mixed-sign Z");
    }

    #[test]
    fn test_two_channel_format_skips_sampling() {
        assert_eq!(detect_layout(TextureFormat::Bc5, &Unreadable), SourceLayout::Rg);
    }

    #[test]
    fn test_unreadable_source_defaults_to_ag() {
        assert_eq!(detect_layout(TextureFormat::Bc3, &Unreadable), SourceLayout::Ag);
    }

    #[test]
    fn test_empty_sample_defaults_to_ag() {
        let decision = explain_layout(&[]);
        assert_eq!(decision.layout, DEFAULT_LAYOUT);
        assert_eq!(decision.rule, "default");
        assert!(decision.signals.is_none());
    }

    #[test]
    fn test_inconclusive_evidence_defaults_to_ag() {
        // Mid-gray everywhere: both pairs valid, Z inconsistent, alpha half.
        let pixels = vec![Rgba::new(0.5, 0.5, 0.5, 0.5); 256];
        assert_eq!(classify_layout(&pixels), SourceLayout::Ag);
    }

    #[test]
    fn test_sample_is_bounded() {
        let pixels = rgb_sample().repeat(10);
        let signals = LayoutSignals::measure(&pixels).unwrap();
        assert!(signals.sample_count <= MAX_LAYOUT_SAMPLES);
    }

    #[test]
    fn test_detect_reads_pixel_buffer() {
        let pixels = ag_sample();
        let buffer = PixelBuffer::new(pixels.len() as u32, 1, pixels).unwrap();
        assert_eq!(detect_layout(TextureFormat::Bc3, &buffer), SourceLayout::Ag);
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<_> = LAYOUT_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "strong AG signature",
                "AG validity dominates",
                "mixed-sign Z",
                "negative Z with opaque alpha",
                "opaque alpha with valid RG",
                "RG validity dominates",
                "translucent alpha with consistent Z",
                "consistent Z",
            ]
        );
    }

    #[test]
    fn test_stride_spans_whole_image() {
        // 90x90: first 4096 pixels flat RG, the rest AG-packed.
        let pixels: Vec<Rgba> = (0..90 * 90)
            .map(|i| {
                if i < MAX_LAYOUT_SAMPLES {
                    Rgba::new(0.5, 0.5, 1.0, 1.0)
                } else {
                    Rgba::new(1.0, 0.5, 1.0, 0.5)
                }
            })
            .collect();
        let decision = explain_layout(&pixels);
        let signals = decision.signals.unwrap();
        assert_eq!(signals.sample_count, 4050);
        assert!(signals.rb_saturated > 0.45, "{signals:?}");
        assert!(signals.alpha_opaque < 0.6, "{signals:?}");
        assert_eq!(decision.layout, SourceLayout::Ag);
    }

    /// Signals that no rule accepts.
    fn neutral() -> LayoutSignals {
        LayoutSignals {
            sample_count: 1024,
            rg_valid: 0.5,
            ag_valid: 0.5,
            rb_saturated: 0.0,
            z_consistent: 0.0,
            z_positive: 0.0,
            z_negative: 0.0,
            alpha_opaque: 0.0,
            mean_alpha: 0.5,
        }
    }

    fn rule_for(signals: LayoutSignals) -> (&'static str, Option<SourceLayout>) {
        match matching_rule(&signals) {
            Some(rule) => (rule.name, Some(rule.layout)),
            None => ("default", None),
        }
    }

    #[test]
    fn test_neutral_signals_fall_through() {
        assert_eq!(rule_for(neutral()), ("default", None));
    }

    #[test]
    fn test_rule_strong_ag_signature() {
        let s = LayoutSignals {
            rb_saturated: 0.9,
            ag_valid: 0.9,
            ..neutral()
        };
        assert_eq!(rule_for(s), ("strong AG signature", Some(SourceLayout::Ag)));

        let weak = LayoutSignals {
            rb_saturated: 0.875,
            ag_valid: 0.9,
            ..neutral()
        };
        assert_ne!(rule_for(weak).0, "strong AG signature");
    }

    #[test]
    fn test_rule_ag_validity_dominates() {
        let s = LayoutSignals {
            ag_valid: 0.875,
            rg_valid: 0.625,
            ..neutral()
        };
        assert_eq!(rule_for(s), ("AG validity dominates", Some(SourceLayout::Ag)));

        let narrow = LayoutSignals {
            ag_valid: 0.875,
            rg_valid: 0.6875,
            ..neutral()
        };
        assert_eq!(rule_for(narrow).0, "default");

        // Margin holds but AG validity is below the floor.
        let sparse = LayoutSignals {
            ag_valid: 0.75,
            rg_valid: 0.5,
            ..neutral()
        };
        assert_eq!(rule_for(sparse).0, "default");
    }

    #[test]
    fn test_rule_mixed_sign_z() {
        let s = LayoutSignals {
            z_positive: 0.25,
            z_negative: 0.25,
            z_consistent: 0.75,
            ..neutral()
        };
        assert_eq!(rule_for(s), ("mixed-sign Z", Some(SourceLayout::Rgb)));

        // rg_valid - z_consistent reaches the margin: RG dominance wins instead.
        let rg_heavy = LayoutSignals {
            rg_valid: 1.0,
            ..s
        };
        assert_eq!(rule_for(rg_heavy), ("RG validity dominates", Some(SourceLayout::Rg)));
    }

    #[test]
    fn test_rule_negative_z_with_opaque_alpha() {
        let s = LayoutSignals {
            z_negative: 0.25,
            z_consistent: 0.25,
            alpha_opaque: 1.0,
            mean_alpha: 1.0,
            ..neutral()
        };
        assert_eq!(
            rule_for(s),
            ("negative Z with opaque alpha", Some(SourceLayout::Rgb))
        );

        let translucent = LayoutSignals {
            alpha_opaque: 0.9375,
            ..s
        };
        assert_ne!(rule_for(translucent).0, "negative Z with opaque alpha");
    }

    #[test]
    fn test_rule_opaque_alpha_rg() {
        let s = LayoutSignals {
            rg_valid: 1.0,
            ag_valid: 0.875,
            alpha_opaque: 1.0,
            mean_alpha: 1.0,
            ..neutral()
        };
        assert_eq!(rule_for(s), ("opaque alpha with valid RG", Some(SourceLayout::Rg)));

        // Strong RGB evidence vetoes the rule; consistent Z then decides.
        let rgb_like = LayoutSignals {
            z_negative: 0.0625,
            z_positive: 0.0,
            z_consistent: 0.9375,
            ..s
        };
        assert_eq!(rule_for(rgb_like), ("consistent Z", Some(SourceLayout::Rgb)));
    }

    #[test]
    fn test_rule_rg_validity_dominates() {
        let s = LayoutSignals {
            rg_valid: 0.875,
            ag_valid: 0.625,
            ..neutral()
        };
        assert_eq!(rule_for(s), ("RG validity dominates", Some(SourceLayout::Rg)));

        let narrow = LayoutSignals {
            rg_valid: 0.875,
            ag_valid: 0.6875,
            ..neutral()
        };
        assert_eq!(rule_for(narrow).0, "default");
    }

    #[test]
    fn test_rule_translucent_alpha_with_consistent_z() {
        let s = LayoutSignals {
            z_consistent: 0.75,
            z_positive: 0.75,
            ..neutral()
        };
        assert_eq!(
            rule_for(s),
            ("translucent alpha with consistent Z", Some(SourceLayout::Rgb))
        );

        let nearly_opaque_mean = LayoutSignals {
            mean_alpha: 0.99,
            ..s
        };
        assert_eq!(rule_for(nearly_opaque_mean).0, "default");
    }

    #[test]
    fn test_rule_consistent_z() {
        let s = LayoutSignals {
            z_consistent: 0.9375,
            z_positive: 0.9375,
            alpha_opaque: 1.0,
            mean_alpha: 1.0,
            ..neutral()
        };
        assert_eq!(rule_for(s), ("consistent Z", Some(SourceLayout::Rgb)));

        let loose = LayoutSignals {
            z_consistent: 0.875,
            ..s
        };
        assert_eq!(rule_for(loose).0, "default");
    }
}
