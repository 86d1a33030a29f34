//! Complexity → Resolution Mapping
//!
//! Turns a complexity score into an integer downscale divisor, then applies
//! that divisor to the source dimensions under the configured resolution
//! policy.

use serde::{Deserialize, Serialize};

/// Detailed textures keep `min_divisor`, flat ones drop to `max_divisor`,
/// with linear interpolation between the two thresholds.
///
/// `low_threshold < high_threshold` and `min_divisor <= max_divisor` are
/// caller contracts.
pub fn recommended_divisor(
    score: f64,
    low_threshold: f64,
    high_threshold: f64,
    min_divisor: u32,
    max_divisor: u32,
) -> u32 {
    debug_assert!(low_threshold < high_threshold);
    debug_assert!(min_divisor <= max_divisor);

    if score >= high_threshold {
        return min_divisor;
    }
    if score <= low_threshold {
        return max_divisor;
    }

    let t = (score - low_threshold) / (high_threshold - low_threshold);
    let divisor = max_divisor as f64 + (min_divisor as f64 - max_divisor as f64) * t;
    (divisor.round() as u32).clamp(min_divisor, max_divisor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRounding {
    #[default]
    None,
    PowerOfTwo,
    MultipleOfFour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionPolicy {
    pub min_resolution: u32,
    pub max_resolution: u32,
    pub rounding: ResolutionRounding,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            min_resolution: 32,
            max_resolution: 4096,
            rounding: ResolutionRounding::None,
        }
    }
}

/// Applies `divisor` to `(width, height)`, clamps each side to
/// `[min(min_resolution, source), max_resolution]` and rounds.
pub fn recommended_resolution(
    width: u32,
    height: u32,
    divisor: u32,
    policy: &ResolutionPolicy,
) -> (u32, u32) {
    let divisor = divisor.max(1);
    (
        scale_side(width, divisor, policy),
        scale_side(height, divisor, policy),
    )
}

fn scale_side(source: u32, divisor: u32, policy: &ResolutionPolicy) -> u32 {
    if source == 0 {
        return 0;
    }
    let lower = policy.min_resolution.min(source).max(1);
    let upper = policy.max_resolution.max(lower);
    let side = (source / divisor).clamp(lower, upper);

    match policy.rounding {
        ResolutionRounding::None => side,
        ResolutionRounding::PowerOfTwo => {
            let rounded = nearest_power_of_two(side).min(prev_power_of_two(upper));
            // Never round up past the source.
            if rounded > source {
                prev_power_of_two(source)
            } else {
                rounded
            }
        }
        ResolutionRounding::MultipleOfFour => {
            let rounded = ((side + 2) / 4 * 4).max(4);
            if rounded > upper && upper >= 4 {
                upper / 4 * 4
            } else {
                rounded
            }
        }
    }
}

fn prev_power_of_two(v: u32) -> u32 {
    if v == 0 {
        1
    } else {
        1 << (31 - v.leading_zeros())
    }
}

fn nearest_power_of_two(v: u32) -> u32 {
    let lower = prev_power_of_two(v);
    if lower == v {
        return v;
    }
    let upper = lower.saturating_mul(2);
    if v - lower < upper - v {
        lower
    } else {
        upper
    }
}
