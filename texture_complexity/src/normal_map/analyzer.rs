//! Normal-map complexity: how far surfaces tilt, how much directions spread
//! and how sharply neighbouring normals change.

use super::{decode_component, unit_or_flat};
use crate::alpha::ProcessedPixelData;
use crate::complexity_strategy::{short_circuit, ComplexityAnalyzer, ComplexityResult};
use crate::normalize::{NORMAL_NEIGHBOR_BOUNDS, NORMAL_SPREAD_BOUNDS, NORMAL_TILT_BOUNDS};
use crate::pixel::Rgba;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalMapWeights {
    pub tilt: f64,
    pub spread: f64,
    pub neighbor: f64,
}

impl Default for NormalMapWeights {
    fn default() -> Self {
        Self {
            tilt: 0.2,
            spread: 0.4,
            neighbor: 0.4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalMapAnalyzer {
    weights: NormalMapWeights,
}

impl NormalMapAnalyzer {
    pub fn new(weights: NormalMapWeights) -> Self {
        Self { weights }
    }
}

fn unit_normal(p: Rgba) -> DVec3 {
    unit_or_flat(DVec3::new(
        decode_component(p.r),
        decode_component(p.g),
        decode_component(p.b),
    ))
}

impl ComplexityAnalyzer for NormalMapAnalyzer {
    fn analyze(&self, data: &ProcessedPixelData) -> ComplexityResult {
        if let Some(result) = short_circuit(data, self.name()) {
            return result;
        }
        let (w, h) = (data.width as usize, data.height as usize);
        let normals: Vec<DVec3> = data.opaque_pixels.iter().map(|&p| unit_normal(p)).collect();
        let n = normals.len().max(1) as f64;

        let tilt = normals.iter().map(|v| 1.0 - v.z).sum::<f64>() / n;
        let mean = normals.iter().fold(DVec3::ZERO, |acc, &v| acc + v) / n;
        let spread = (1.0 - mean.length()).max(0.0);

        let mut neighbor_sum = 0.0;
        let mut neighbor_pairs = 0usize;
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let Some(&here) = normals.get(i) else { continue };
                if x + 1 < w {
                    if let Some(&right) = normals.get(i + 1) {
                        neighbor_sum += 1.0 - here.dot(right);
                        neighbor_pairs += 1;
                    }
                }
                if y + 1 < h {
                    if let Some(&down) = normals.get(i + w) {
                        neighbor_sum += 1.0 - here.dot(down);
                        neighbor_pairs += 1;
                    }
                }
            }
        }
        let neighbor = if neighbor_pairs == 0 {
            0.0
        } else {
            neighbor_sum / neighbor_pairs as f64
        };

        let score = self.weights.tilt * NORMAL_TILT_BOUNDS.apply(tilt)
            + self.weights.spread * NORMAL_SPREAD_BOUNDS.apply(spread)
            + self.weights.neighbor * NORMAL_NEIGHBOR_BOUNDS.apply(neighbor);

        debug!(tilt, spread, neighbor, score, "NormalMap complexity metrics");
        ComplexityResult::new(
            score,
            format!(
                "NormalMap: tilt {tilt:.4}, spread {spread:.4}, neighbor change {neighbor:.4} -> {:.3}",
                score.clamp(0.0, 1.0)
            ),
        )
    }

    fn name(&self) -> &'static str {
        "NormalMap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity_strategy::DEFAULT_SHORT_CIRCUIT_SCORE;

    fn data_from(w: u32, h: u32, f: impl Fn(u32, u32) -> Rgba) -> ProcessedPixelData {
        let pixels: Vec<Rgba> = (0..h).flat_map(|y| (0..w).map(move |x| (x, y))).map(|(x, y)| f(x, y)).collect();
        ProcessedPixelData::from_all_pixels(&pixels, w, h).with_flags(true, false)
    }

    #[test]
    fn test_flat_normal_map_scores_zero() {
        let data = data_from(32, 32, |_, _| Rgba::new(0.5, 0.5, 1.0, 1.0));
        let result = NormalMapAnalyzer::default().analyze(&data);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_uniform_colors_score_low() {
        for color in [
            Rgba::new(1.0, 0.0, 0.0, 1.0),
            Rgba::new(0.0, 0.0, 0.0, 1.0),
            Rgba::new(0.7, 0.3, 0.8, 1.0),
        ] {
            let data = data_from(32, 32, |_, _| color);
            let score = NormalMapAnalyzer::default().analyze(&data).score;
            assert!(score < 0.3, "{color:?} scored {score}");
        }
    }

    #[test]
    fn test_bumpy_scores_above_flat() {
        let bumpy = data_from(32, 32, |x, y| {
            let r = 0.5 + 0.35 * ((x as f32) * 0.9).sin();
            let g = 0.5 + 0.35 * ((y as f32) * 1.3).cos();
            Rgba::new(r, g, 0.85, 1.0)
        });
        let flat = data_from(32, 32, |_, _| Rgba::new(0.5, 0.5, 1.0, 1.0));
        let analyzer = NormalMapAnalyzer::default();
        assert!(analyzer.analyze(&bumpy).score > analyzer.analyze(&flat).score + 0.3);
    }

    #[test]
    fn test_small_map_short_circuits() {
        let data = data_from(4, 4, |_, _| Rgba::new(0.9, 0.1, 0.5, 1.0));
        let result = NormalMapAnalyzer::default().analyze(&data);
        assert_eq!(result.score, DEFAULT_SHORT_CIRCUIT_SCORE);
    }

    #[test]
    fn test_degenerate_vectors_read_as_flat() {
        assert_eq!(unit_normal(Rgba::new(0.5, 0.5, 0.5, 1.0)), DVec3::Z);
    }
}
