//! Image Math Primitives
//!
//! Stateless numeric kernels behind every complexity strategy. All of them:
//! - take row-major grayscale (or RGBA) slices plus dimensions,
//! - skip any window, pair or block that touches a transparent entry,
//! - return a neutral value on empty input (0 for energy-like metrics,
//!   1 for the "uniform" GLCM homogeneity/energy).
//!
//! Accumulation is done in f64 so uniform inputs produce exact zeros.

use crate::alpha::{is_transparent_marker, SIGNIFICANT_ALPHA_THRESHOLD};
use crate::pixel::Rgba;
use std::f64::consts::PI;

pub const DCT_BLOCK_SIZE: usize = 8;
/// Coefficients with `u + v` below this form the low-frequency corner.
pub const DCT_LOW_FREQUENCY_DIAGONAL: usize = 4;
pub const GLCM_LEVELS: usize = 256;
/// Co-occurrence offset (dx, dy): the right-hand neighbour.
pub const GLCM_OFFSET: (usize, usize) = (1, 0);
pub const ENTROPY_BINS: usize = 256;
pub const VARIANCE_BLOCK_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlcmFeatures {
    pub contrast: f64,
    pub homogeneity: f64,
    pub energy: f64,
}

impl Default for GlcmFeatures {
    /// The perfectly uniform identity.
    fn default() -> Self {
        Self {
            contrast: 0.0,
            homogeneity: 1.0,
            energy: 1.0,
        }
    }
}

#[inline]
fn dims(gray: &[f32], width: u32, height: u32) -> Option<(usize, usize)> {
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 || gray.len() < w * h {
        None
    } else {
        Some((w, h))
    }
}

#[inline]
fn valid(v: f32) -> Option<f64> {
    if is_transparent_marker(v) {
        None
    } else {
        Some(v as f64)
    }
}

fn window3(gray: &[f32], w: usize, x: usize, y: usize) -> Option<[f64; 9]> {
    let mut win = [0.0f64; 9];
    for dy in 0..3 {
        let row = (y + dy - 1) * w;
        for dx in 0..3 {
            win[dy * 3 + dx] = valid(gray[row + x + dx - 1])?;
        }
    }
    Some(win)
}

/// Mean 3×3 Sobel gradient magnitude over interior pixels.
pub fn sobel_gradient_magnitude(gray: &[f32], width: u32, height: u32) -> f64 {
    let Some((w, h)) = dims(gray, width, height) else {
        return 0.0;
    };
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let Some(p) = window3(gray, w, x, y) else {
                continue;
            };
            let gx = (p[2] + 2.0 * p[5] + p[8]) - (p[0] + 2.0 * p[3] + p[6]);
            let gy = (p[6] + 2.0 * p[7] + p[8]) - (p[0] + 2.0 * p[1] + p[2]);
            sum += (gx * gx + gy * gy).sqrt();
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// RMS of horizontal and vertical first differences: `sqrt(RF² + CF²)`.
pub fn spatial_frequency(gray: &[f32], width: u32, height: u32) -> f64 {
    let Some((w, h)) = dims(gray, width, height) else {
        return 0.0;
    };

    let (mut row_sq, mut row_n) = (0.0f64, 0usize);
    let (mut col_sq, mut col_n) = (0.0f64, 0usize);
    for y in 0..h {
        for x in 0..w {
            let Some(v) = valid(gray[y * w + x]) else {
                continue;
            };
            if x + 1 < w {
                if let Some(right) = valid(gray[y * w + x + 1]) {
                    row_sq += (right - v) * (right - v);
                    row_n += 1;
                }
            }
            if y + 1 < h {
                if let Some(down) = valid(gray[(y + 1) * w + x]) {
                    col_sq += (down - v) * (down - v);
                    col_n += 1;
                }
            }
        }
    }

    let rf = if row_n == 0 { 0.0 } else { row_sq / row_n as f64 };
    let cf = if col_n == 0 { 0.0 } else { col_sq / col_n as f64 };
    (rf + cf).sqrt()
}

/// Population variance of opaque RGB around their mean, averaged over channels.
pub fn color_variance(pixels: &[Rgba]) -> f64 {
    let opaque = || pixels.iter().filter(|p| p.a >= SIGNIFICANT_ALPHA_THRESHOLD);

    let mut sum = [0.0f64; 3];
    let mut n = 0usize;
    for p in opaque() {
        sum[0] += p.r as f64;
        sum[1] += p.g as f64;
        sum[2] += p.b as f64;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    let mean = sum.map(|s| s / n as f64);

    let mut sq = 0.0f64;
    for p in opaque() {
        let dr = p.r as f64 - mean[0];
        let dg = p.g as f64 - mean[1];
        let db = p.b as f64 - mean[2];
        sq += dr * dr + dg * dg + db * db;
    }
    sq / (3.0 * n as f64)
}

fn dct_basis() -> [[f64; DCT_BLOCK_SIZE]; DCT_BLOCK_SIZE] {
    let n = DCT_BLOCK_SIZE as f64;
    let mut basis = [[0.0f64; DCT_BLOCK_SIZE]; DCT_BLOCK_SIZE];
    for (u, row) in basis.iter_mut().enumerate() {
        let scale = if u == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = scale * (((2 * x + 1) as f64 * u as f64 * PI) / (2.0 * n)).cos();
        }
    }
    basis
}

/// Share of 8×8 DCT energy outside the low-frequency corner, over all
/// complete, fully opaque blocks.
pub fn dct_high_frequency_ratio(gray: &[f32], width: u32, height: u32) -> f64 {
    const B: usize = DCT_BLOCK_SIZE;
    let Some((w, h)) = dims(gray, width, height) else {
        return 0.0;
    };
    if w < B || h < B {
        return 0.0;
    }

    let basis = dct_basis();
    let mut total = 0.0f64;
    let mut high = 0.0f64;
    let mut block = [[0.0f64; B]; B];
    let mut tmp = [[0.0f64; B]; B];

    for by in (0..=h - B).step_by(B) {
        'blocks: for bx in (0..=w - B).step_by(B) {
            for (y, row) in block.iter_mut().enumerate() {
                for (x, cell) in row.iter_mut().enumerate() {
                    match valid(gray[(by + y) * w + bx + x]) {
                        Some(v) => *cell = v,
                        None => continue 'blocks,
                    }
                }
            }

            // Separable transform: columns first, then rows.
            for v in 0..B {
                for x in 0..B {
                    tmp[v][x] = (0..B).map(|y| basis[v][y] * block[y][x]).sum();
                }
            }
            for v in 0..B {
                for u in 0..B {
                    let c: f64 = (0..B).map(|x| basis[u][x] * tmp[v][x]).sum();
                    let e = c * c;
                    total += e;
                    if u + v >= DCT_LOW_FREQUENCY_DIAGONAL {
                        high += e;
                    }
                }
            }
        }
    }

    if total < 1e-12 {
        0.0
    } else {
        (high / total).clamp(0.0, 1.0)
    }
}

#[inline]
fn quantize(v: f64, levels: usize) -> usize {
    ((v.clamp(0.0, 1.0) * (levels - 1) as f64).round() as usize).min(levels - 1)
}

/// Contrast, homogeneity and energy of the gray-level co-occurrence matrix.
pub fn glcm_features(gray: &[f32], width: u32, height: u32) -> GlcmFeatures {
    let Some((w, h)) = dims(gray, width, height) else {
        return GlcmFeatures::default();
    };
    let (dx, dy) = GLCM_OFFSET;

    let mut matrix = vec![0u32; GLCM_LEVELS * GLCM_LEVELS];
    let mut pairs = 0u64;
    for y in 0..h.saturating_sub(dy) {
        for x in 0..w.saturating_sub(dx) {
            let (Some(a), Some(b)) = (valid(gray[y * w + x]), valid(gray[(y + dy) * w + x + dx]))
            else {
                continue;
            };
            matrix[quantize(a, GLCM_LEVELS) * GLCM_LEVELS + quantize(b, GLCM_LEVELS)] += 1;
            pairs += 1;
        }
    }
    if pairs == 0 {
        return GlcmFeatures::default();
    }

    let total = pairs as f64;
    let mut features = GlcmFeatures {
        contrast: 0.0,
        homogeneity: 0.0,
        energy: 0.0,
    };
    for (idx, &count) in matrix.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let p = count as f64 / total;
        let diff = (idx / GLCM_LEVELS) as f64 - (idx % GLCM_LEVELS) as f64;
        features.contrast += diff * diff * p;
        features.homogeneity += p / (1.0 + diff.abs());
        features.energy += p * p;
    }
    features
}

/// Histogram entropy in bits.
pub fn shannon_entropy(gray: &[f32]) -> f64 {
    let mut histogram = [0u64; ENTROPY_BINS];
    let mut n = 0u64;
    for v in gray.iter().filter_map(|&v| valid(v)) {
        histogram[quantize(v, ENTROPY_BINS)] += 1;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }

    let total = n as f64;
    histogram
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Population variance of all valid grayscale entries.
pub fn grayscale_variance(gray: &[f32]) -> f64 {
    variance(gray.iter().filter_map(|&v| valid(v)))
}

fn variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (sum, n) = values.clone().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return 0.0;
    }
    let mean = sum / n as f64;
    values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64
}

/// Mean of per-block variances over non-overlapping blocks (edge blocks may be
/// partial). Blocks with fewer than two valid samples are ignored.
pub fn block_variance(gray: &[f32], width: u32, height: u32) -> f64 {
    const B: usize = VARIANCE_BLOCK_SIZE;
    let Some((w, h)) = dims(gray, width, height) else {
        return 0.0;
    };

    let mut sum = 0.0f64;
    let mut blocks = 0usize;
    for by in (0..h).step_by(B) {
        for bx in (0..w).step_by(B) {
            let (y_end, x_end) = ((by + B).min(h), (bx + B).min(w));
            let samples = (by..y_end)
                .flat_map(|y| (bx..x_end).map(move |x| y * w + x))
                .filter_map(|i| valid(gray[i]));
            if samples.clone().take(2).count() < 2 {
                continue;
            }
            sum += variance(samples);
            blocks += 1;
        }
    }

    if blocks == 0 {
        0.0
    } else {
        sum / blocks as f64
    }
}
