//! Pixel Sampler
//!
//! Caps the number of pixels fed into analysis so the worst-case cost of a
//! texture is bounded. Small textures pass through untouched (borrowed, no
//! copy); large ones are point-sampled into a fresh buffer.

use crate::pixel::Rgba;
use std::borrow::Cow;

/// Pixel budget for a single analysis pass.
pub const MAX_SAMPLED_PIXELS: u64 = 512 * 512;

/// Each sampled side stays at or above this (or the source side, if smaller).
pub const MIN_SAMPLED_DIMENSION: u32 = 64;

#[derive(Debug, Clone)]
pub struct SampledPixels<'a> {
    pub pixels: Cow<'a, [Rgba]>,
    pub width: u32,
    pub height: u32,
}

impl SampledPixels<'_> {
    pub fn was_resampled(&self) -> bool {
        matches!(self.pixels, Cow::Owned(_))
    }
}

/// Downsamples `pixels` with nearest-position lookup when `width * height`
/// exceeds [`MAX_SAMPLED_PIXELS`], preserving aspect ratio.
pub fn sample_if_needed(pixels: &[Rgba], width: u32, height: u32) -> SampledPixels<'_> {
    if width == 0 || height == 0 {
        return SampledPixels {
            pixels: Cow::Borrowed(&pixels[..0]),
            width: 0,
            height: 0,
        };
    }

    let total = width as u64 * height as u64;
    if total <= MAX_SAMPLED_PIXELS {
        return SampledPixels {
            pixels: Cow::Borrowed(pixels),
            width,
            height,
        };
    }

    let (sw, sh) = sampled_dimensions(width, height);
    let mut sampled = Vec::with_capacity(sw as usize * sh as usize);
    for y in 0..sh {
        let src_y = nearest(y, sh, height);
        let row = src_y as usize * width as usize;
        for x in 0..sw {
            let src_x = nearest(x, sw, width);
            sampled.push(pixels[row + src_x as usize]);
        }
    }

    tracing::debug!(
        width,
        height,
        sampled_width = sw,
        sampled_height = sh,
        "Texture downsampled for analysis"
    );

    SampledPixels {
        pixels: Cow::Owned(sampled),
        width: sw,
        height: sh,
    }
}

fn sampled_dimensions(width: u32, height: u32) -> (u32, u32) {
    let total = width as f64 * height as f64;
    let scale = (MAX_SAMPLED_PIXELS as f64 / total).sqrt();

    let floor_w = MIN_SAMPLED_DIMENSION.min(width).max(1);
    let floor_h = MIN_SAMPLED_DIMENSION.min(height).max(1);
    let mut sw = ((width as f64 * scale).floor() as u32).max(floor_w);
    let mut sh = ((height as f64 * scale).floor() as u32).max(floor_h);

    // Raising a thin side to its floor can push the product over budget;
    // take the excess out of the long side.
    if sw as u64 * sh as u64 > MAX_SAMPLED_PIXELS {
        if sw >= sh {
            sw = ((MAX_SAMPLED_PIXELS / sh as u64) as u32).max(1);
        } else {
            sh = ((MAX_SAMPLED_PIXELS / sw as u64) as u32).max(1);
        }
    }
    (sw, sh)
}

#[inline]
fn nearest(dst: u32, dst_len: u32, src_len: u32) -> u32 {
    let pos = (dst as f64 + 0.5) * src_len as f64 / dst_len as f64;
    (pos as u32).min(src_len - 1)
}
