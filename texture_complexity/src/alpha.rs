//! Alpha Extraction & Grayscale Conversion
//!
//! Splits a texture into its opaque pixels and a parallel luminance array.
//! Transparent entries keep their slot (so 2D neighbourhoods stay intact) but
//! carry [`TRANSPARENT_MARKER`], which every alpha-aware metric skips.

use crate::pixel::Rgba;

/// Pixels with alpha at or above this count as opaque.
pub const SIGNIFICANT_ALPHA_THRESHOLD: f32 = 0.1;

/// Grayscale sentinel for transparent source pixels. Valid luminance is never negative.
pub const TRANSPARENT_MARKER: f32 = -1.0;

/// Alpha below this anywhere in a texture means it actually uses its alpha channel.
pub const ALPHA_PRESENT_THRESHOLD: f32 = 0.99;

const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

#[inline]
pub fn luminance(c: Rgba) -> f32 {
    LUMA_R * c.r + LUMA_G * c.g + LUMA_B * c.b
}

#[inline]
pub fn is_transparent_marker(v: f32) -> bool {
    v < 0.0
}

/// Ephemeral per-texture view consumed by the complexity strategies.
#[derive(Debug, Clone)]
pub struct ProcessedPixelData {
    pub opaque_pixels: Vec<Rgba>,
    pub grayscale: Vec<f32>,
    pub width: u32,
    pub height: u32,
    pub opaque_count: usize,
    pub is_normal_map: bool,
    pub is_emission: bool,
}

impl ProcessedPixelData {
    /// Alpha-filtered view: transparent pixels are cleared and marked.
    pub fn from_pixels(pixels: &[Rgba], width: u32, height: u32) -> Self {
        extract_opaque_pixels(pixels, width, height)
    }

    /// Unfiltered view used by normal-map paths, where alpha may hold data.
    pub fn from_all_pixels(pixels: &[Rgba], width: u32, height: u32) -> Self {
        let len = pixel_len(width, height).min(pixels.len());
        Self {
            opaque_pixels: pixels[..len].to_vec(),
            grayscale: convert_to_grayscale(&pixels[..len]),
            width,
            height,
            opaque_count: len,
            is_normal_map: false,
            is_emission: false,
        }
    }

    pub fn with_flags(mut self, is_normal_map: bool, is_emission: bool) -> Self {
        self.is_normal_map = is_normal_map;
        self.is_emission = is_emission;
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.grayscale.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque_count == 0
    }
}

pub fn extract_opaque_pixels(pixels: &[Rgba], width: u32, height: u32) -> ProcessedPixelData {
    let len = pixel_len(width, height).min(pixels.len());
    let mut opaque_pixels = Vec::with_capacity(len);
    let mut grayscale = Vec::with_capacity(len);
    let mut opaque_count = 0usize;

    for &px in &pixels[..len] {
        if px.a >= SIGNIFICANT_ALPHA_THRESHOLD {
            opaque_pixels.push(px);
            grayscale.push(luminance(px));
            opaque_count += 1;
        } else {
            opaque_pixels.push(Rgba::CLEAR);
            grayscale.push(TRANSPARENT_MARKER);
        }
    }

    ProcessedPixelData {
        opaque_pixels,
        grayscale,
        width,
        height,
        opaque_count,
        is_normal_map: false,
        is_emission: false,
    }
}

/// Luminance of every pixel, ignoring alpha.
pub fn convert_to_grayscale(pixels: &[Rgba]) -> Vec<f32> {
    pixels.iter().map(|&p| luminance(p)).collect()
}

pub fn has_meaningful_alpha(pixels: &[Rgba]) -> bool {
    pixels.iter().any(|p| p.a < ALPHA_PRESENT_THRESHOLD)
}

fn pixel_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_opaque_counts_everything() {
        let pixels = vec![Rgba::new(0.3, 0.6, 0.9, 1.0); 100];
        let data = extract_opaque_pixels(&pixels, 10, 10);
        assert_eq!(data.opaque_count, 100);
        assert_eq!(data.grayscale.len(), 100);
        assert_eq!(data.opaque_pixels.len(), 100);
        assert!(data.grayscale.iter().all(|&g| g >= 0.0));
    }

    #[test]
    fn test_fully_transparent_uses_marker() {
        let pixels = vec![Rgba::new(0.3, 0.6, 0.9, 0.0); 64];
        let data = extract_opaque_pixels(&pixels, 8, 8);
        assert_eq!(data.opaque_count, 0);
        assert!(data.grayscale.iter().all(|&g| g == TRANSPARENT_MARKER));
        assert!(data.opaque_pixels.iter().all(|&p| p == Rgba::CLEAR));
    }

    #[test]
    fn test_alpha_threshold_boundary() {
        let pixels = vec![Rgba::new(1.0, 1.0, 1.0, 0.1), Rgba::new(1.0, 1.0, 1.0, 0.099)];
        let data = extract_opaque_pixels(&pixels, 2, 1);
        assert_eq!(data.opaque_count, 1);
        assert!(!is_transparent_marker(data.grayscale[0]));
        assert!(is_transparent_marker(data.grayscale[1]));
    }

    #[test]
    fn test_luminance_weights() {
        assert!((luminance(Rgba::new(1.0, 0.0, 0.0, 1.0)) - 0.2126).abs() < 0.001);
        assert!((luminance(Rgba::new(0.0, 1.0, 0.0, 1.0)) - 0.7152).abs() < 0.001);
        assert!((luminance(Rgba::new(0.0, 0.0, 1.0, 1.0)) - 0.0722).abs() < 0.001);
    }

    #[test]
    fn test_grayscale_ignores_alpha() {
        let gray = convert_to_grayscale(&[Rgba::new(1.0, 0.0, 0.0, 0.0)]);
        assert!((gray[0] - 0.2126).abs() < 0.001);
    }

    #[test]
    fn test_from_all_pixels_keeps_transparent() {
        let pixels = vec![Rgba::new(0.5, 0.5, 1.0, 0.0); 16];
        let data = ProcessedPixelData::from_all_pixels(&pixels, 4, 4).with_flags(true, false);
        assert_eq!(data.opaque_count, 16);
        assert!(data.is_normal_map);
        assert_eq!(data.opaque_pixels[0], pixels[0]);
    }

    #[test]
    fn test_has_meaningful_alpha() {
        assert!(!has_meaningful_alpha(&[Rgba::new(0.0, 0.0, 0.0, 1.0)]));
        assert!(has_meaningful_alpha(&[Rgba::new(0.0, 0.0, 0.0, 1.0), Rgba::new(0.0, 0.0, 0.0, 0.5)]));
    }
}
