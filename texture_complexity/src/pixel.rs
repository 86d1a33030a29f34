//! Pixel Buffer Types
//!
//! Floating point RGBA storage shared by every analysis stage. Components are
//! expected in `[0, 1]`; nothing here clamps them.

use crate::errors::{Result, TextureError};
use image::{DynamicImage, Rgba32FImage, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const CLEAR: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Caller-owned RGBA texture. The engine only ever borrows it for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(TextureError::DimensionMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgba) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Applies `f` to every pixel in parallel, keeping dimensions.
    pub fn par_map(&self, f: impl Fn(Rgba) -> Rgba + Sync + Send) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.par_iter().map(|&p| f(p)).collect(),
        }
    }

    pub fn from_rgba32f_image(img: &Rgba32FImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            pixels: img
                .pixels()
                .map(|p| {
                    let [r, g, b, a] = p.0;
                    Rgba::new(r, g, b, a)
                })
                .collect(),
        }
    }

    /// Converts any decoded image to float RGBA.
    pub fn from_image(img: &DynamicImage) -> Self {
        Self::from_rgba32f_image(&img.to_rgba32f())
    }

    /// Decodes the image file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path)?;
        Ok(Self::from_image(&img))
    }

    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        let raw: Vec<u8> = self.pixels.iter().flat_map(|p| p.to_rgba8()).collect();
        RgbaImage::from_raw(self.width, self.height, raw).ok_or_else(|| {
            TextureError::DimensionMismatch {
                width: self.width,
                height: self.height,
                expected: self.width as usize * self.height as usize,
                actual: self.pixels.len(),
            }
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn into_pixels(self) -> Vec<Rgba> {
        self.pixels
    }
}
