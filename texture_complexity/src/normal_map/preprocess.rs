//! Normal Map Renormalization
//!
//! Reads X/Y (and signed Z for RGB) per the detected layout, rebuilds Z from
//! the unit-sphere constraint and writes canonical RGB with full opacity.

use super::{decode_component, encode_normal, unit_or_flat, SourceLayout};
use crate::pixel::{PixelBuffer, Rgba};
use glam::DVec3;

pub fn renormalize_pixel(p: Rgba, layout: SourceLayout) -> Rgba {
    let (x_channel, y_channel) = match layout {
        SourceLayout::Rg | SourceLayout::Rgb => (p.r, p.g),
        SourceLayout::Ag => (p.a, p.g),
    };
    let x = decode_component(x_channel);
    let y = decode_component(y_channel);

    let mut z = (1.0 - x * x - y * y).max(0.0).sqrt();
    if layout == SourceLayout::Rgb && decode_component(p.b) < 0.0 {
        z = -z;
    }

    encode_normal(unit_or_flat(DVec3::new(x, y, z)))
}

/// Rewrites every pixel of `buffer` into canonical RGB.
pub fn preprocess_normal_map(buffer: &PixelBuffer, layout: SourceLayout) -> PixelBuffer {
    buffer.par_map(|p| renormalize_pixel(p, layout))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(p: Rgba) -> (f64, f64, f64) {
        (decode_component(p.r), decode_component(p.g), decode_component(p.b))
    }

    fn assert_unit(p: Rgba) {
        let (x, y, z) = decoded(p);
        let len = (x * x + y * y + z * z).sqrt();
        assert!((len - 1.0).abs() < 1e-4, "length {len} for {p:?}");
        assert_eq!(p.a, 1.0);
    }

    #[test]
    fn test_rg_rebuilds_positive_z() {
        let out = renormalize_pixel(Rgba::new(0.8, 0.5, 0.0, 0.3), SourceLayout::Rg);
        assert_unit(out);
        let (x, y, z) = decoded(out);
        assert!((x - 0.6).abs() < 1e-4);
        assert!(y.abs() < 1e-4);
        assert!((z - 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_ag_reads_alpha_and_green() {
        let out = renormalize_pixel(Rgba::new(1.0, 0.5, 1.0, 0.8), SourceLayout::Ag);
        assert_unit(out);
        let (x, _, z) = decoded(out);
        assert!((x - 0.6).abs() < 1e-4);
        assert!(z > 0.0);
    }

    #[test]
    fn test_rgb_keeps_negative_sign() {
        let out = renormalize_pixel(Rgba::new(0.8, 0.5, 0.1, 1.0), SourceLayout::Rgb);
        assert_unit(out);
        let (_, _, z) = decoded(out);
        assert!((z + 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_negative_blue_ignored_outside_rgb() {
        let out = renormalize_pixel(Rgba::new(0.8, 0.5, 0.1, 1.0), SourceLayout::Rg);
        assert!(decoded(out).2 > 0.0);
    }

    #[test]
    fn test_out_of_disk_pair_is_normalized() {
        let out = renormalize_pixel(Rgba::new(1.0, 1.0, 0.5, 1.0), SourceLayout::Rg);
        assert_unit(out);
        let (x, y, z) = decoded(out);
        assert!((x - y).abs() < 1e-4);
        assert!(z.abs() < 1e-4);
    }

    #[test]
    fn test_flat_normal_stays_flat() {
        let out = renormalize_pixel(Rgba::new(0.5, 0.5, 1.0, 1.0), SourceLayout::Rgb);
        let (x, y, z) = decoded(out);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
        assert!((z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_keeps_dimensions() {
        let buffer = PixelBuffer::from_fn(3, 2, |x, _| Rgba::new(0.5 + 0.1 * x as f32, 0.5, 0.0, 0.0));
        let out = preprocess_normal_map(&buffer, SourceLayout::Rg);
        assert_eq!((out.width(), out.height()), (3, 2));
        for &p in out.pixels() {
            assert_unit(p);
        }
    }
}
