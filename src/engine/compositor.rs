// src/engine/compositor.rs
//
// Flatten transparency onto an opaque background (source-over).

use crate::engine::raster::RasterImage;
use crate::ops::Rgb;
use image::{Rgba, RgbaImage};

#[inline]
fn blend_channel(src: u8, background: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    ((u32::from(src) * a + u32::from(background) * (255 - a) + 127) / 255) as u8
}

/// Composite `raster` over a solid `background`.
///
/// `out.rgb = src.rgb * a + bg.rgb * (1 - a)`, `out.a = 255`, computed on
/// straight alpha with round-to-nearest. Opaque pixels come out unchanged
/// and fully transparent ones become the background exactly.
pub fn flatten(raster: &RasterImage, background: Rgb) -> RasterImage {
    let src = raster.buffer();
    let canvas = RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        Rgba([
            blend_channel(r, background.r, a),
            blend_channel(g, background.g, a),
            blend_channel(b, background.b, a),
            255,
        ])
    });
    RasterImage::from_buffer(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(pixels: &[[u8; 4]], width: u32) -> RasterImage {
        let height = pixels.len() as u32 / width;
        RasterImage::from_rgba(width, height, pixels.concat()).unwrap()
    }

    #[test]
    fn opaque_pixels_are_unchanged() {
        let src = raster(&[[10, 20, 30, 255], [250, 1, 128, 255]], 2);
        let out = flatten(&src, Rgb::new(9, 9, 9));
        assert_eq!(out, src);
    }

    #[test]
    fn transparent_pixels_become_background() {
        let src = raster(&[[10, 20, 30, 0], [255, 255, 255, 0]], 1);
        let out = flatten(&src, Rgb::new(1, 2, 3));
        assert_eq!(out.pixel(0, 0), Some([1, 2, 3, 255]));
        assert_eq!(out.pixel(0, 1), Some([1, 2, 3, 255]));
    }

    #[test]
    fn half_alpha_blends_evenly() {
        let src = raster(&[[255, 0, 200, 128]], 1);
        let out = flatten(&src, Rgb::new(0, 255, 0));
        // 255*128/255 = 128, 255*127/255 = 127, (200*128)/255 = 100.39
        assert_eq!(out.pixel(0, 0), Some([128, 127, 100, 255]));
    }

    #[test]
    fn output_is_always_opaque_and_same_size() {
        let src = raster(&[[1, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]], 3);
        let out = flatten(&src, Rgb::WHITE);
        assert_eq!(out.dimensions(), src.dimensions());
        assert!(out.is_opaque());
    }
}
