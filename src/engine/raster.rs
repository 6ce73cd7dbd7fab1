// src/engine/raster.rs
//
// Owned RGBA8 pixel buffer (straight alpha, row-major).

use crate::error::ImagingError;
use image::{DynamicImage, RgbaImage};

/// An owned, row-major RGBA8 raster with straight (non-premultiplied) alpha.
///
/// Width and height are always those of the buffer held and both are > 0.
/// Rasters are never shared: every transform builds a new one and the
/// caller drops the old.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// Build a raster from raw RGBA8 bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImagingError> {
        if width == 0 || height == 0 {
            return Err(ImagingError::invalid_argument(
                "dimensions",
                format!("{width}x{height}"),
                "Raster width and height must be positive.",
            ));
        }
        let len = data.len();
        let pixels = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            ImagingError::invalid_argument(
                "data",
                format!("{len} bytes"),
                format!(
                    "Expected {} bytes for a {width}x{height} RGBA8 raster.",
                    width as u64 * height as u64 * 4
                ),
            )
        })?;
        Ok(Self { pixels })
    }

    /// Normalize any decoded image to RGBA8.
    pub(crate) fn from_dynamic(img: DynamicImage) -> Result<Self, ImagingError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(ImagingError::decode_failed(format!(
                "decoded image has empty dimensions {}x{}",
                img.width(),
                img.height()
            )));
        }
        Ok(Self {
            pixels: img.into_rgba8(),
        })
    }

    pub(crate) fn from_buffer(pixels: RgbaImage) -> Self {
        debug_assert!(pixels.width() > 0 && pixels.height() > 0);
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// RGBA of the pixel at (x, y), or None when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels.into_raw()
    }

    /// True when every alpha sample is 255.
    pub fn is_opaque(&self) -> bool {
        self.pixels.as_raw().iter().skip(3).step_by(4).all(|&a| a == 255)
    }

    pub(crate) fn buffer(&self) -> &RgbaImage {
        &self.pixels
    }
}
