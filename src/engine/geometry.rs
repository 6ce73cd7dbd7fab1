// src/engine/geometry.rs
//
// Geometry: Lanczos3 resize and centered aspect-ratio crop.
// Both read the current raster and build a new one; the caller swaps it in.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::limits::Limits;
use crate::engine::raster::RasterImage;
use crate::error::ImagingError;
use fast_image_resize::{self as fir, ImageBufferError, MulDiv, PixelType, ResizeOptions};
use image::{imageops, imageops::FilterType, RgbaImage};

/// Pixel rectangle kept by an aspect crop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

fn invalid_aspect(aspect: f64, reason: &'static str) -> ImagingError {
    ImagingError::invalid_argument("aspect", aspect.to_string(), reason)
}

/// Largest centered rectangle of `aspect` (width / height) inside
/// `width` x `height`.
///
/// The candidate height at full width is `floor(width / aspect)`. When it
/// fits, rows `[offset, height - offset)` are kept with
/// `offset = floor((height - desired) / 2)`; otherwise columns are trimmed
/// the same way using `floor(height * aspect)`. An odd difference leaves the
/// extra pixel inside the kept band.
pub fn aspect_crop_rect(width: u32, height: u32, aspect: f64) -> EngineResult<CropRect> {
    if !aspect.is_finite() {
        return Err(invalid_aspect(aspect, "The aspect ratio must be finite."));
    }
    if aspect <= 0.0 {
        return Err(invalid_aspect(aspect, "The aspect ratio must be positive."));
    }

    let height_factor = 1.0 / aspect;
    let desired_height = (width as f64 * height_factor).floor();

    let rect = if desired_height <= height as f64 {
        let desired_height = desired_height as u32;
        if desired_height == 0 {
            return Err(invalid_aspect(
                aspect,
                "The aspect ratio is too wide for the image: the crop would have zero height.",
            ));
        }
        let offset = (height - desired_height) / 2;
        CropRect {
            x: 0,
            y: offset,
            width,
            height: height - 2 * offset,
        }
    } else {
        let desired_width = ((height as f64 * aspect).floor() as u32).min(width);
        if desired_width == 0 {
            return Err(invalid_aspect(
                aspect,
                "The aspect ratio is too tall for the image: the crop would have zero width.",
            ));
        }
        let offset = (width - desired_width) / 2;
        CropRect {
            x: offset,
            y: 0,
            width: width - 2 * offset,
            height,
        }
    };

    if rect.width == 0 || rect.height == 0 {
        return Err(invalid_aspect(aspect, "The crop would be empty."));
    }
    Ok(rect)
}

/// Copy the aspect-crop region of `raster` into its own buffer.
pub fn crop_to_aspect(raster: &RasterImage, aspect: f64) -> EngineResult<RasterImage> {
    let (width, height) = raster.dimensions();
    let rect = aspect_crop_rect(width, height, aspect)?;
    let cropped =
        imageops::crop_imm(raster.buffer(), rect.x, rect.y, rect.width, rect.height).to_image();
    Ok(RasterImage::from_buffer(cropped))
}

fn validate_resize_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width == 0 {
        return Err(ImagingError::invalid_argument(
            "width",
            "0",
            "The resize width must be positive.",
        ));
    }
    if height == 0 {
        return Err(ImagingError::invalid_argument(
            "height",
            "0",
            "The resize height must be positive.",
        ));
    }
    Ok(())
}

fn default_resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

/// Resample `raster` to exactly `dst_width` x `dst_height` with Lanczos3.
///
/// Alpha is premultiplied around the convolution so transparent pixels do
/// not bleed their color into neighbours. If fast_image_resize rejects the
/// buffer the image crate's Lanczos3 is used instead.
pub fn resize_lanczos3(
    raster: &RasterImage,
    dst_width: u32,
    dst_height: u32,
    limits: &Limits,
) -> EngineResult<RasterImage> {
    validate_resize_dimensions(dst_width, dst_height)?;
    limits.enforce_dimensions(dst_width, dst_height)?;

    let (src_width, src_height) = raster.dimensions();
    if (src_width, src_height) == (dst_width, dst_height) {
        return Ok(raster.clone());
    }

    let premultiply = !raster.is_opaque();
    let mut src_pixels = raster.as_raw().to_vec();

    let primary_result = match fir::images::Image::from_slice_u8(
        src_width,
        src_height,
        src_pixels.as_mut_slice(),
        PixelType::U8x4,
    ) {
        Ok(src_image) => resize_with_source_image(src_image, premultiply, dst_width, dst_height),
        Err(ImageBufferError::InvalidBufferAlignment) => {
            copy_pixels_to_aligned_image(src_width, src_height, raster.as_raw()).and_then(
                |aligned| resize_with_source_image(aligned, premultiply, dst_width, dst_height),
            )
        }
        Err(other) => Err(format!("fir source image error: {other:?}")),
    };

    let resized = match primary_result {
        Ok(img) => img,
        Err(reason) => run_with_panic_policy("resize:image", || {
            Ok(imageops::resize(
                raster.buffer(),
                dst_width,
                dst_height,
                FilterType::Lanczos3,
            ))
        })
        .map_err(|fallback_err| {
            ImagingError::resize_failed(
                (src_width, src_height),
                (dst_width, dst_height),
                format!("{reason}; image crate fallback failed: {fallback_err}"),
            )
        })?,
    };

    Ok(RasterImage::from_buffer(resized))
}

fn copy_pixels_to_aligned_image(
    width: u32,
    height: u32,
    src_pixels: &[u8],
) -> std::result::Result<fir::images::Image<'static>, String> {
    let mut aligned_image = fir::images::Image::new(width, height, PixelType::U8x4);
    let aligned_buffer = aligned_image.buffer_mut();
    if aligned_buffer.len() != src_pixels.len() {
        return Err(format!(
            "fir alignment fallback buffer mismatch. expected {} bytes, got {} bytes",
            src_pixels.len(),
            aligned_buffer.len()
        ));
    }
    aligned_buffer.copy_from_slice(src_pixels);
    Ok(aligned_image)
}

fn resize_with_source_image(
    mut src_image: fir::images::Image<'_>,
    premultiply: bool,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<RgbaImage, String> {
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, PixelType::U8x4);

    let mul_div = MulDiv::default();
    if premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &default_resize_options())
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    RgbaImage::from_raw(dst_width, dst_height, dst_image.into_vec())
        .ok_or_else(|| "failed to create rgba image from resized data".to_string())
}
