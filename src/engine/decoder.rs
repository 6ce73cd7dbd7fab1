// src/engine/decoder.rs
//
// Decoder operations: JPEG (mozjpeg), PNG (zune-png), WebP (libwebp),
// WBMP (built-in), everything else through the image crate.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::limits::Limits;
use crate::engine::raster::RasterImage;
use crate::engine::wbmp;
use crate::error::ImagingError;
use crate::ops::EncodingFormat;
use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

/// Container detected from magic bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Image(ImageFormat),
    Wbmp,
}

impl SourceFormat {
    pub fn encoding_format(self) -> Option<EncodingFormat> {
        match self {
            Self::Image(format) => EncodingFormat::from_image_format(format),
            Self::Wbmp => Some(EncodingFormat::Wbmp),
        }
    }
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo)
#[cfg(feature = "jpeg-mozjpeg")]
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> EngineResult<DynamicImage> {
    use mozjpeg::Decompress;

    run_with_panic_policy("decode:mozjpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(ImagingError::decode_failed(
                "mozjpeg: missing JPEG EOI marker",
            ));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            ImagingError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            ImagingError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width() as u32;
        let height = decompress.height() as u32;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            ImagingError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();

        let rgb_image = RgbImage::from_raw(width, height, flat_pixels).ok_or_else(|| {
            ImagingError::decode_failed("mozjpeg: failed to create image from raw data")
        })?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

/// Decode PNG using zune-png. 16-bit input is stripped to 8-bit.
///
/// zune caps each side at 16384 by default; the caps follow `limits` instead.
pub fn decode_png_zune(data: &[u8], limits: &Limits) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:png", || {
        let max_side = limits.max_dimension as usize;
        let options = DecoderOptions::default()
            .png_set_strip_to_8bit(true)
            .set_max_width(max_side)
            .set_max_height(max_side);
        let mut decoder = PngDecoder::new_with_options(Cursor::new(data), options);
        let pixels = decoder
            .decode()
            .map_err(|e| ImagingError::decode_failed(format!("png: decode failed: {e}")))?;

        let info = decoder
            .info()
            .ok_or_else(|| ImagingError::decode_failed("png: missing header info"))?;
        let width = info.width as u32;
        let height = info.height as u32;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(ImagingError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ImagingError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8),
            ColorSpace::RGBA => {
                RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
            }
            ColorSpace::Luma => {
                GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8)
            }
            ColorSpace::LumaA => {
                GrayAlphaImage::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
            }
            other => {
                return Err(ImagingError::decode_failed(format!(
                    "png: unsupported colorspace {other:?}"
                )))
            }
        };

        img.ok_or_else(|| ImagingError::decode_failed("png: pixel buffer does not match header"))
    })
}

/// Decode WebP using libwebp. Animated WebP keeps its first frame via the image crate.
pub fn decode_webp_libwebp(data: &[u8], limits: &Limits) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:webp", || {
        // Parse header first to avoid allocating huge buffers on malformed files
        let features = BitstreamFeatures::new(data).ok_or_else(|| {
            ImagingError::decode_failed("webp: failed to read bitstream features")
        })?;

        if features.has_animation() {
            return decode_with_image_crate(data, limits);
        }

        limits.enforce_dimensions(features.width(), features.height())?;

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| ImagingError::decode_failed("webp: decode failed"))?;

        Ok(decoded.to_image())
    })
}

/// Decode any other container the image crate recognizes, with its own
/// allocation limits derived from ours.
pub fn decode_with_image_crate(data: &[u8], limits: &Limits) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ImagingError::decode_failed(format!("failed to read image header: {e}")))?;

        let mut image_limits = image::Limits::default();
        image_limits.max_image_width = Some(limits.max_dimension);
        image_limits.max_image_height = Some(limits.max_dimension);
        reader.limits(image_limits);

        reader
            .decode()
            .map_err(|e| ImagingError::decode_failed(format!("decode failed: {e}")))
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<SourceFormat> {
    if let Ok(format) = image::guess_format(bytes) {
        return Some(SourceFormat::Image(format));
    }
    wbmp::looks_like_wbmp(bytes).then_some(SourceFormat::Wbmp)
}

/// Header dimensions without decoding pixels, when the header is readable.
pub fn header_dimensions(bytes: &[u8], format: SourceFormat) -> Option<(u32, u32)> {
    match format {
        SourceFormat::Wbmp => wbmp::dimensions(bytes),
        SourceFormat::Image(format) => {
            ImageReader::with_format(Cursor::new(bytes), format)
                .into_dimensions()
                .ok()
        }
    }
}

/// Unified decode entrypoint:
/// - Reject oversized input before touching it
/// - Detect format once (magic bytes)
/// - Check header dimensions against the limits before allocating pixels
/// - Route to the specialised decoder and normalize to RGBA8
pub fn decode_image(
    bytes: &[u8],
    limits: &Limits,
) -> EngineResult<(RasterImage, Option<SourceFormat>)> {
    limits.enforce_source_len(bytes.len())?;
    if bytes.is_empty() {
        return Err(ImagingError::decode_failed("input is empty"));
    }

    let detected = detect_format(bytes);
    if let Some(format) = detected {
        if let Some((width, height)) = header_dimensions(bytes, format) {
            limits.enforce_dimensions(width, height)?;
        }
    }

    let routed = match detected {
        #[cfg(feature = "jpeg-mozjpeg")]
        Some(SourceFormat::Image(ImageFormat::Jpeg)) => decode_jpeg_mozjpeg(bytes),
        Some(SourceFormat::Image(ImageFormat::Png)) => decode_png_zune(bytes, limits),
        Some(SourceFormat::Image(ImageFormat::WebP)) => decode_webp_libwebp(bytes, limits),
        Some(SourceFormat::Wbmp) => wbmp::decode(bytes).map(DynamicImage::ImageRgba8),
        Some(SourceFormat::Image(_)) => decode_with_image_crate(bytes, limits),
        None => {
            return Err(ImagingError::decode_failed(
                "unrecognized image format",
            ))
        }
    };
    // A codec that panicked on the input is a decode failure like any other
    let img = routed.map_err(|e| match e {
        ImagingError::InternalPanic { message } => ImagingError::decode_failed(message),
        other => other,
    })?;

    // Header may lie; check what was actually decoded too
    limits.enforce_dimensions(img.width(), img.height())?;
    let raster = RasterImage::from_dynamic(img)?;
    Ok((raster, detected))
}
