// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (image + oxipng), WebP (libwebp),
// BMP/GIF/ICO (image crate), WBMP (built-in) with quality settings.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::raster::RasterImage;
use crate::engine::wbmp;
use crate::error::ImagingError;
use crate::ops::{EncodingFormat, FormatSet, Quality};
use image::buffer::ConvertBuffer;
use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::ico::IcoEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

/// Formats the native encoder can produce. ASTC, DNG, KTX and PKM have no
/// encoder in this stack.
pub const NATIVE_FORMATS: FormatSet = FormatSet::BMP
    .union(FormatSet::GIF)
    .union(FormatSet::ICO)
    .union(FormatSet::JPEG)
    .union(FormatSet::PNG)
    .union(FormatSet::WBMP)
    .union(FormatSet::WEBP);

/// ICO directory entries store dimensions in one byte.
const ICO_MAX_DIMENSION: u32 = 256;

/// Single source of truth for deriving per-codec settings from the 1..=100
/// quality value. Bands:
/// - High (>=85): visual quality first
/// - Balanced (70-84)
/// - Fast (50-69)
/// - Fastest (<50)
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityBand {
    High,
    Balanced,
    Fast,
    Fastest,
}

impl QualitySettings {
    pub fn new(quality: Quality) -> Self {
        Self {
            quality: f32::from(quality.value()),
        }
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    fn band(&self) -> QualityBand {
        if self.quality >= 85.0 {
            QualityBand::High
        } else if self.quality >= 70.0 {
            QualityBand::Balanced
        } else if self.quality >= 50.0 {
            QualityBand::Fast
        } else {
            QualityBand::Fastest
        }
    }

    /// Quality 100 is encoded losslessly.
    pub fn webp_lossless(&self) -> bool {
        self.quality >= 100.0
    }

    pub fn webp_method(&self) -> i32 {
        4
    }

    pub fn webp_sns_strength(&self) -> i32 {
        match self.band() {
            QualityBand::High => 50,
            QualityBand::Balanced => 70,
            QualityBand::Fast | QualityBand::Fastest => 80,
        }
    }

    pub fn webp_filter_strength(&self) -> i32 {
        if self.quality >= 80.0 {
            20
        } else if self.quality >= 60.0 {
            30
        } else {
            40
        }
    }

    pub fn webp_filter_sharpness(&self) -> i32 {
        match self.band() {
            QualityBand::High => 2,
            QualityBand::Balanced | QualityBand::Fast | QualityBand::Fastest => 0,
        }
    }

    pub fn jpeg_smoothing(&self) -> u8 {
        if self.quality >= 90.0 {
            0
        } else if self.quality >= 70.0 {
            5
        } else if self.quality >= 60.0 {
            10
        } else {
            18
        }
    }

    /// oxipng effort level. PNG stays lossless at every quality.
    pub fn png_preset(&self) -> u8 {
        match self.band() {
            QualityBand::High => 3,
            QualityBand::Balanced => 2,
            QualityBand::Fast | QualityBand::Fastest => 1,
        }
    }

    /// GIF quantizer speed: 1 (best palette) to 30 (fastest).
    pub fn gif_speed(&self) -> i32 {
        match self.band() {
            QualityBand::High => 1,
            QualityBand::Balanced => 10,
            QualityBand::Fast => 20,
            QualityBand::Fastest => 30,
        }
    }
}

/// Encode `raster` as `format`. Formats outside [`NATIVE_FORMATS`] fail
/// with `UnsupportedFormat`; nothing is substituted.
pub fn encode(
    raster: &RasterImage,
    format: EncodingFormat,
    quality: Quality,
) -> EngineResult<Vec<u8>> {
    match format {
        EncodingFormat::Jpeg => encode_jpeg(raster, quality),
        EncodingFormat::Png => encode_png(raster, quality),
        EncodingFormat::Webp => encode_webp(raster, quality),
        EncodingFormat::Gif => encode_gif(raster, quality),
        EncodingFormat::Bmp => encode_bmp(raster),
        EncodingFormat::Ico => encode_ico(raster),
        EncodingFormat::Wbmp => run_with_panic_policy("encode:wbmp", || wbmp::encode(raster)),
        EncodingFormat::Astc | EncodingFormat::Dng | EncodingFormat::Ktx | EncodingFormat::Pkm => {
            Err(ImagingError::unsupported_format(format.name()))
        }
    }
}

/// JPEG has no alpha channel; alpha is dropped. Flatten first to control
/// what shows through.
fn to_rgb(raster: &RasterImage) -> RgbImage {
    raster.buffer().convert()
}

/// Encode to JPEG using mozjpeg with web-optimized settings
#[cfg(feature = "jpeg-mozjpeg")]
pub fn encode_jpeg(raster: &RasterImage, quality: Quality) -> EngineResult<Vec<u8>> {
    use mozjpeg::{ColorSpace, Compress, ScanMode};

    run_with_panic_policy("encode:jpeg", || {
        let settings = QualitySettings::new(quality);
        let rgb = to_rgb(raster);
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(settings.quality());

        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
        comp.set_smoothing_factor(settings.jpeg_smoothing());

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);

        {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                ImagingError::encode_failed(
                    "jpeg",
                    format!("mozjpeg: failed to start compress: {e:?}"),
                )
            })?;

            let stride = w as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    ImagingError::encode_failed(
                        "jpeg",
                        format!("mozjpeg: failed to write scanlines: {e:?}"),
                    )
                })?;
            }

            writer.finish().map_err(|e| {
                ImagingError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
            })?;
        }

        Ok(output)
    })
}

/// Encode to JPEG using the image crate's baseline encoder
#[cfg(not(feature = "jpeg-mozjpeg"))]
pub fn encode_jpeg(raster: &RasterImage, quality: Quality) -> EngineResult<Vec<u8>> {
    use image::codecs::jpeg::JpegEncoder;

    run_with_panic_policy("encode:jpeg", || {
        let rgb = to_rgb(raster);
        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, quality.value())
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| ImagingError::encode_failed("jpeg", format!("JPEG encode failed: {e}")))?;
        Ok(output)
    })
}

/// Encode to PNG using the image crate, then recompress losslessly with oxipng
pub fn encode_png(raster: &RasterImage, quality: Quality) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let settings = QualitySettings::new(quality);
        let (w, h) = raster.dimensions();
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(raster.as_raw(), w, h, ExtendedColorType::Rgba8)
            .map_err(|e| ImagingError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        // oxipng also reduces RGBA to RGB/palette when the pixels allow it
        let options = oxipng::Options::from_preset(settings.png_preset());
        oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            ImagingError::encode_failed("png", format!("oxipng optimization failed: {e}"))
        })
    })
}

/// Encode to WebP. Quality 100 is lossless; anything lower uses lossy
/// VP8 with band-derived tuning.
pub fn encode_webp(raster: &RasterImage, quality: Quality) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:webp", || {
        let (w, h) = raster.dimensions();
        let encoder = webp::Encoder::from_rgba(raster.as_raw(), w, h);
        let settings = QualitySettings::new(quality);

        if settings.webp_lossless() {
            return Ok(encoder.encode_lossless().to_vec());
        }

        let mut config = webp::WebPConfig::new()
            .map_err(|_| ImagingError::internal_panic("failed to create WebPConfig"))?;
        config.quality = settings.quality();
        config.method = settings.webp_method();
        config.pass = 1;
        config.sns_strength = settings.webp_sns_strength();
        config.autofilter = 1;
        config.filter_strength = settings.webp_filter_strength();
        config.filter_sharpness = settings.webp_filter_sharpness();

        let mem = encoder.encode_advanced(&config).map_err(|e| {
            ImagingError::encode_failed("webp", format!("WebP encode failed: {e:?}"))
        })?;
        Ok(mem.to_vec())
    })
}

/// Encode to GIF; quality selects the palette quantizer speed.
pub fn encode_gif(raster: &RasterImage, quality: Quality) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:gif", || {
        let (w, h) = raster.dimensions();
        let settings = QualitySettings::new(quality);
        let mut output = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut output, settings.gif_speed());
            encoder
                .encode(raster.as_raw(), w, h, ExtendedColorType::Rgba8)
                .map_err(|e| {
                    ImagingError::encode_failed("gif", format!("GIF encode failed: {e}"))
                })?;
        }
        Ok(output)
    })
}

pub fn encode_bmp(raster: &RasterImage) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:bmp", || {
        let (w, h) = raster.dimensions();
        let mut output = Vec::new();
        BmpEncoder::new(&mut output)
            .write_image(raster.as_raw(), w, h, ExtendedColorType::Rgba8)
            .map_err(|e| ImagingError::encode_failed("bmp", format!("BMP encode failed: {e}")))?;
        Ok(output)
    })
}

pub fn encode_ico(raster: &RasterImage) -> EngineResult<Vec<u8>> {
    let (w, h) = raster.dimensions();
    if w > ICO_MAX_DIMENSION || h > ICO_MAX_DIMENSION {
        return Err(ImagingError::encode_failed(
            "ico",
            format!("icons are limited to {ICO_MAX_DIMENSION} pixels per side, image is {w}x{h}"),
        ));
    }
    run_with_panic_policy("encode:ico", || {
        let mut output = Vec::new();
        IcoEncoder::new(&mut output)
            .write_image(raster.as_raw(), w, h, ExtendedColorType::Rgba8)
            .map_err(|e| ImagingError::encode_failed("ico", format!("ICO encode failed: {e}")))?;
        Ok(output)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{Rgba, RgbaImage};

    fn create_test_image(width: u32, height: u32) -> RasterImage {
        RasterImage::from_rgba(
            width,
            height,
            RgbaImage::from_fn(width, height, |x, y| {
                Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
            })
            .into_raw(),
        )
        .unwrap()
    }

    fn q(value: u32) -> Quality {
        Quality::new(value).unwrap()
    }

    #[test]
    fn test_encode_jpeg_produces_valid_jpeg() {
        let img = create_test_image(100, 100);
        let result = encode_jpeg(&img, q(80)).unwrap();
        assert_eq!(&result[0..2], &[0xFF, 0xD8]);
        assert_eq!(&result[result.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_jpeg_quality_extremes() {
        let img = create_test_image(64, 64);
        for value in [1, 100] {
            let result = encode_jpeg(&img, q(value)).unwrap();
            assert_eq!(&result[0..2], &[0xFF, 0xD8]);
        }
    }

    #[test]
    fn test_encode_png_produces_valid_png() {
        let img = create_test_image(100, 100);
        let result = encode_png(&img, q(90)).unwrap();
        assert_eq!(
            &result[0..8],
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
    }

    #[test]
    fn test_encode_png_is_lossless() {
        let img = RasterImage::from_rgba(2, 1, vec![1, 2, 3, 4, 250, 251, 252, 253]).unwrap();
        let result = encode_png(&img, q(1)).unwrap();
        let decoded = image::load_from_memory(&result).unwrap().into_rgba8();
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn test_encode_webp_lossy_and_lossless() {
        let img = create_test_image(50, 50);
        for value in [1, 75, 100] {
            let result = encode_webp(&img, q(value)).unwrap();
            assert_eq!(&result[0..4], b"RIFF");
            assert_eq!(&result[8..12], b"WEBP");
        }
    }

    #[test]
    fn test_encode_gif_bmp_ico_signatures() {
        let img = create_test_image(16, 16);
        assert_eq!(&encode_gif(&img, q(50)).unwrap()[0..3], b"GIF");
        assert_eq!(&encode_bmp(&img).unwrap()[0..2], b"BM");
        assert_eq!(&encode_ico(&img).unwrap()[0..4], &[0, 0, 1, 0]);
    }

    #[test]
    fn test_encode_ico_rejects_oversized() {
        let img = create_test_image(257, 1);
        let err = encode_ico(&img).unwrap_err();
        assert!(matches!(err, ImagingError::EncodeFailed { .. }));
        assert!(err.to_string().contains("257x1"));
    }

    #[test]
    fn test_texture_formats_are_unsupported() {
        let img = create_test_image(4, 4);
        for format in [
            EncodingFormat::Astc,
            EncodingFormat::Dng,
            EncodingFormat::Ktx,
            EncodingFormat::Pkm,
        ] {
            let err = encode(&img, format, Quality::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
            assert!(err.to_string().contains(format.name()));
            assert!(!NATIVE_FORMATS.supports(format));
        }
    }

    #[test]
    fn test_every_native_format_encodes() {
        let img = create_test_image(8, 8);
        for format in NATIVE_FORMATS.formats() {
            let out = encode(&img, format, Quality::default()).unwrap();
            assert!(!out.is_empty(), "{format} produced no bytes");
        }
    }

    #[test]
    fn test_quality_band_mapping_boundaries() {
        assert_eq!(QualitySettings::new(q(90)).gif_speed(), 1);
        assert_eq!(QualitySettings::new(q(75)).gif_speed(), 10);
        assert_eq!(QualitySettings::new(q(60)).gif_speed(), 20);
        assert_eq!(QualitySettings::new(q(40)).gif_speed(), 30);
        assert_eq!(QualitySettings::new(q(95)).jpeg_smoothing(), 0);
        assert_eq!(QualitySettings::new(q(100)).png_preset(), 3);
        assert_eq!(QualitySettings::new(q(10)).png_preset(), 1);
        assert_eq!(QualitySettings::new(q(1)).jpeg_smoothing(), 18);
    }

    #[test]
    fn test_quality_settings_webp_mapping_is_stable() {
        let high = QualitySettings::new(q(90));
        assert_eq!(high.webp_method(), 4);
        assert_eq!(high.webp_sns_strength(), 50);
        assert_eq!(high.webp_filter_strength(), 20);
        assert_eq!(high.webp_filter_sharpness(), 2);
        assert!(!high.webp_lossless());

        let balanced = QualitySettings::new(q(75));
        assert_eq!(balanced.webp_sns_strength(), 70);
        assert_eq!(balanced.webp_filter_strength(), 30);

        let fastest = QualitySettings::new(q(40));
        assert_eq!(fastest.webp_sns_strength(), 80);
        assert_eq!(fastest.webp_filter_strength(), 40);

        assert!(QualitySettings::new(q(100)).webp_lossless());
    }
}
