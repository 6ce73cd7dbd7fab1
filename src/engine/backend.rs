// src/engine/backend.rs
//
// Codec backend seam. A handle owns one ImageBackend and routes every decode
// and encode through it; resize, crop and flatten work on the raster directly.
// NativeBackend is the production implementation (image, mozjpeg, zune-png,
// libwebp, oxipng).

use crate::engine::common::EngineResult;
use crate::engine::decoder;
use crate::engine::encoder::{self, NATIVE_FORMATS};
use crate::engine::limits::Limits;
use crate::engine::raster::RasterImage;
use crate::ops::{EncodingFormat, FormatSet, Quality};

/// Result of a decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub raster: RasterImage,
    /// Container the bytes were recognized as, when it is one of the
    /// encodable formats.
    pub format: Option<EncodingFormat>,
}

/// Trait for codec backends.
///
/// `encode` is only called with formats contained in `supported_formats`;
/// the handle rejects everything else before reaching the backend.
pub trait ImageBackend {
    /// Decode a complete encoded image, enforcing `limits`.
    fn decode(&self, bytes: &[u8], limits: &Limits) -> EngineResult<Decoded>;

    /// Encode `raster` without modifying it.
    fn encode(
        &self,
        raster: &RasterImage,
        format: EncodingFormat,
        quality: Quality,
    ) -> EngineResult<Vec<u8>>;

    /// Formats `encode` can produce.
    fn supported_formats(&self) -> FormatSet;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ImageBackend for NativeBackend {
    fn decode(&self, bytes: &[u8], limits: &Limits) -> EngineResult<Decoded> {
        let (raster, source) = decoder::decode_image(bytes, limits)?;
        Ok(Decoded {
            raster,
            format: source.and_then(|s| s.encoding_format()),
        })
    }

    fn encode(
        &self,
        raster: &RasterImage,
        format: EncodingFormat,
        quality: Quality,
    ) -> EngineResult<Vec<u8>> {
        encoder::encode(raster, format, quality)
    }

    fn supported_formats(&self) -> FormatSet {
        NATIVE_FORMATS
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::ImagingError;
    use std::sync::Mutex;

    /// Mock backend that records operations and returns canned rasters.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: Mutex<Vec<RasterImage>>,
        pub operations: Mutex<Vec<RecordedOp>>,
        pub formats: FormatSet,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode { len: usize },
        Encode {
            width: u32,
            height: u32,
            format: EncodingFormat,
            quality: u8,
        },
    }

    impl MockBackend {
        pub fn with_raster(raster: RasterImage, formats: FormatSet) -> Self {
            Self {
                decode_results: Mutex::new(vec![raster]),
                operations: Mutex::new(Vec::new()),
                formats,
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8], limits: &Limits) -> EngineResult<Decoded> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode { len: bytes.len() });
            let raster = self
                .decode_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ImagingError::decode_failed("no mock raster"))?;
            limits.enforce_dimensions(raster.width(), raster.height())?;
            Ok(Decoded {
                raster,
                format: None,
            })
        }

        fn encode(
            &self,
            raster: &RasterImage,
            format: EncodingFormat,
            quality: Quality,
        ) -> EngineResult<Vec<u8>> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                width: raster.width(),
                height: raster.height(),
                format,
                quality: quality.value(),
            });
            Ok(format.name().as_bytes().to_vec())
        }

        fn supported_formats(&self) -> FormatSet {
            self.formats
        }
    }

    fn solid(width: u32, height: u32) -> RasterImage {
        RasterImage::from_rgba(width, height, vec![255; (width * height * 4) as usize]).unwrap()
    }

    #[test]
    fn mock_records_decode_and_encode() {
        let backend = MockBackend::with_raster(solid(3, 2), FormatSet::PNG);
        let decoded = backend.decode(&[1, 2, 3], &Limits::default()).unwrap();
        assert_eq!(decoded.raster.dimensions(), (3, 2));

        let out = backend
            .encode(&decoded.raster, EncodingFormat::Png, Quality::new(42).unwrap())
            .unwrap();
        assert_eq!(out, b"png");

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Decode { len: 3 },
                RecordedOp::Encode {
                    width: 3,
                    height: 2,
                    format: EncodingFormat::Png,
                    quality: 42,
                },
            ]
        );
    }

    #[test]
    fn mock_without_raster_fails_decode() {
        let backend = MockBackend::default();
        assert!(backend.decode(&[0], &Limits::default()).is_err());
    }

    #[test]
    fn native_backend_reports_encodable_formats() {
        let formats = NativeBackend::new().supported_formats();
        for format in [
            EncodingFormat::Bmp,
            EncodingFormat::Gif,
            EncodingFormat::Ico,
            EncodingFormat::Jpeg,
            EncodingFormat::Png,
            EncodingFormat::Wbmp,
            EncodingFormat::Webp,
        ] {
            assert!(formats.supports(format), "{format}");
        }
        assert!(!formats.supports(EncodingFormat::Ktx));
    }

    #[test]
    fn native_backend_reports_source_format() {
        let raster = solid(4, 4);
        let backend = NativeBackend::new();
        let png = backend
            .encode(&raster, EncodingFormat::Png, Quality::default())
            .unwrap();
        let decoded = backend.decode(&png, &Limits::default()).unwrap();
        assert_eq!(decoded.format, Some(EncodingFormat::Png));
        assert_eq!(decoded.raster, raster);
    }
}
