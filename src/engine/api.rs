// src/engine/api.rs
//
// The image handle. Owns exactly one raster while open and releases it on
// every replace and on dispose.

use crate::engine::backend::{Decoded, ImageBackend, NativeBackend};
use crate::engine::common::EngineResult;
use crate::engine::compositor;
use crate::engine::geometry;
use crate::engine::limits::Limits;
use crate::engine::raster::RasterImage;
use crate::error::ImagingError;
use crate::ops::{EncodingFormat, FormatSet, Quality, Rgb};
use std::io::{Read, Write};
use tracing::debug;

enum State {
    Open(RasterImage),
    Disposed,
}

/// An owned, decoded image.
///
/// Usage:
/// ```no_run
/// use imaging::{aspect, EncodingFormat, Image, Rgb};
///
/// # fn run(bytes: &[u8]) -> imaging::Result<Vec<u8>> {
/// let mut img = Image::from_bytes(bytes)?;
/// img.crop(aspect::WIDESCREEN_16X9)?;
/// img.resize(1280, 720)?;
/// img.flatten(Rgb::WHITE)?;
/// img.encode(EncodingFormat::Jpeg, 85)
/// # }
/// ```
///
/// A handle only exists once decoding succeeded. Mutations build the new
/// raster first and swap it in afterwards, so a failed call leaves the
/// previous raster exactly as it was.
pub struct Image<B: ImageBackend = NativeBackend> {
    state: State,
    backend: B,
    limits: Limits,
    source_format: Option<EncodingFormat>,
}

impl Image<NativeBackend> {
    /// Decode everything `reader` yields with the native backend.
    pub fn decode<R: Read>(reader: R) -> EngineResult<Self> {
        Self::decode_reader_with(reader, NativeBackend, Limits::default())
    }

    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        Self::decode_with(bytes, NativeBackend, Limits::default())
    }

    pub fn from_bytes_with_limits(bytes: &[u8], limits: Limits) -> EngineResult<Self> {
        Self::decode_with(bytes, NativeBackend, limits)
    }

    /// Wrap an already decoded raster.
    pub fn from_raster(raster: RasterImage) -> Self {
        Self::open(raster, None, NativeBackend, Limits::default())
    }
}

impl<B: ImageBackend> Image<B> {
    pub fn decode_with(bytes: &[u8], backend: B, limits: Limits) -> EngineResult<Self> {
        let Decoded { raster, format } = backend.decode(bytes, &limits)?;
        debug!(
            target: "imaging::handle",
            width = raster.width(),
            height = raster.height(),
            bytes = bytes.len(),
            format = format.map(EncodingFormat::name),
            "decoded"
        );
        Ok(Self::open(raster, format, backend, limits))
    }

    /// Read `reader` to the end, then decode. With an input byte cap the
    /// read stops one byte past it so oversized streams are never buffered
    /// in full.
    pub fn decode_reader_with<R: Read>(
        mut reader: R,
        backend: B,
        limits: Limits,
    ) -> EngineResult<Self> {
        let mut bytes = Vec::new();
        let read = match limits.max_input_bytes {
            Some(max) => reader.take(max.saturating_add(1)).read_to_end(&mut bytes),
            None => reader.read_to_end(&mut bytes),
        };
        read.map_err(|e| ImagingError::decode_failed(format!("failed to read input: {e}")))?;
        Self::decode_with(&bytes, backend, limits)
    }

    fn open(
        raster: RasterImage,
        source_format: Option<EncodingFormat>,
        backend: B,
        limits: Limits,
    ) -> Self {
        Self {
            state: State::Open(raster),
            backend,
            limits,
            source_format,
        }
    }

    fn current(&self, operation: &'static str) -> EngineResult<&RasterImage> {
        match &self.state {
            State::Open(raster) => Ok(raster),
            State::Disposed => Err(ImagingError::invalid_state(operation)),
        }
    }

    /// Build the replacement from the current raster, then swap it in. The
    /// old buffer is dropped only after the new one exists.
    fn replace<F>(&mut self, operation: &'static str, f: F) -> EngineResult<()>
    where
        F: FnOnce(&RasterImage, &Limits) -> EngineResult<RasterImage>,
    {
        let next = f(self.current(operation)?, &self.limits)?;
        let (width, height) = next.dimensions();
        let previous = std::mem::replace(&mut self.state, State::Open(next));
        drop(previous);
        debug!(target: "imaging::handle", operation, width, height, "replaced raster");
        Ok(())
    }

    pub fn width(&self) -> EngineResult<u32> {
        Ok(self.current("width")?.width())
    }

    pub fn height(&self) -> EngineResult<u32> {
        Ok(self.current("height")?.height())
    }

    pub fn dimensions(&self) -> EngineResult<(u32, u32)> {
        Ok(self.current("dimensions")?.dimensions())
    }

    /// Read-only view of the current pixels.
    pub fn raster(&self) -> EngineResult<&RasterImage> {
        self.current("raster")
    }

    /// Format the input was recognized as, if it is one of the encodable ones.
    pub fn source_format(&self) -> EngineResult<Option<EncodingFormat>> {
        self.current("source_format")?;
        Ok(self.source_format)
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Formats `encode` accepts on this handle.
    pub fn supported_formats(&self) -> FormatSet {
        self.backend.supported_formats()
    }

    /// Resample to exactly `width` x `height` (Lanczos3).
    pub fn resize(&mut self, width: u32, height: u32) -> EngineResult<()> {
        self.replace("resize", |raster, limits| {
            geometry::resize_lanczos3(raster, width, height, limits)
        })
    }

    /// Keep the largest centered region with `width / height == aspect`.
    pub fn crop(&mut self, aspect: f64) -> EngineResult<()> {
        self.replace("crop", |raster, _| geometry::crop_to_aspect(raster, aspect))
    }

    /// Composite over an opaque `background`; the result has no transparency.
    pub fn flatten(&mut self, background: Rgb) -> EngineResult<()> {
        self.replace("flatten", |raster, _| Ok(compositor::flatten(raster, background)))
    }

    /// Encode the current raster. `quality` must be in `1..=100`; it is
    /// validated before the format, and both before any encoding work.
    pub fn encode(&self, format: EncodingFormat, quality: u32) -> EngineResult<Vec<u8>> {
        let raster = self.current("encode")?;
        let quality = Quality::new(quality)?;
        if !self.backend.supported_formats().supports(format) {
            return Err(ImagingError::unsupported_format(format.name()));
        }
        let bytes = self.backend.encode(raster, format, quality)?;
        debug!(
            target: "imaging::handle",
            format = format.name(),
            quality = quality.value(),
            bytes = bytes.len(),
            "encoded"
        );
        Ok(bytes)
    }

    /// Encode at quality 100.
    pub fn encode_default(&self, format: EncodingFormat) -> EngineResult<Vec<u8>> {
        self.encode(format, Quality::MAX)
    }

    /// Encode into `writer`; returns the number of bytes written.
    pub fn encode_to<W: Write>(
        &self,
        mut writer: W,
        format: EncodingFormat,
        quality: u32,
    ) -> EngineResult<usize> {
        let bytes = self.encode(format, quality)?;
        writer.write_all(&bytes).map_err(|e| {
            ImagingError::encode_failed(format.name(), format!("failed to write output: {e}"))
        })?;
        Ok(bytes.len())
    }

    /// Release the raster. Calling it again is a no-op; every other
    /// operation fails with `InvalidState` from now on.
    pub fn dispose(&mut self) {
        if let State::Open(raster) = std::mem::replace(&mut self.state, State::Disposed) {
            debug!(
                target: "imaging::handle",
                width = raster.width(),
                height = raster.height(),
                "disposed"
            );
        }
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, State::Disposed)
    }
}

impl<B: ImageBackend> Drop for Image<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<B: ImageBackend> std::fmt::Debug for Image<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Image");
        match &self.state {
            State::Open(raster) => s.field("dimensions", &raster.dimensions()),
            State::Disposed => s.field("dimensions", &"disposed"),
        };
        s.field("source_format", &self.source_format)
            .field("limits", &self.limits)
            .finish()
    }
}
