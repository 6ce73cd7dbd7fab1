// src/engine/limits.rs
//
// Decode/resize limits. Checked against header dimensions before any
// pixel buffer is allocated.

use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::ImagingError;

const STRICT_MAX_PIXELS: u64 = 40_000_000; // ~8K x 5K
const STRICT_MAX_BYTES: u64 = 32 * 1024 * 1024; // 32MB input cap

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_dimension: u32,
    pub max_pixels: u64,
    pub max_input_bytes: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
            max_pixels: MAX_PIXELS,
            max_input_bytes: None,
        }
    }
}

impl Limits {
    /// Tighter limits for untrusted uploads.
    pub fn strict() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
            max_pixels: STRICT_MAX_PIXELS,
            max_input_bytes: Some(STRICT_MAX_BYTES),
        }
    }

    /// Values above the global ceilings are clamped to them.
    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max.min(MAX_DIMENSION);
        self
    }

    pub fn with_max_pixels(mut self, max: u64) -> Self {
        self.max_pixels = max.min(MAX_PIXELS);
        self
    }

    pub fn with_max_input_bytes(mut self, max: u64) -> Self {
        self.max_input_bytes = Some(max);
        self
    }

    pub fn enforce_source_len(&self, len: usize) -> Result<(), ImagingError> {
        if let Some(limit) = self.max_input_bytes {
            let len_u64 = len as u64;
            if len_u64 > limit {
                return Err(ImagingError::input_too_large(len_u64, limit));
            }
        }
        Ok(())
    }

    pub fn enforce_dimensions(&self, width: u32, height: u32) -> Result<(), ImagingError> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(ImagingError::dimension_exceeds_limit(
                width.max(height),
                self.max_dimension,
            ));
        }
        let pixels = width as u64 * height as u64;
        if pixels > self.max_pixels {
            return Err(ImagingError::pixel_count_exceeds_limit(
                pixels,
                self.max_pixels,
            ));
        }
        Ok(())
    }
}
