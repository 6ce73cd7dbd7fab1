// src/error.rs
//
// Unified error handling for imaging
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - Decode: input bytes are not a complete, recognized image
// - InvalidArgument: caller-supplied parameter violates a precondition
// - UnsupportedFormat: the active backend cannot produce the format
// - InvalidState: operation on a disposed handle
// - ResourceExhausted: dimension/pixel/byte limits
// - Backend: codec or resampler failed on otherwise valid input

use std::borrow::Cow;
use thiserror::Error;

/// Coarse classification of an [`ImagingError`].
///
/// Callers that only need to branch on "what kind of mistake was this"
/// match on the kind instead of the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input bytes are not a valid/complete recognized image
    Decode,
    /// A documented precondition on a parameter was violated
    InvalidArgument,
    /// The requested encode format is not implemented by the backend
    UnsupportedFormat,
    /// The handle has been disposed
    InvalidState,
    /// Dimension, pixel-count or input-size limits were exceeded
    ResourceExhausted,
    /// The codec or resampler failed
    Backend,
}

/// imaging error types
///
/// Every variant carries enough context (parameter name, value, format)
/// for the caller to correct the request.
#[derive(Debug, Error)]
pub enum ImagingError {
    // Decode Errors
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    // Size Limit Errors
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    #[error("Input size {len} bytes exceeds maximum {max} bytes")]
    InputTooLarge { len: u64, max: u64 },

    // Argument Errors
    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Encoding format {format} is not supported by the active backend")]
    UnsupportedFormat { format: Cow<'static, str> },

    // State Errors
    #[error("Cannot {operation}: image handle has been disposed")]
    InvalidState { operation: Cow<'static, str> },

    // Processing Errors
    #[error(
        "Resize failed ({}x{} -> {}x{}): {message}",
        .source_width,
        .source_height,
        .target_width,
        .target_height
    )]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

// Constructor Helpers
impl ImagingError {
    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn input_too_large(len: u64, max: u64) -> Self {
        Self::InputTooLarge { len, max }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn invalid_state(operation: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidState {
            operation: operation.into(),
        }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DecodeFailed { .. } => ErrorKind::Decode,

            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,

            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,

            Self::InvalidState { .. } => ErrorKind::InvalidState,

            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::InputTooLarge { .. } => ErrorKind::ResourceExhausted,

            Self::ResizeFailed { .. } | Self::EncodeFailed { .. } | Self::InternalPanic { .. } => {
                ErrorKind::Backend
            }
        }
    }

    /// Check if this error is recoverable (caller can fix the request)
    ///
    /// Argument, state and limit errors are recoverable; codec failures
    /// on the same input will fail the same way again.
    pub fn is_recoverable(&self) -> bool {
        match self.kind() {
            ErrorKind::InvalidArgument
            | ErrorKind::UnsupportedFormat
            | ErrorKind::InvalidState
            | ErrorKind::ResourceExhausted => true,
            ErrorKind::Decode | ErrorKind::Backend => false,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, ImagingError>;
