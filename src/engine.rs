// src/engine.rs
//
// The core of imaging. One owned handle that:
// 1. Decodes a complete input through a codec backend
// 2. Replaces its raster on resize / crop / flatten (construct-then-swap)
// 3. Encodes the current raster on demand without touching it
//
// This file is a facade over the decomposed modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod backend;
mod common;
mod compositor;
mod decoder;
mod encoder;
mod geometry;
mod limits;
mod raster;
mod wbmp;

pub use api::Image;
pub use backend::{Decoded, ImageBackend, NativeBackend};
pub use common::{run_with_panic_policy, EngineResult};
pub use compositor::flatten;
pub use decoder::{decode_image, detect_format, header_dimensions, SourceFormat};
pub use encoder::{encode, QualitySettings, NATIVE_FORMATS};
pub use geometry::{aspect_crop_rect, crop_to_aspect, resize_lanczos3, CropRect};
pub use limits::Limits;
pub use raster::RasterImage;
