// src/lib.rs
//
// imaging: decode an image, resize / aspect-crop / flatten it, and encode
// it again, all through one owned handle.
//
// Architecture:
// - engine: handle, codec backend, geometry, compositing
// - error: unified error type
// - ops: value types (formats, quality, colors, aspect presets)

pub mod engine;
pub mod error;
pub mod ops;

pub use engine::{Image, ImageBackend, Limits, NativeBackend, RasterImage};
pub use error::{ErrorKind, ImagingError, Result};
pub use ops::{aspect, EncodingFormat, FormatSet, Quality, Rgb};
