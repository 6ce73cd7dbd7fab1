// src/ops.rs
//
// Value types shared by the handle and the backends.
// These are cheap to create and copy - the expensive work happens in engine/.

use crate::error::{ImagingError, Result};
use bitflags::bitflags;
use std::fmt;

/// Formats that image data can be encoded with.
///
/// This is a closed set. A backend may implement only a subset; asking for
/// anything else fails with `UnsupportedFormat` at encode time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncodingFormat {
    /// Adaptable Scalable Texture Compression
    Astc,
    /// Windows bitmap
    Bmp,
    /// Digital Negative
    Dng,
    /// Graphics Interchange Format
    Gif,
    /// Windows icon
    Ico,
    /// JPEG
    Jpeg,
    /// Khronos Texture
    Ktx,
    /// Ericsson Texture Compression container
    Pkm,
    /// Portable Network Graphics
    Png,
    /// Wireless Application Protocol Bitmap
    Wbmp,
    /// WebP
    Webp,
}

impl EncodingFormat {
    pub const ALL: [EncodingFormat; 11] = [
        Self::Astc,
        Self::Bmp,
        Self::Dng,
        Self::Gif,
        Self::Ico,
        Self::Jpeg,
        Self::Ktx,
        Self::Pkm,
        Self::Png,
        Self::Wbmp,
        Self::Webp,
    ];

    /// Lowercase short name, used in error messages and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Astc => "astc",
            Self::Bmp => "bmp",
            Self::Dng => "dng",
            Self::Gif => "gif",
            Self::Ico => "ico",
            Self::Jpeg => "jpeg",
            Self::Ktx => "ktx",
            Self::Pkm => "pkm",
            Self::Png => "png",
            Self::Wbmp => "wbmp",
            Self::Webp => "webp",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "astc" => Ok(Self::Astc),
            "bmp" => Ok(Self::Bmp),
            "dng" => Ok(Self::Dng),
            "gif" => Ok(Self::Gif),
            "ico" => Ok(Self::Ico),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "ktx" => Ok(Self::Ktx),
            "pkm" => Ok(Self::Pkm),
            "png" => Ok(Self::Png),
            "wbmp" => Ok(Self::Wbmp),
            "webp" => Ok(Self::Webp),
            other => Err(ImagingError::invalid_argument(
                "format",
                other.to_string(),
                "Expected one of astc, bmp, dng, gif, ico, jpeg, ktx, pkm, png, wbmp, webp",
            )),
        }
    }

    /// Map a container detected by the `image` crate onto the closed set.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Ico => Some(Self::Ico),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }

    fn flag(self) -> FormatSet {
        match self {
            Self::Astc => FormatSet::ASTC,
            Self::Bmp => FormatSet::BMP,
            Self::Dng => FormatSet::DNG,
            Self::Gif => FormatSet::GIF,
            Self::Ico => FormatSet::ICO,
            Self::Jpeg => FormatSet::JPEG,
            Self::Ktx => FormatSet::KTX,
            Self::Pkm => FormatSet::PKM,
            Self::Png => FormatSet::PNG,
            Self::Wbmp => FormatSet::WBMP,
            Self::Webp => FormatSet::WEBP,
        }
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of encoding formats a backend can produce.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FormatSet: u16 {
        const ASTC = 1 << 0;
        const BMP = 1 << 1;
        const DNG = 1 << 2;
        const GIF = 1 << 3;
        const ICO = 1 << 4;
        const JPEG = 1 << 5;
        const KTX = 1 << 6;
        const PKM = 1 << 7;
        const PNG = 1 << 8;
        const WBMP = 1 << 9;
        const WEBP = 1 << 10;
    }
}

impl FormatSet {
    pub fn supports(self, format: EncodingFormat) -> bool {
        self.contains(format.flag())
    }

    /// Formats in declaration order.
    pub fn formats(self) -> impl Iterator<Item = EncodingFormat> {
        EncodingFormat::ALL
            .into_iter()
            .filter(move |format| self.supports(*format))
    }
}

impl From<EncodingFormat> for FormatSet {
    fn from(format: EncodingFormat) -> Self {
        format.flag()
    }
}

/// Encode quality in `1..=100`.
///
/// Lossy codecs map it onto their own scale; lossless codecs accept the
/// whole range and ignore the magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    pub fn new(value: u32) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ImagingError::invalid_argument(
                "quality",
                value.to_string(),
                "The quality needs to be between 1 and 100.",
            ));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Opaque background color used when flattening transparency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Commonly used aspect ratios (width / height) for cropping.
pub mod aspect {
    /// Square 1:1
    pub const SQUARE: f64 = 1.0;
    /// Standard 4:3
    pub const STANDARD_4X3: f64 = 4.0 / 3.0;
    /// Standard 3:2
    pub const STANDARD_3X2: f64 = 3.0 / 2.0;
    /// Widescreen 16:10
    pub const WIDESCREEN_16X10: f64 = 16.0 / 10.0;
    /// Widescreen 16:9
    pub const WIDESCREEN_16X9: f64 = 16.0 / 9.0;
}
