// src/engine/wbmp.rs
//
// WBMP (Wireless Bitmap, type 0) reader and writer.
//
// Layout: type (multi-byte int, 0) | fix header (0x00) | width | height |
// rows of ceil(width / 8) bytes, MSB first, 1 = white.
// Multi-byte ints are big-endian 7-bit groups with 0x80 as continuation.

use crate::engine::common::EngineResult;
use crate::engine::raster::RasterImage;
use crate::error::ImagingError;
use image::{Rgba, RgbaImage};

const LUMA_THRESHOLD: u32 = 128;

struct Header {
    width: u32,
    height: u32,
    data_offset: usize,
}

fn read_multibyte(bytes: &[u8], pos: &mut usize) -> Option<u32> {
    let mut value: u32 = 0;
    // u32 needs at most five 7-bit groups
    for _ in 0..5 {
        let byte = *bytes.get(*pos)?;
        *pos += 1;
        value = value.checked_mul(128)? | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Some(value);
        }
    }
    None
}

fn write_multibyte(out: &mut Vec<u8>, mut value: u32) {
    let mut groups = [0u8; 5];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7F) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | continuation);
    }
}

fn row_bytes(width: u32) -> usize {
    (width as usize).div_ceil(8)
}

fn parse_header(bytes: &[u8]) -> Option<Header> {
    let mut pos = 0;
    if read_multibyte(bytes, &mut pos)? != 0 {
        return None;
    }
    // Extension headers (bit 7) are not part of type 0
    if *bytes.get(pos)? != 0 {
        return None;
    }
    pos += 1;
    let width = read_multibyte(bytes, &mut pos)?;
    let height = read_multibyte(bytes, &mut pos)?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Header {
        width,
        height,
        data_offset: pos,
    })
}

fn expected_len(header: &Header) -> Option<usize> {
    row_bytes(header.width)
        .checked_mul(header.height as usize)?
        .checked_add(header.data_offset)
}

/// WBMP has no magic number; a buffer is treated as WBMP only when the
/// header parses and the payload length matches it exactly.
pub fn looks_like_wbmp(bytes: &[u8]) -> bool {
    parse_header(bytes)
        .and_then(|h| expected_len(&h))
        .is_some_and(|len| len == bytes.len())
}

/// Header dimensions without decoding pixels.
pub fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    parse_header(bytes).map(|h| (h.width, h.height))
}

pub fn decode(bytes: &[u8]) -> EngineResult<RgbaImage> {
    let header =
        parse_header(bytes).ok_or_else(|| ImagingError::decode_failed("wbmp: invalid header"))?;
    let needed = expected_len(&header)
        .ok_or_else(|| ImagingError::decode_failed("wbmp: dimensions overflow"))?;
    if bytes.len() < needed {
        return Err(ImagingError::decode_failed(format!(
            "wbmp: truncated data, expected {needed} bytes, got {}",
            bytes.len()
        )));
    }

    let stride = row_bytes(header.width);
    let data = &bytes[header.data_offset..needed];
    let img = RgbaImage::from_fn(header.width, header.height, |x, y| {
        let byte = data[y as usize * stride + (x as usize / 8)];
        let bit = (byte >> (7 - (x % 8))) & 1;
        let v = if bit == 1 { 255 } else { 0 };
        Rgba([v, v, v, 255])
    });
    Ok(img)
}

/// Threshold to 1 bit. Transparent pixels read as white.
pub fn encode(raster: &RasterImage) -> EngineResult<Vec<u8>> {
    let (width, height) = raster.dimensions();
    let stride = row_bytes(width);
    let mut out = Vec::with_capacity(8 + stride * height as usize);
    write_multibyte(&mut out, 0);
    out.push(0);
    write_multibyte(&mut out, width);
    write_multibyte(&mut out, height);

    for row in raster.buffer().rows() {
        let mut packed = vec![0u8; stride];
        for (x, px) in row.enumerate() {
            let [r, g, b, a] = px.0;
            let a = u32::from(a);
            let over_white = |c: u8| (u32::from(c) * a + 255 * (255 - a) + 127) / 255;
            let luma = (299 * over_white(r) + 587 * over_white(g) + 114 * over_white(b)) / 1000;
            if luma >= LUMA_THRESHOLD {
                packed[x / 8] |= 0x80 >> (x % 8);
            }
        }
        out.extend_from_slice(&packed);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multibyte_round_trip() {
        for value in [0u32, 1, 127, 128, 300, 16_383, 16_384, 32_768, u32::MAX] {
            let mut buf = Vec::new();
            write_multibyte(&mut buf, value);
            let mut pos = 0;
            assert_eq!(read_multibyte(&buf, &mut pos), Some(value));
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn multibyte_encoding_of_300() {
        let mut buf = Vec::new();
        write_multibyte(&mut buf, 300);
        assert_eq!(buf, vec![0x82, 0x2C]);
    }

    #[test]
    fn encodes_header_and_packed_rows() {
        // 10x1: white, black, then 8 whites
        let mut data = Vec::new();
        for x in 0..10 {
            let v = if x == 1 { 0 } else { 255 };
            data.extend_from_slice(&[v, v, v, 255]);
        }
        let raster = RasterImage::from_rgba(10, 1, data).unwrap();
        let out = encode(&raster).unwrap();
        assert_eq!(out, vec![0x00, 0x00, 10, 1, 0b1011_1111, 0b1100_0000]);
        assert!(looks_like_wbmp(&out));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let raster = RasterImage::from_rgba(1, 1, vec![0, 0, 0, 0]).unwrap();
        let out = encode(&raster).unwrap();
        assert_eq!(out[4], 0x80);
    }

    #[test]
    fn decode_restores_dimensions_and_bits() {
        let bytes = vec![0x00, 0x00, 10, 1, 0b1011_1111, 0b1100_0000];
        let img = decode(&bytes).unwrap();
        assert_eq!(img.dimensions(), (10, 1));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(9, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn rejects_truncated_and_non_wbmp() {
        assert!(decode(&[0x00, 0x00, 10, 2, 0xFF, 0xFF]).is_err());
        assert!(!looks_like_wbmp(&[0x00, 0x00, 10, 2, 0xFF, 0xFF]));
        assert!(!looks_like_wbmp(b"\x89PNG\r\n\x1a\n"));
        assert!(!looks_like_wbmp(&[]));
    }
}
