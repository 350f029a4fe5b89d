//! Lossless container codec and input normalization

use image::{ImageFormat, ImageResult, RgbImage};
use std::io::Cursor;

pub const MEDIA_TYPE: &str = "image/png";

/// Encode an RGB image as PNG
pub fn encode(image: &RgbImage) -> ImageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Decode any supported format and normalize to 8-bit RGB
pub fn decode(data: &[u8]) -> ImageResult<RgbImage> {
    Ok(image::load_from_memory(data)?.to_rgb8())
}
