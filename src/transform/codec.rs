//! JPEG codec
//!
//! The service reads and writes a single raster format.

use image::codecs::jpeg::JpegEncoder;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageEncoder as _, ImageFormat};
use std::io::Cursor;

use super::error::ImageError;

/// Content-Type of every image the service produces
pub const CONTENT_TYPE: &str = "image/jpeg";

/// Decode JPEG bytes into a DynamicImage
pub fn decode_jpeg(data: &[u8]) -> Result<DynamicImage, ImageError> {
    ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg)
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Encode an image as baseline JPEG
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb = img.to_rgb8();
    let mut output = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));

    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
        .map_err(|e| ImageError::encode_failed("jpeg", e.to_string()))?;

    Ok(output.into_inner())
}
