//! The local fallback transform: a fixed warm tint that stands in for the AI.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::constants::{BLUE_FACTOR, DEFAULT_MIME_TYPE, GREEN_FACTOR, JPEG_QUALITY, RED_FACTOR};
use crate::error::StudioError;
use crate::upload::StudioImage;

fn scale_channel(value: u8, factor: f64) -> u8 {
    (f64::from(value) * factor).round().clamp(0.0, 255.0) as u8
}

/// Scales one pixel's colour channels, alpha is left alone.
pub fn tint_pixel(pixel: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    Rgba([
        scale_channel(r, RED_FACTOR),
        scale_channel(g, GREEN_FACTOR),
        scale_channel(b, BLUE_FACTOR),
        a,
    ])
}

/// Applies [`tint_pixel`] to every pixel in place.
pub fn tint_buffer(buffer: &mut RgbaImage) {
    for pixel in buffer.pixels_mut() {
        *pixel = tint_pixel(*pixel);
    }
}

/// Decodes `source`, tints it and re-encodes it as a JPEG.
pub fn fallback_convert(source: &StudioImage) -> Result<StudioImage, StudioError> {
    let decoded = image::load_from_memory(&source.bytes)?;
    let mut buffer = decoded.to_rgba8();
    tint_buffer(&mut buffer);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(buffer).to_rgb8();
    let mut output = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY).encode_image(&rgb)?;

    Ok(StudioImage::new(output.into_inner(), DEFAULT_MIME_TYPE))
}
