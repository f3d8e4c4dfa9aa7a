//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

/// Write a 0.1 s silent 8 kHz mono PCM WAV file.
pub fn write_silent_wav(path: &Path) {
    let sample_rate: u32 = 8_000;
    let sample_count: u32 = 800;
    let data_length = sample_count * 2;

    let mut bytes = Vec::with_capacity(44 + data_length as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_length).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16_u32.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1_u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2_u16.to_le_bytes());
    bytes.extend_from_slice(&16_u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_length.to_le_bytes());
    bytes.resize(bytes.len() + data_length as usize, 0);

    fs::write(path, bytes).expect("Failed to write WAV fixture");
}

/// A semi-transparent RGBA test image.
pub fn test_image(width: u32, height: u32) -> DynamicImage {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, if x < width / 2 { 255 } else { 64 }])
    });
    DynamicImage::ImageRgba8(image)
}

/// Encode `image` in `format`.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, format)
        .expect("Failed to encode test image");
    cursor.into_inner()
}

/// PNG bytes of a `width`×`height` test image.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&test_image(width, height), ImageFormat::Png)
}
