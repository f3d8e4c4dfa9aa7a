//! Thumbnail retrieval and cover-art normalization.
//!
//! Video thumbnails arrive in whatever format the site serves, most often
//! WebP, which many players ignore when it is embedded as album art.
//! [`normalize_cover_art`] decodes the thumbnail, optionally crops and
//! scales it, converts the pixel format, and re-encodes it as JPEG or PNG.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use tunegrab::{CoverArtOptions, ThumbnailSource, TunegrabError};
//!
//! let source = ThumbnailSource::parse("https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.webp");
//! let bytes = source.load(Duration::from_secs(30))?;
//! let cover = tunegrab::normalize_cover_art(
//!     &bytes,
//!     &CoverArtOptions::default().with_max_dimension(600).with_square(true),
//! )?;
//! println!("{}x{} {}", cover.width, cover.height, cover.mime_type());
//! # Ok::<(), TunegrabError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{
    DynamicImage, ImageFormat,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
    imageops::FilterType,
};

use crate::error::TunegrabError;

/// Image extensions the extractor uses for written thumbnails.
pub const THUMBNAIL_EXTENSIONS: &[&str] = &["webp", "jpg", "jpeg", "png"];

/// Where a thumbnail comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailSource {
    /// Fetched over HTTP.
    Url(String),
    /// Read from disk.
    File(PathBuf),
}

impl ThumbnailSource {
    /// Treat `http://` and `https://` values as URLs and everything else as
    /// a path.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ThumbnailSource::Url(trimmed.to_string())
        } else {
            ThumbnailSource::File(PathBuf::from(trimmed))
        }
    }

    /// Read the thumbnail bytes.
    ///
    /// # Errors
    ///
    /// [`TunegrabError::ThumbnailFetch`] for HTTP failures and empty
    /// responses, [`TunegrabError::IoError`] for unreadable files.
    pub fn load(&self, timeout: Duration) -> Result<Vec<u8>, TunegrabError> {
        match self {
            ThumbnailSource::Url(url) => fetch_thumbnail(url, timeout),
            ThumbnailSource::File(path) => Ok(fs::read(path)?),
        }
    }
}

/// Download a thumbnail.
///
/// # Errors
///
/// Returns [`TunegrabError::ThumbnailFetch`] on transport errors, non-2xx
/// statuses, and empty bodies.
pub fn fetch_thumbnail(url: &str, timeout: Duration) -> Result<Vec<u8>, TunegrabError> {
    log::debug!("Fetching thumbnail {url}");

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tunegrab/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(TunegrabError::ThumbnailFetch {
            url: url.to_string(),
            reason: format!("server answered {status}"),
        });
    }

    let body = response.bytes()?;
    if body.is_empty() {
        return Err(TunegrabError::ThumbnailFetch {
            url: url.to_string(),
            reason: "empty response body".to_string(),
        });
    }

    Ok(body.to_vec())
}

/// Find a thumbnail the extractor wrote next to `audio_path`.
///
/// The extractor names it after the media file, so the audio file's stem
/// plus an image extension.
pub fn find_written_thumbnail(audio_path: &Path) -> Option<PathBuf> {
    THUMBNAIL_EXTENSIONS
        .iter()
        .map(|extension| audio_path.with_extension(extension))
        .find(|candidate| candidate.is_file())
}

/// Encoding for normalized cover art.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverFormat {
    /// Baseline JPEG, 8-bit RGB. This is the default.
    #[default]
    Jpeg,
    /// PNG, 8-bit RGBA.
    Png,
}

/// Settings for [`normalize_cover_art`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CoverArtOptions {
    /// Output encoding.
    pub format: CoverFormat,
    /// Longest edge in pixels. Larger images are scaled down; smaller ones
    /// are left alone.
    pub max_dimension: Option<u32>,
    /// Center-crop to a square first. Video thumbnails are 16:9, album art
    /// is square.
    pub square: bool,
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
}

impl Default for CoverArtOptions {
    fn default() -> Self {
        Self {
            format: CoverFormat::Jpeg,
            max_dimension: None,
            square: false,
            jpeg_quality: 90,
        }
    }
}

impl CoverArtOptions {
    /// Set the output encoding.
    pub fn with_format(mut self, format: CoverFormat) -> Self {
        self.format = format;
        self
    }

    /// Limit the longest edge. Zero is treated as no limit.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = (max_dimension > 0).then_some(max_dimension);
        self
    }

    /// Enable or disable the square crop.
    pub fn with_square(mut self, square: bool) -> Self {
        self.square = square;
        self
    }

    /// Set the JPEG quality, clamped to 1–100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

/// Encoded cover art ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// Encoding of `data`.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CoverArt {
    /// MIME type of the encoded image.
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Decode, crop, scale, and re-encode a thumbnail.
///
/// # Errors
///
/// Returns [`TunegrabError::ImageError`] if the bytes cannot be decoded or
/// the result cannot be encoded.
pub fn normalize_cover_art(
    bytes: &[u8],
    options: &CoverArtOptions,
) -> Result<CoverArt, TunegrabError> {
    let mut image = image::load_from_memory(bytes)?;

    if options.square {
        let side = image.width().min(image.height());
        let x = (image.width() - side) / 2;
        let y = (image.height() - side) / 2;
        image = image.crop_imm(x, y, side, side);
    }

    if let Some(max_dimension) = options.max_dimension {
        if image.width() > max_dimension || image.height() > max_dimension {
            image = image.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        }
    }

    let (width, height) = (image.width(), image.height());
    let mut data = Vec::new();
    let format = match options.format {
        CoverFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut data, options.jpeg_quality.clamp(1, 100));
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
            ImageFormat::Jpeg
        }
        CoverFormat::Png => {
            let encoder = PngEncoder::new(&mut data);
            DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(encoder)?;
            ImageFormat::Png
        }
    };

    log::debug!(
        "Normalized cover art to {width}x{height} {} ({} bytes)",
        format.to_mime_type(),
        data.len()
    );

    Ok(CoverArt {
        data,
        format,
        width,
        height,
    })
}

/// Wrap a thumbnail without re-encoding it.
///
/// The image is still decoded once to learn its format and dimensions.
///
/// # Errors
///
/// Returns [`TunegrabError::ImageError`] if the bytes are not a decodable
/// image.
pub fn raw_cover_art(bytes: &[u8]) -> Result<CoverArt, TunegrabError> {
    let format = image::guess_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)?;
    Ok(CoverArt {
        data: bytes.to_vec(),
        format,
        width: image.width(),
        height: image.height(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{CoverArtOptions, ThumbnailSource};

    #[test]
    fn parse_source_by_scheme() {
        assert_eq!(
            ThumbnailSource::parse(" HTTPS://i.example/x.webp "),
            ThumbnailSource::Url("HTTPS://i.example/x.webp".to_string())
        );
        assert_eq!(
            ThumbnailSource::parse("cover.png"),
            ThumbnailSource::File(PathBuf::from("cover.png"))
        );
    }

    #[test]
    fn builder_clamps_values() {
        let options = CoverArtOptions::default()
            .with_max_dimension(0)
            .with_jpeg_quality(0);
        assert_eq!(options.max_dimension, None);
        assert_eq!(options.jpeg_quality, 1);
    }
}
