//! Error types for the `tunegrab` crate.
//!
//! This module defines [`TunegrabError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry enough context to be
//! printed straight to the terminal: file paths, exit codes, and the
//! delegate tool's own error line.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use lofty::error::LoftyError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all `tunegrab` operations.
///
/// Post-processing is best-effort, so most of these surface as log
/// warnings rather than failed runs. Only option validation, tool lookup,
/// and delegate failures abort a download.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TunegrabError {
    /// The URL is not an absolute `http`/`https` URL.
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl {
        /// The URL as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A download or cover-art option has an unusable value.
    #[error("Invalid option {name}: {reason}")]
    InvalidOption {
        /// Option name as shown to the user.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// An external tool could not be started.
    #[error("Could not run {tool}: {reason}")]
    ToolNotFound {
        /// Binary name or path that was spawned.
        tool: String,
        /// Underlying reason the spawn failed.
        reason: String,
    },

    /// The extractor exited unsuccessfully.
    #[error("{tool} exited with {}: {message}", exit_status(.code))]
    Extractor {
        /// Binary name or path of the extractor.
        tool: String,
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// The most relevant line of the tool's error output.
        message: String,
    },

    /// A thumbnail could not be downloaded.
    #[error("Failed to fetch thumbnail {url}: {reason}")]
    ThumbnailFetch {
        /// Thumbnail URL.
        url: String,
        /// Status or transport failure.
        reason: String,
    },

    /// Reading or writing embedded tags failed.
    #[error("Tag write failed for {path}: {reason}")]
    Tagging {
        /// Audio file being tagged.
        path: PathBuf,
        /// Reason reported by the tag library.
        reason: String,
    },

    /// The media file could not be opened for probing.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::AudioProbe::probe`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while normalizing cover art.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// A machine-readable record from the extractor could not be parsed.
    #[error("Malformed extractor record: {0}")]
    JsonError(#[from] JsonError),
}

impl From<FfmpegError> for TunegrabError {
    fn from(error: FfmpegError) -> Self {
        TunegrabError::FfmpegError(error.to_string())
    }
}

impl From<reqwest::Error> for TunegrabError {
    fn from(error: reqwest::Error) -> Self {
        TunegrabError::ThumbnailFetch {
            url: error
                .url()
                .map(|url| url.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            reason: error.to_string(),
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl TunegrabError {
    /// Wrap a tag-library error with the path it concerned.
    pub(crate) fn tagging(path: impl Into<PathBuf>, error: LoftyError) -> Self {
        TunegrabError::Tagging {
            path: path.into(),
            reason: error.to_string(),
        }
    }
}
