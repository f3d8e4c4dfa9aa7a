//! FFmpeg log level configuration.
//!
//! FFmpeg shows up twice in a `tunegrab` run: as the subprocess the
//! extractor spawns for conversion, and as the linked library used by
//! [`AudioProbe`](crate::AudioProbe). [`FfmpegLogLevel`] drives both, so a
//! single `--log-level` flag silences (or opens up) FFmpeg output no matter
//! where it comes from.
//!
//! # Example
//!
//! ```no_run
//! use tunegrab::{DownloadOptions, FfmpegLogLevel};
//!
//! tunegrab::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//!
//! let options = DownloadOptions::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
//!     .with_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use std::str::FromStr;

use ffmpeg_next::util::log::Level;

use crate::error::TunegrabError;

/// FFmpeg log verbosity level.
///
/// # Ordering (most verbose → most quiet)
///
/// `Trace` > `Debug` > `Verbose` > `Info` > `Warning` > `Error` > `Fatal` > `Panic` > `Quiet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only log conditions that abort the process.
    Panic,
    /// Only log unrecoverable errors.
    Fatal,
    /// Log recoverable errors.
    Error,
    /// Log warnings (FFmpeg's default).
    Warning,
    /// Log informational messages.
    Info,
    /// Log verbose informational messages.
    Verbose,
    /// Log debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl FfmpegLogLevel {
    /// The value for ffmpeg's `-loglevel` command-line option.
    pub fn as_argument(self) -> &'static str {
        match self {
            FfmpegLogLevel::Quiet => "quiet",
            FfmpegLogLevel::Panic => "panic",
            FfmpegLogLevel::Fatal => "fatal",
            FfmpegLogLevel::Error => "error",
            FfmpegLogLevel::Warning => "warning",
            FfmpegLogLevel::Info => "info",
            FfmpegLogLevel::Verbose => "verbose",
            FfmpegLogLevel::Debug => "debug",
            FfmpegLogLevel::Trace => "trace",
        }
    }

    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = TunegrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "panic" => Ok(FfmpegLogLevel::Panic),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "verbose" => Ok(FfmpegLogLevel::Verbose),
            "debug" => Ok(FfmpegLogLevel::Debug),
            "trace" => Ok(FfmpegLogLevel::Trace),
            other => Err(TunegrabError::InvalidOption {
                name: "log level",
                reason: format!("unknown level {other:?}"),
            }),
        }
    }
}

/// Set the log level of the linked FFmpeg libraries.
///
/// This affects in-process probing only. The subprocess level is set per
/// download with
/// [`DownloadOptions::with_ffmpeg_log_level`](crate::DownloadOptions::with_ffmpeg_log_level).
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}
