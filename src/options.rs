//! Download configuration.
//!
//! [`DownloadOptions`] is a builder that carries everything one run needs:
//! what to fetch, where to put it, what to convert it to, and how much
//! post-processing to do afterwards. It also owns the translation into the
//! extractor's command line.
//!
//! # Example
//!
//! ```no_run
//! use tunegrab::{AudioFormat, AudioQuality, DownloadOptions};
//!
//! let options = DownloadOptions::new("https://www.youtube.com/playlist?list=PL123")
//!     .with_output_dir("music")
//!     .with_audio_format(AudioFormat::Opus)
//!     .with_quality(AudioQuality::Vbr(0))
//!     .with_playlist(true);
//! ```

use std::ffi::OsString;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::audio_format::{AudioFormat, AudioQuality};
use crate::error::TunegrabError;
use crate::extractor::{ITEM_PREFIX, PROGRESS_PREFIX};
use crate::ffmpeg::FfmpegLogLevel;
use crate::progress::{NoOpProgress, ProgressCallback};
use crate::thumbnail::CoverArtOptions;

/// Default directory for converted files.
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Default extractor filename template.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Default extractor binary, resolved through `PATH`.
pub const DEFAULT_EXTRACTOR: &str = "yt-dlp";

/// Fields requested from the extractor for every finished item.
const ITEM_FIELDS: &str =
    "id,title,filepath,thumbnail,uploader,artist,album,track,playlist_index,webpage_url,duration";

/// Configuration for one download run.
#[derive(Clone)]
#[must_use]
pub struct DownloadOptions {
    pub(crate) url: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) audio_format: AudioFormat,
    pub(crate) quality: AudioQuality,
    pub(crate) playlist: bool,
    pub(crate) output_template: String,
    pub(crate) embed_thumbnail: bool,
    /// `None` embeds thumbnails as downloaded, without normalization.
    pub(crate) cover_art: Option<CoverArtOptions>,
    pub(crate) clean_thumbnails: bool,
    pub(crate) fill_tags: bool,
    pub(crate) ignore_errors: bool,
    pub(crate) extractor: PathBuf,
    pub(crate) ffmpeg_location: Option<PathBuf>,
    pub(crate) ffmpeg_log_level: Option<FfmpegLogLevel>,
    pub(crate) thumbnail_timeout: Duration,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for DownloadOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DownloadOptions")
            .field("url", &self.url)
            .field("output_dir", &self.output_dir)
            .field("audio_format", &self.audio_format)
            .field("quality", &self.quality)
            .field("playlist", &self.playlist)
            .field("output_template", &self.output_template)
            .field("embed_thumbnail", &self.embed_thumbnail)
            .field("cover_art", &self.cover_art)
            .field("clean_thumbnails", &self.clean_thumbnails)
            .field("ignore_errors", &self.ignore_errors)
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

impl DownloadOptions {
    /// Create options for `url` with default settings.
    ///
    /// Defaults: `downloads/`, MP3 at 320 kbit/s, single video, thumbnail
    /// embedded as a normalized JPEG, leftover thumbnails removed.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            audio_format: AudioFormat::default(),
            quality: AudioQuality::default(),
            playlist: false,
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            embed_thumbnail: true,
            cover_art: Some(CoverArtOptions::default()),
            clean_thumbnails: true,
            fill_tags: true,
            ignore_errors: false,
            extractor: PathBuf::from(DEFAULT_EXTRACTOR),
            ffmpeg_location: None,
            ffmpeg_log_level: None,
            thumbnail_timeout: Duration::from_secs(30),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the directory converted files are written to.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the target audio format.
    pub fn with_audio_format(mut self, format: AudioFormat) -> Self {
        self.audio_format = format;
        self
    }

    /// Set the conversion quality.
    pub fn with_quality(mut self, quality: AudioQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Download every entry of a playlist URL instead of only the
    /// referenced video.
    pub fn with_playlist(mut self, playlist: bool) -> Self {
        self.playlist = playlist;
        self
    }

    /// Set the extractor filename template (relative to the output
    /// directory).
    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = template.into();
        self
    }

    /// Enable or disable cover-art embedding.
    pub fn with_embed_thumbnail(mut self, embed: bool) -> Self {
        self.embed_thumbnail = embed;
        self
    }

    /// Normalize thumbnails with `options` before embedding. Pass `None`
    /// to embed the downloaded bytes unchanged.
    pub fn with_cover_art(mut self, options: Option<CoverArtOptions>) -> Self {
        self.cover_art = options;
        self
    }

    /// Enable or disable removal of leftover thumbnail files.
    pub fn with_clean_thumbnails(mut self, clean: bool) -> Self {
        self.clean_thumbnails = clean;
        self
    }

    /// Fill empty title/artist/album tags from the extractor's record.
    pub fn with_fill_tags(mut self, fill: bool) -> Self {
        self.fill_tags = fill;
        self
    }

    /// Let the extractor skip playlist entries it cannot download.
    pub fn with_ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }

    /// Use a different extractor binary.
    pub fn with_extractor(mut self, binary: impl Into<PathBuf>) -> Self {
        self.extractor = binary.into();
        self
    }

    /// Tell the extractor where ffmpeg lives (binary or directory).
    pub fn with_ffmpeg_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(location.into());
        self
    }

    /// Forward a `-loglevel` to the extractor's ffmpeg invocations.
    pub fn with_ffmpeg_log_level(mut self, level: FfmpegLogLevel) -> Self {
        self.ffmpeg_log_level = Some(level);
        self
    }

    /// Set the HTTP timeout for thumbnail downloads.
    pub fn with_thumbnail_timeout(mut self, timeout: Duration) -> Self {
        self.thumbnail_timeout = timeout;
        self
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The URL to download.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The directory converted files are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The target audio format.
    pub fn audio_format(&self) -> AudioFormat {
        self.audio_format
    }

    /// The extractor binary.
    pub fn extractor(&self) -> &Path {
        &self.extractor
    }

    /// The ffmpeg location handed to the extractor, if any.
    pub fn ffmpeg_location(&self) -> Option<&Path> {
        self.ffmpeg_location.as_deref()
    }

    /// Check the options before anything is spawned.
    ///
    /// # Errors
    ///
    /// [`TunegrabError::InvalidUrl`] for anything but an absolute
    /// `http`/`https` URL with a host, and [`TunegrabError::InvalidOption`]
    /// for an empty template or one that would write outside the output
    /// directory.
    pub fn validate(&self) -> Result<(), TunegrabError> {
        let invalid_url = |reason: &str| TunegrabError::InvalidUrl {
            url: self.url.clone(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(self.url.trim()).map_err(|error| invalid_url(&error.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid_url("only http and https URLs are supported"));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid_url("URL has no host"));
        }

        let template = self.output_template.trim();
        if template.is_empty() {
            return Err(TunegrabError::InvalidOption {
                name: "output template",
                reason: "template is empty".to_string(),
            });
        }
        if template.contains('/') || template.contains('\\') {
            return Err(TunegrabError::InvalidOption {
                name: "output template",
                reason: "template must name a file directly inside the output directory"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Build the extractor's argument list.
    ///
    /// Besides the conversion settings this installs two machine-readable
    /// hooks on stdout: a progress line per download tick and one JSON
    /// record per item once its converted file is in place.
    pub fn extractor_arguments(&self) -> Vec<OsString> {
        let mut arguments: Vec<OsString> = Vec::new();
        let mut push = |value: &str| arguments.push(OsString::from(value));

        push("--format");
        push("bestaudio/best");
        push("--extract-audio");
        push("--audio-format");
        push(self.audio_format.as_str());
        push("--audio-quality");
        push(&self.quality.to_argument());
        push(if self.playlist {
            "--yes-playlist"
        } else {
            "--no-playlist"
        });
        push("--quiet");
        push("--no-simulate");
        push("--newline");
        push("--progress");
        push("--progress-template");
        push(&format!(
            "download:{PROGRESS_PREFIX}%(progress.downloaded_bytes)s:%(progress.total_bytes)s:\
             %(progress.total_bytes_estimate)s:%(info.playlist_index)s:%(info.n_entries)s"
        ));
        push("--print");
        push(&format!("after_move:{ITEM_PREFIX}%(.{{{ITEM_FIELDS}}})j"));

        if self.embed_thumbnail {
            push("--write-thumbnail");
        }
        if self.ignore_errors {
            push("--ignore-errors");
        }
        if let Some(level) = self.ffmpeg_log_level {
            push("--postprocessor-args");
            push(&format!("ffmpeg:-loglevel {}", level.as_argument()));
        }

        if let Some(location) = &self.ffmpeg_location {
            arguments.push(OsString::from("--ffmpeg-location"));
            arguments.push(location.clone().into_os_string());
        }

        arguments.push(OsString::from("--output"));
        arguments.push(
            self.output_dir
                .join(self.output_template.trim())
                .into_os_string(),
        );

        arguments.push(OsString::from("--"));
        arguments.push(OsString::from(self.url.trim()));
        arguments
    }
}
