//! # tunegrab
//!
//! Download audio from video-hosting URLs, convert it, and embed the
//! thumbnail as cover art.
//!
//! Discovery, stream selection, downloading, and conversion are delegated
//! to [`yt-dlp`](https://github.com/yt-dlp/yt-dlp), which drives `ffmpeg`.
//! `tunegrab` configures that run and then post-processes each file: it
//! finds the converted file, fetches the thumbnail, normalizes it into
//! proper album art, writes it into the file's tags, and deletes the
//! leftover image.
//!
//! ## Quick Start
//!
//! ### Download a Single Video
//!
//! ```no_run
//! use tunegrab::{DownloadOptions, Downloader};
//!
//! let options = DownloadOptions::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
//! let report = Downloader::new(options).run().unwrap();
//! print!("{report}");
//! ```
//!
//! ### Download a Playlist as Opus
//!
//! ```no_run
//! use tunegrab::{AudioFormat, AudioQuality, DownloadOptions, Downloader};
//!
//! let options = DownloadOptions::new("https://www.youtube.com/playlist?list=PL123")
//!     .with_output_dir("music")
//!     .with_audio_format(AudioFormat::Opus)
//!     .with_quality(AudioQuality::Vbr(0))
//!     .with_playlist(true);
//! Downloader::new(options).run().unwrap();
//! ```
//!
//! ### Embed Cover Art Into an Existing File
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//!
//! use tunegrab::{CoverArtOptions, ThumbnailSource};
//!
//! let bytes = ThumbnailSource::parse("cover.webp").load(Duration::from_secs(30)).unwrap();
//! let cover = tunegrab::normalize_cover_art(&bytes, &CoverArtOptions::default().with_square(true)).unwrap();
//! tunegrab::embed_cover_art(Path::new("song.mp3"), &cover, None).unwrap();
//! ```
//!
//! ## Requirements
//!
//! `yt-dlp` and `ffmpeg` must be on `PATH` (or configured explicitly), and
//! the FFmpeg development libraries must be installed for the probe.

pub mod audio_format;
pub mod cleanup;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod locate;
pub mod metadata;
pub mod options;
pub mod postprocess;
pub mod probe;
pub mod progress;
pub mod tagging;
pub mod thumbnail;
pub mod toolchain;
pub mod validation;

pub use audio_format::{AudioFormat, AudioQuality};
pub use cleanup::{find_orphan_thumbnails, remove_files, remove_leftover_thumbnails};
pub use downloader::{DownloadReport, Downloader};
pub use error::TunegrabError;
pub use extractor::{DownloadProgress, Extractor, ExtractorEvent, parse_event_line};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use locate::{locate_audio_file, normalize_stem};
pub use metadata::{AudioMetadata, TrackInfo};
pub use options::{DEFAULT_OUTPUT_DIR, DownloadOptions};
pub use postprocess::{CoverStatus, ItemOutcome, PostProcessor};
pub use probe::AudioProbe;
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use tagging::{EmbeddedPicture, embed_cover_art, fill_missing_fields, read_cover_art};
pub use thumbnail::{
    CoverArt, CoverArtOptions, CoverFormat, ThumbnailSource, fetch_thumbnail,
    find_written_thumbnail, normalize_cover_art, raw_cover_art,
};
pub use toolchain::{Toolchain, check_tool};
pub use validation::{ValidationReport, validate_output};
