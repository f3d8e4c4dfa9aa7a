//! Metadata types.
//!
//! [`TrackInfo`] is what the extractor reports about each finished
//! download. [`AudioMetadata`] is what [`AudioProbe`](crate::AudioProbe)
//! reads back from the converted file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One finished download as reported by the extractor.
///
/// Every field is optional: extractors omit whatever a site does not
/// provide, and the post-processing pass treats each field as a hint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackInfo {
    /// Site-specific video identifier.
    pub id: Option<String>,
    /// Video title. Also the stem of the output file with the default
    /// template, modulo filename sanitization.
    pub title: Option<String>,
    /// Final path of the converted file.
    pub filepath: Option<PathBuf>,
    /// URL of the best thumbnail.
    pub thumbnail: Option<String>,
    /// Channel or account name.
    pub uploader: Option<String>,
    /// Performing artist, for music-catalogue sources.
    pub artist: Option<String>,
    /// Album, for music-catalogue sources.
    pub album: Option<String>,
    /// Track name, for music-catalogue sources.
    pub track: Option<String>,
    /// 1-based position within the playlist.
    pub playlist_index: Option<u64>,
    /// Canonical page URL.
    pub webpage_url: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
}

impl TrackInfo {
    /// A short human-readable label: title, then id, then `"untitled"`.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("untitled")
    }

    /// Best candidate for the tag's title field.
    pub fn tag_title(&self) -> Option<&str> {
        self.track.as_deref().or(self.title.as_deref())
    }

    /// Best candidate for the tag's artist field.
    pub fn tag_artist(&self) -> Option<&str> {
        self.artist.as_deref().or(self.uploader.as_deref())
    }
}

/// Properties of a converted audio file.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct AudioMetadata {
    /// Container format name (e.g. `"mp3"`, `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
    /// Total duration.
    pub duration: Duration,
    /// Codec of the best audio stream, `None` when the file has no audio.
    pub codec: Option<String>,
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Bit rate in bits per second (stream rate, or container rate when the
    /// stream does not declare one).
    pub bit_rate: u64,
    /// Whether the container carries an attached picture stream (cover art).
    pub has_cover_art: bool,
    /// Container-level tags, keyed as FFmpeg reports them.
    pub tags: HashMap<String, String>,
}
