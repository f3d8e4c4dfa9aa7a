//! Best-effort post-processing of one downloaded item.
//!
//! Locate the file, get a thumbnail, normalize it, embed it, tidy up.
//! Nothing here fails the run: every problem is logged and recorded on the
//! item's [`ItemOutcome`], and the next item is processed regardless.

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::cleanup::remove_leftover_thumbnails;
use crate::error::TunegrabError;
use crate::locate::locate_audio_file;
use crate::metadata::TrackInfo;
use crate::options::DownloadOptions;
use crate::tagging::{embed_cover_art, fill_missing_fields};
use crate::thumbnail::{
    CoverArt, ThumbnailSource, find_written_thumbnail, normalize_cover_art, raw_cover_art,
};

/// What happened to an item's cover art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CoverStatus {
    /// Embedded; the payload names the source.
    Embedded(String),
    /// Not attempted.
    Skipped(String),
    /// Attempted and failed.
    Failed(String),
}

impl Display for CoverStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CoverStatus::Embedded(source) => write!(f, "cover from {source}"),
            CoverStatus::Skipped(reason) => write!(f, "no cover ({reason})"),
            CoverStatus::Failed(reason) => write!(f, "cover failed: {reason}"),
        }
    }
}

/// Result of post-processing one item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    /// The extractor's record.
    pub info: TrackInfo,
    /// The converted file, if it could be found.
    pub path: Option<PathBuf>,
    /// Cover-art result.
    pub cover: CoverStatus,
    /// Thumbnail files deleted afterwards.
    pub removed: Vec<PathBuf>,
}

impl ItemOutcome {
    /// Whether the item got its cover art.
    pub fn has_cover(&self) -> bool {
        matches!(self.cover, CoverStatus::Embedded(_))
    }
}

/// Runs the post-processing steps for items of one download.
pub struct PostProcessor<'a> {
    options: &'a DownloadOptions,
    started: SystemTime,
    claimed: HashSet<PathBuf>,
}

impl<'a> PostProcessor<'a> {
    /// `started` is when the download began; the locator only falls back
    /// to files modified after it.
    pub fn new(options: &'a DownloadOptions, started: SystemTime) -> Self {
        Self {
            options,
            started,
            claimed: HashSet::new(),
        }
    }

    /// Post-process one item.
    ///
    /// A located file is claimed for this item, so the loose matches never
    /// hand it to a later item.
    pub fn process(&mut self, info: TrackInfo) -> ItemOutcome {
        let label = info.label().to_string();
        let path = locate_audio_file(
            &self.options.output_dir,
            self.options.audio_format,
            &info,
            self.started,
            &self.claimed,
        );

        let Some(path) = path else {
            log::warn!("Could not find the converted file for {label}");
            return ItemOutcome {
                info,
                path: None,
                cover: CoverStatus::Skipped("converted file not found".to_string()),
                removed: Vec::new(),
            };
        };

        self.claimed.insert(path.clone());
        let written = find_written_thumbnail(&path);

        let cover = if self.options.embed_thumbnail {
            match self.embed(&path, &info, written.as_deref()) {
                Ok(Some(source)) => CoverStatus::Embedded(source),
                Ok(None) => CoverStatus::Skipped("no thumbnail available".to_string()),
                Err(error) => {
                    log::warn!("Cover art for {label}: {error}");
                    CoverStatus::Failed(error.to_string())
                }
            }
        } else {
            if self.options.fill_tags {
                if let Err(error) = fill_missing_fields(&path, &info) {
                    log::warn!("Tags for {label}: {error}");
                }
            }
            CoverStatus::Skipped("thumbnail embedding disabled".to_string())
        };

        let removed = if self.options.clean_thumbnails {
            path.file_stem()
                .map(|stem| {
                    remove_leftover_thumbnails(
                        &self.options.output_dir,
                        &[stem.to_string_lossy()],
                    )
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        ItemOutcome {
            info,
            path: Some(path),
            cover,
            removed,
        }
    }

    /// Returns a description of the thumbnail source that was embedded, or
    /// `None` when there is no thumbnail at all.
    fn embed(
        &self,
        path: &Path,
        info: &TrackInfo,
        written: Option<&Path>,
    ) -> Result<Option<String>, TunegrabError> {
        let mut sources: Vec<ThumbnailSource> = Vec::new();
        if let Some(written) = written {
            sources.push(ThumbnailSource::File(written.to_path_buf()));
        }
        if let Some(url) = info.thumbnail.as_deref().filter(|url| !url.trim().is_empty()) {
            sources.push(ThumbnailSource::parse(url));
        }

        let mut last_error = None;
        for source in sources {
            match self.cover_from(&source) {
                Ok(cover) => {
                    let fields = self.options.fill_tags.then_some(info);
                    embed_cover_art(path, &cover, fields)?;
                    return Ok(Some(describe(&source)));
                }
                Err(error) => {
                    log::debug!("Thumbnail source {} unusable: {error}", describe(&source));
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }

    fn cover_from(&self, source: &ThumbnailSource) -> Result<CoverArt, TunegrabError> {
        let bytes = source.load(self.options.thumbnail_timeout)?;
        match &self.options.cover_art {
            Some(cover_options) => normalize_cover_art(&bytes, cover_options),
            None => raw_cover_art(&bytes),
        }
    }
}

fn describe(source: &ThumbnailSource) -> String {
    match source {
        ThumbnailSource::Url(url) => url.clone(),
        ThumbnailSource::File(path) => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}
