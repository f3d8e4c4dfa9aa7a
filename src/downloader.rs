//! Core [`Downloader`] implementation.
//!
//! `Downloader` is the main entry point for the crate: one synchronous call
//! chain that validates options, runs the extractor, and post-processes
//! each finished item in turn.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;

use crate::error::TunegrabError;
use crate::extractor::Extractor;
use crate::options::DownloadOptions;
use crate::postprocess::{CoverStatus, ItemOutcome, PostProcessor};
use crate::progress::{OperationType, ProgressTracker};

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    /// One entry per item, in download order.
    pub items: Vec<ItemOutcome>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl DownloadReport {
    /// Number of items whose cover art was embedded.
    pub fn covers_embedded(&self) -> usize {
        self.items.iter().filter(|item| item.has_cover()).count()
    }

    /// Number of items whose cover art failed.
    pub fn covers_failed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.cover, CoverStatus::Failed(_)))
            .count()
    }

    /// Total number of thumbnail files removed.
    pub fn thumbnails_removed(&self) -> usize {
        self.items.iter().map(|item| item.removed.len()).sum()
    }
}

impl Display for DownloadReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.items {
            match &item.path {
                Some(path) => writeln!(f, "{} -> {} [{}]", item.info.label(), path.display(), item.cover)?,
                None => writeln!(f, "{} -> ? [{}]", item.info.label(), item.cover)?,
            }
        }
        writeln!(
            f,
            "{} item(s), {} cover(s) embedded, {} thumbnail file(s) removed in {:.1}s",
            self.items.len(),
            self.covers_embedded(),
            self.thumbnails_removed(),
            self.elapsed.as_secs_f64(),
        )
    }
}

/// Downloads audio for one URL.
///
/// # Example
///
/// ```no_run
/// use tunegrab::{DownloadOptions, Downloader, TunegrabError};
///
/// let options = DownloadOptions::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
/// let report = Downloader::new(options).run()?;
/// print!("{report}");
/// # Ok::<(), TunegrabError>(())
/// ```
#[derive(Debug)]
pub struct Downloader {
    options: DownloadOptions,
}

impl Downloader {
    /// Create a downloader for `options`.
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }

    /// The options this downloader runs with.
    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Run the download.
    ///
    /// # Errors
    ///
    /// Fails on invalid options, when the output directory cannot be
    /// created, and when the extractor cannot be run or exits with an
    /// error. Post-processing problems never fail the run; they are recorded
    /// per item in the report.
    pub fn run(&self) -> Result<DownloadReport, TunegrabError> {
        self.options.validate()?;

        let started_at = Instant::now();
        // Coarse filesystems store whole-second mtimes, so allow a second of
        // slack for the locator's newest-file fallback.
        let started = SystemTime::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        fs::create_dir_all(&self.options.output_dir)?;
        log::info!(
            "Downloading {} as {} into {}",
            self.options.url,
            self.options.audio_format,
            self.options.output_dir.display()
        );

        let finished = Extractor::new(&self.options).run()?;

        let mut post_processor = PostProcessor::new(&self.options, started);
        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            if self.options.embed_thumbnail {
                OperationType::CoverArt
            } else {
                OperationType::Cleanup
            },
            Some(finished.len() as u64),
        );

        let mut items = Vec::with_capacity(finished.len());
        for info in finished {
            let label = info.label().to_string();
            let outcome = post_processor.process(info);
            tracker.advance(Some(&label));
            items.push(outcome);
        }

        Ok(DownloadReport {
            items,
            elapsed: started_at.elapsed(),
        })
    }
}
