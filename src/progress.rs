//! Progress reporting.
//!
//! This module provides [`ProgressCallback`] for monitoring a download run
//! and [`ProgressInfo`] for progress snapshots. The extractor reports byte
//! counts while it downloads; the post-processing loop reports one step per
//! playlist item.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tunegrab::{DownloadOptions, Downloader, ProgressCallback, ProgressInfo, TunegrabError};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let options = DownloadOptions::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
//!     .with_progress(Arc::new(PrintProgress));
//! Downloader::new(options).run()?;
//! # Ok::<(), TunegrabError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of work currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// The extractor is downloading (bytes).
    Download,
    /// Cover art is being fetched and embedded (items).
    CoverArt,
    /// Leftover thumbnails are being removed (items).
    Cleanup,
}

/// A snapshot of progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// Units completed so far: bytes for downloads, items otherwise.
    pub current: u64,
    /// Total units expected, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Position of the current playlist entry and the entry count, when the
    /// extractor reports them.
    pub entry: Option<(u64, Option<u64>)>,
    /// Title of the item being processed, when known.
    pub item: Option<String>,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] so a callback can be
/// shared through [`DownloadOptions`](crate::DownloadOptions), which is
/// `Clone`.
pub trait ProgressCallback: Send + Sync {
    /// Called whenever progress is made.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing for one operation and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    entry_index: Option<u64>,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            entry_index: None,
            start_time: Instant::now(),
        }
    }

    /// Record one completed item.
    pub(crate) fn advance(&mut self, item: Option<&str>) {
        self.current += 1;
        self.report(item.map(str::to_string), None);
    }

    /// Report an absolute position, replacing the running count. Used for
    /// byte counts, where the extractor tells us where it is.
    ///
    /// A missing `total` keeps the last known one, unless `entry` moved on
    /// to another playlist entry.
    pub(crate) fn set_position(
        &mut self,
        current: u64,
        total: Option<u64>,
        entry: Option<(u64, Option<u64>)>,
    ) {
        self.current = current;
        let index = entry.map(|(index, _)| index);
        if index.is_some() && index != self.entry_index {
            self.entry_index = index;
            self.total = total;
        } else if total.is_some() {
            self.total = total;
        }
        self.report(None, entry);
    }

    fn report(&self, item: Option<String>, entry: Option<(u64, Option<u64>)>) {
        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| ((self.current as f32 / total as f32) * 100.0).min(100.0));

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
            entry,
            item,
        };

        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{OperationType, ProgressCallback, ProgressInfo, ProgressTracker};

    #[derive(Default)]
    struct Recorder {
        infos: Mutex<Vec<ProgressInfo>>,
    }

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.infos.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn advance_counts_items() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), OperationType::CoverArt, Some(2));
        tracker.advance(Some("first"));
        tracker.advance(None);

        let infos = recorder.infos.lock().unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].item.as_deref(), Some("first"));
        assert_eq!(infos[1].current, 2);
        assert_eq!(infos[1].percentage, Some(100.0));
    }

    #[test]
    fn set_position_keeps_last_known_total() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), OperationType::Download, None);
        tracker.set_position(50, Some(200), Some((1, Some(3))));
        tracker.set_position(100, None, None);

        let infos = recorder.infos.lock().unwrap();
        assert_eq!(infos[0].percentage, Some(25.0));
        assert_eq!(infos[0].entry, Some((1, Some(3))));
        assert_eq!(infos[1].total, Some(200));
        assert_eq!(infos[1].percentage, Some(50.0));
    }

    #[test]
    fn new_entry_drops_previous_total() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), OperationType::Download, None);
        tracker.set_position(900, Some(1000), Some((1, Some(2))));
        tracker.set_position(100, None, Some((2, Some(2))));
        tracker.set_position(200, Some(400), Some((2, Some(2))));
        tracker.set_position(300, None, Some((2, Some(2))));

        let infos = recorder.infos.lock().unwrap();
        assert_eq!(infos[0].percentage, Some(90.0));
        assert_eq!(infos[1].total, None);
        assert_eq!(infos[1].percentage, None);
        assert_eq!(infos[2].percentage, Some(50.0));
        assert_eq!(infos[3].total, Some(400));
        assert_eq!(infos[3].percentage, Some(75.0));
    }
}
