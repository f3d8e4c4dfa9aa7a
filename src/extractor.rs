//! Extractor subprocess.
//!
//! Site discovery, stream selection, downloading, and conversion are all
//! done by the extractor (`yt-dlp`), which in turn drives ffmpeg. This
//! module spawns it with the arguments built by
//! [`DownloadOptions::extractor_arguments`], turns its stdout into
//! [`ExtractorEvent`]s, and maps its exit status onto [`TunegrabError`].

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use crate::error::TunegrabError;
use crate::metadata::TrackInfo;
use crate::options::DownloadOptions;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};

/// Prefix of the progress lines installed by the progress template.
pub const PROGRESS_PREFIX: &str = "tunegrab-progress:";

/// Prefix of the per-item JSON records installed by the print hook.
pub const ITEM_PREFIX: &str = "tunegrab-item:";

/// Number of trailing stderr lines kept for error reporting.
const STDERR_TAIL: usize = 32;

/// Download progress for the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub downloaded_bytes: Option<u64>,
    /// Exact size, when the server reports one.
    pub total_bytes: Option<u64>,
    /// Estimated size, for fragmented downloads.
    pub total_bytes_estimate: Option<u64>,
    /// 1-based playlist position.
    pub playlist_index: Option<u64>,
    /// Playlist length.
    pub playlist_count: Option<u64>,
}

impl DownloadProgress {
    /// The exact total if known, otherwise the estimate.
    pub fn total(&self) -> Option<u64> {
        self.total_bytes.or(self.total_bytes_estimate)
    }
}

/// One parsed line of extractor output.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorEvent {
    /// A progress tick.
    Progress(DownloadProgress),
    /// An item finished: its converted file has been moved into place.
    Finished(TrackInfo),
    /// Any other output.
    Output(String),
}

/// Parse a single stdout line.
///
/// # Errors
///
/// Returns [`TunegrabError::JsonError`] when an item line carries a record
/// that is not a JSON object.
pub fn parse_event_line(line: &str) -> Result<ExtractorEvent, TunegrabError> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.strip_prefix(ITEM_PREFIX) {
        let info: TrackInfo = serde_json::from_str(rest.trim())?;
        return Ok(ExtractorEvent::Finished(info));
    }

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let mut fields = rest.split(':').map(parse_count);
        let mut next = || fields.next().flatten();
        return Ok(ExtractorEvent::Progress(DownloadProgress {
            downloaded_bytes: next(),
            total_bytes: next(),
            total_bytes_estimate: next(),
            playlist_index: next(),
            playlist_count: next(),
        }));
    }

    Ok(ExtractorEvent::Output(line.to_string()))
}

/// Parse a numeric template field. The extractor prints `NA` for missing
/// values and may print byte estimates as floats.
fn parse_count(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("na") || field == "None" {
        return None;
    }
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().filter(|value| *value >= 0.0).map(|value| value as u64))
}

/// Pick the line that best explains a failure: the last `ERROR:` line,
/// otherwise the last non-empty line.
pub fn failure_message(stderr_lines: &[String]) -> String {
    stderr_lines
        .iter()
        .rev()
        .find_map(|line| line.trim().strip_prefix("ERROR:").map(str::trim))
        .or_else(|| {
            stderr_lines
                .iter()
                .rev()
                .map(|line| line.trim())
                .find(|line| !line.is_empty())
        })
        .unwrap_or("no error output")
        .to_string()
}

/// Runs the extractor for one [`DownloadOptions`].
pub struct Extractor<'a> {
    options: &'a DownloadOptions,
}

impl<'a> Extractor<'a> {
    /// Create an extractor run for `options`.
    pub fn new(options: &'a DownloadOptions) -> Self {
        Self { options }
    }

    /// Spawn the extractor and wait for it.
    ///
    /// Items are returned in the order the extractor finished them, which
    /// is playlist order since entries are processed one after another.
    ///
    /// # Errors
    ///
    /// [`TunegrabError::ToolNotFound`] if the binary cannot be spawned,
    /// [`TunegrabError::Extractor`] on a non-zero exit. With
    /// `ignore_errors` set, a non-zero exit after at least one finished
    /// item is logged and the finished items are returned.
    pub fn run(&self) -> Result<Vec<TrackInfo>, TunegrabError> {
        let tool = self.options.extractor.display().to_string();
        let arguments = self.options.extractor_arguments();

        log::debug!(
            "Running {tool} {}",
            arguments
                .iter()
                .map(|argument| argument.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&self.options.extractor)
            .args(&arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| TunegrabError::ToolNotFound {
                tool: tool.clone(),
                reason: error.to_string(),
            })?;

        let stderr_reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || collect_stderr(stderr))
        });

        let mut items = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            let progress: Arc<dyn ProgressCallback> = Arc::clone(&self.options.progress);
            let mut tracker = ProgressTracker::new(progress, OperationType::Download, None);

            for chunk in BufReader::new(stdout).split(b'\n') {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(error) => {
                        log::warn!("Stopped reading {tool} output: {error}");
                        break;
                    }
                };
                // Titles in plain output lines are not always valid UTF-8.
                let line = String::from_utf8_lossy(&bytes);
                match parse_event_line(&line) {
                    Ok(ExtractorEvent::Progress(tick)) => {
                        if let Some(downloaded) = tick.downloaded_bytes {
                            let entry = tick.playlist_index.map(|index| (index, tick.playlist_count));
                            tracker.set_position(downloaded, tick.total(), entry);
                        }
                    }
                    Ok(ExtractorEvent::Finished(info)) => {
                        log::info!("Downloaded {}", info.label());
                        items.push(info);
                    }
                    Ok(ExtractorEvent::Output(text)) => {
                        if !text.trim().is_empty() {
                            log::debug!("{tool}: {text}");
                        }
                    }
                    Err(error) => log::warn!("Ignoring unreadable extractor record: {error}"),
                }
            }
        }

        let status = child.wait()?;
        let stderr_lines = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        for line in &stderr_lines {
            log::debug!("{tool} stderr: {line}");
        }

        if !status.success() {
            let message = failure_message(&stderr_lines);
            // With --ignore-errors the extractor still exits non-zero when
            // any entry failed; the entries it did finish are kept.
            if self.options.ignore_errors && !items.is_empty() {
                log::warn!(
                    "{tool} exited with {status} after {} item(s): {message}",
                    items.len()
                );
                return Ok(items);
            }
            return Err(TunegrabError::Extractor {
                tool,
                code: status.code(),
                message,
            });
        }

        Ok(items)
    }
}

fn collect_stderr(stderr: impl Read) -> Vec<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL);
    for chunk in BufReader::new(stderr).split(b'\n').map_while(Result::ok) {
        if tail.len() == STDERR_TAIL {
            tail.pop_front();
        }
        tail.push_back(String::from_utf8_lossy(&chunk).trim_end_matches('\r').to_string());
    }
    tail.into()
}
