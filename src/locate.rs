//! Locating the converted audio file.
//!
//! The extractor reports where it put each file, but the report is a hint
//! rather than a guarantee: older extractor versions report the
//! pre-conversion path, and filename sanitization means the title and the
//! file stem rarely match byte for byte. The locator tries increasingly
//! loose matches and gives up quietly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::audio_format::{AUDIO_EXTENSIONS, AudioFormat};
use crate::metadata::TrackInfo;

/// Reduce a title or file stem to lowercase alphanumerics.
///
/// The extractor replaces characters that are illegal in filenames with
/// look-alikes (`/` becomes `⧸`, `:` becomes `：`) so comparison ignores
/// everything that is not a letter or digit.
pub fn normalize_stem(value: &str) -> String {
    value
        .chars()
        .filter(|character| character.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Find the audio file the extractor wrote for `info`.
///
/// Strategies, first hit wins:
/// 1. the reported path,
/// 2. the reported path with the target extension,
/// 3. a file in `dir` whose stem matches the title,
/// 4. the newest audio file in `dir` modified at or after `since`.
///
/// Only the top level of `dir` is scanned. Files in `claimed` already
/// belong to earlier items and are skipped by steps 3 and 4.
pub fn locate_audio_file(
    dir: &Path,
    format: AudioFormat,
    info: &TrackInfo,
    since: SystemTime,
    claimed: &HashSet<PathBuf>,
) -> Option<PathBuf> {
    if let Some(reported) = &info.filepath {
        if reported.is_file() {
            log::debug!("Using reported path {}", reported.display());
            return Some(reported.clone());
        }

        if let Some(extension) = format.extension() {
            let converted = reported.with_extension(extension);
            if converted.is_file() {
                log::debug!("Using converted path {}", converted.display());
                return Some(converted);
            }
        }
    }

    let candidates: Vec<(PathBuf, SystemTime)> = audio_files(dir, format)
        .into_iter()
        .filter(|(path, _)| !claimed.contains(path))
        .collect();

    if let Some(title) = info.title.as_deref() {
        let wanted = normalize_stem(title);
        if !wanted.is_empty() {
            let by_title = candidates.iter().find(|(path, _)| {
                path.file_stem()
                    .map(|stem| normalize_stem(&stem.to_string_lossy()) == wanted)
                    .unwrap_or(false)
            });
            if let Some((path, _)) = by_title {
                log::debug!("Matched {} by title", path.display());
                return Some(path.clone());
            }
        }
    }

    let newest = candidates
        .into_iter()
        .filter(|(_, modified)| *modified >= since)
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path);

    if let Some(path) = &newest {
        log::debug!("Falling back to newest file {}", path.display());
    }
    newest
}

/// Audio files directly inside `dir` that fit `format`, with their
/// modification times.
fn audio_files(dir: &Path, format: AudioFormat) -> Vec<(PathBuf, SystemTime)> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|extension| format.matches_extension(&extension.to_string_lossy()))
                .unwrap_or(false)
        })
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((entry.into_path(), modified))
        })
        .collect()
}

/// Whether `path` has one of the known audio extensions.
pub(crate) fn is_audio_path(path: &Path) -> bool {
    path.extension()
        .map(|extension| {
            AUDIO_EXTENSIONS.contains(&extension.to_string_lossy().to_ascii_lowercase().as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::normalize_stem;

    #[test]
    fn normalization_ignores_substituted_characters() {
        assert_eq!(normalize_stem("AC/DC: Live"), "acdclive");
        assert_eq!(normalize_stem("AC⧸DC： Live"), "acdclive");
        assert_eq!(normalize_stem("   "), "");
    }
}
