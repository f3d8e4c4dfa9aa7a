//! Removal of leftover thumbnail files.
//!
//! The extractor writes each thumbnail next to its audio file so it can be
//! embedded. Once embedded (or given up on) the image is clutter.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::locate::is_audio_path;
use crate::thumbnail::THUMBNAIL_EXTENSIONS;

fn is_thumbnail_path(path: &Path) -> bool {
    path.extension()
        .map(|extension| {
            THUMBNAIL_EXTENSIONS.contains(&extension.to_string_lossy().to_ascii_lowercase().as_str())
        })
        .unwrap_or(false)
}

fn top_level_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Delete thumbnail images in `dir` whose stem is one of `stems`.
///
/// Returns the paths that were removed. A file that cannot be removed is
/// logged and skipped.
pub fn remove_leftover_thumbnails<S: AsRef<str>>(dir: &Path, stems: &[S]) -> Vec<PathBuf> {
    let wanted: HashSet<&str> = stems.iter().map(AsRef::as_ref).collect();
    if wanted.is_empty() {
        return Vec::new();
    }

    let targets: Vec<PathBuf> = top_level_files(dir)
        .filter(|path| is_thumbnail_path(path))
        .filter(|path| {
            stem_of(path)
                .map(|stem| wanted.contains(stem.as_str()))
                .unwrap_or(false)
        })
        .collect();

    remove_files(targets)
}

/// Thumbnail images in `dir` that share a stem with an audio file in
/// `dir`.
pub fn find_orphan_thumbnails(dir: &Path) -> Vec<PathBuf> {
    let files: Vec<PathBuf> = top_level_files(dir).collect();
    let audio_stems: HashSet<String> = files
        .iter()
        .filter(|path| is_audio_path(path))
        .filter_map(|path| stem_of(path))
        .collect();

    let mut orphans: Vec<PathBuf> = files
        .into_iter()
        .filter(|path| is_thumbnail_path(path))
        .filter(|path| {
            stem_of(path)
                .map(|stem| audio_stems.contains(&stem))
                .unwrap_or(false)
        })
        .collect();
    orphans.sort();
    orphans
}

/// Delete `paths`, returning the ones that were removed.
pub fn remove_files(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                true
            }
            Err(error) => {
                log::warn!("Could not remove {}: {error}", path.display());
                false
            }
        })
        .collect()
}
