//! End-to-end runs against a stand-in extractor script.
#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use image::ImageFormat;
use tempfile::tempdir;
use tunegrab::{
    AudioFormat, CoverStatus, DownloadOptions, Downloader, OperationType, ProgressCallback,
    ProgressInfo, read_cover_art,
};

/// Scripts are written and executed one test at a time; a concurrent fork
/// holding the script open for writing makes exec fail with ETXTBSY.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Recorder {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

/// Write an executable shell script with the given body.
fn script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-yt-dlp");
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn print_lines(stdout_lines: &[String]) -> String {
    stdout_lines
        .iter()
        .map(|line| format!("printf '%s\\n' '{line}'\n"))
        .collect()
}

/// Write an executable shell script that prints `stdout_lines` and exits 0.
fn fake_extractor(dir: &Path, stdout_lines: &[String]) -> PathBuf {
    let body = format!(
        "echo '[youtube] Extracting URL' >&2\n{}exit 0\n",
        print_lines(stdout_lines)
    );
    script(dir, &body)
}

fn item_line(record: serde_json::Value) -> String {
    format!("tunegrab-item:{record}")
}

#[test]
fn playlist_items_get_covers_and_leftovers_are_removed() {
    let _serial = serial();
    let tools = tempdir().unwrap();
    let output = tempdir().unwrap();
    let out = output.path();

    let first_audio = out.join("First Song.wav");
    common::write_silent_wav(&first_audio);
    fs::write(out.join("First Song.png"), common::png_bytes(160, 90)).unwrap();

    let second_audio = out.join("Second： Song.wav");
    common::write_silent_wav(&second_audio);
    fs::write(out.join("Second： Song.jpg"), b"not an image").unwrap();

    let lines = vec![
        "tunegrab-progress:512:1024:NA:1:2".to_string(),
        item_line(serde_json::json!({
            "id": "a1",
            "title": "First Song",
            "filepath": first_audio,
            "uploader": "Channel",
            "playlist_index": 1,
        })),
        "tunegrab-progress:2048:NA:4096:2:2".to_string(),
        item_line(serde_json::json!({
            "id": "b2",
            "title": "Second: Song",
            "thumbnail": out.join("missing.webp"),
            "playlist_index": 2,
        })),
    ];
    let extractor = fake_extractor(tools.path(), &lines);

    let recorder = Arc::new(Recorder::default());
    let options = DownloadOptions::new("https://www.youtube.com/playlist?list=PL123")
        .with_output_dir(out)
        .with_audio_format(AudioFormat::Wav)
        .with_playlist(true)
        .with_extractor(&extractor)
        .with_progress(recorder.clone());

    let report = Downloader::new(options).run().unwrap();
    assert_eq!(report.items.len(), 2);

    let first = &report.items[0];
    assert_eq!(first.path.as_deref(), Some(first_audio.as_path()));
    assert_eq!(first.cover, CoverStatus::Embedded("First Song.png".to_string()));
    assert_eq!(first.removed, vec![out.join("First Song.png")]);

    let picture = read_cover_art(&first_audio).unwrap().unwrap();
    assert_eq!(picture.mime_type.as_deref(), Some("image/jpeg"));
    assert_eq!(image::guess_format(&picture.data).unwrap(), ImageFormat::Jpeg);

    let second = &report.items[1];
    assert_eq!(second.path.as_deref(), Some(second_audio.as_path()));
    assert!(matches!(second.cover, CoverStatus::Failed(_)));
    assert_eq!(second.removed, vec![out.join("Second： Song.jpg")]);
    assert_eq!(read_cover_art(&second_audio).unwrap(), None);

    assert_eq!(report.covers_embedded(), 1);
    assert_eq!(report.covers_failed(), 1);
    assert_eq!(report.thumbnails_removed(), 2);
    assert!(!out.join("First Song.png").exists());

    let infos = recorder.infos.lock().unwrap();
    let downloads: Vec<&ProgressInfo> = infos
        .iter()
        .filter(|info| info.operation == OperationType::Download)
        .collect();
    assert_eq!(downloads.len(), 2);
    assert_eq!(downloads[0].percentage, Some(50.0));
    assert_eq!(downloads[1].total, Some(4096));
    assert_eq!(downloads[1].entry, Some((2, Some(2))));

    let covers: Vec<&ProgressInfo> = infos
        .iter()
        .filter(|info| info.operation == OperationType::CoverArt)
        .collect();
    assert_eq!(covers.len(), 2);
    assert_eq!(covers[1].current, 2);
    assert_eq!(covers[0].item.as_deref(), Some("First Song"));
}

#[test]
fn disabled_embedding_keeps_thumbnails_when_asked() {
    let _serial = serial();
    let tools = tempdir().unwrap();
    let output = tempdir().unwrap();
    let out = output.path();

    let audio = out.join("Clip.wav");
    common::write_silent_wav(&audio);
    fs::write(out.join("Clip.png"), common::png_bytes(8, 8)).unwrap();

    let lines = vec![item_line(serde_json::json!({
        "title": "Clip",
        "filepath": audio,
        "uploader": "Someone",
    }))];
    let extractor = fake_extractor(tools.path(), &lines);

    let options = DownloadOptions::new("https://example.com/watch?v=clip")
        .with_output_dir(out)
        .with_audio_format(AudioFormat::Wav)
        .with_embed_thumbnail(false)
        .with_clean_thumbnails(false)
        .with_extractor(&extractor);

    let report = Downloader::new(options).run().unwrap();
    let item = &report.items[0];

    assert!(matches!(item.cover, CoverStatus::Skipped(_)));
    assert!(item.removed.is_empty());
    assert!(out.join("Clip.png").exists());
    assert_eq!(read_cover_art(&audio).unwrap(), None);
    assert!(report.to_string().contains("Clip"));
}

#[test]
fn missing_output_directory_is_created() {
    let _serial = serial();
    let tools = tempdir().unwrap();
    let output = tempdir().unwrap();
    let nested = output.path().join("a").join("b");

    let extractor = fake_extractor(tools.path(), &[]);
    let options = DownloadOptions::new("https://example.com/watch?v=none")
        .with_output_dir(&nested)
        .with_extractor(&extractor);

    let report = Downloader::new(options).run().unwrap();
    assert!(report.items.is_empty());
    assert!(nested.is_dir());
}

#[test]
fn ignore_errors_keeps_items_finished_before_failure() {
    let _serial = serial();
    let tools = tempdir().unwrap();
    let output = tempdir().unwrap();
    let out = output.path();

    let audio = out.join("Good.wav");
    common::write_silent_wav(&audio);
    fs::write(out.join("Good.png"), common::png_bytes(16, 16)).unwrap();

    let lines = vec![item_line(serde_json::json!({
        "title": "Good",
        "filepath": audio,
    }))];
    let body = format!(
        "{}echo 'ERROR: [youtube] bad1: Video unavailable' >&2\nexit 1\n",
        print_lines(&lines)
    );
    let extractor = script(tools.path(), &body);

    let options = DownloadOptions::new("https://www.youtube.com/playlist?list=PL123")
        .with_output_dir(out)
        .with_audio_format(AudioFormat::Wav)
        .with_playlist(true)
        .with_ignore_errors(true)
        .with_extractor(&extractor);

    let report = Downloader::new(options).run().unwrap();
    assert_eq!(report.items.len(), 1);
    assert!(report.items[0].has_cover());
    assert!(read_cover_art(&audio).unwrap().is_some());
    assert!(!out.join("Good.png").exists());
}

#[test]
fn unmatched_items_get_distinct_files() {
    let _serial = serial();
    let tools = tempdir().unwrap();
    let output = tempdir().unwrap();
    let out = output.path();

    let first = out.join("aaa.wav");
    let second = out.join("bbb.wav");
    common::write_silent_wav(&first);
    common::write_silent_wav(&second);
    let covers = tempdir().unwrap();
    let cover_a = covers.path().join("a.png");
    let cover_b = covers.path().join("b.png");
    fs::write(&cover_a, common::png_bytes(10, 10)).unwrap();
    fs::write(&cover_b, common::png_bytes(20, 20)).unwrap();

    let lines = vec![
        item_line(serde_json::json!({ "title": "Song A", "thumbnail": cover_a })),
        item_line(serde_json::json!({ "title": "Song B", "thumbnail": cover_b })),
    ];
    let extractor = fake_extractor(tools.path(), &lines);

    let options = DownloadOptions::new("https://www.youtube.com/playlist?list=PL123")
        .with_output_dir(out)
        .with_audio_format(AudioFormat::Wav)
        .with_playlist(true)
        .with_extractor(&extractor);

    let report = Downloader::new(options).run().unwrap();
    assert_eq!(report.items.len(), 2);
    assert!(report.items.iter().all(|item| item.has_cover()));

    let first_path = report.items[0].path.clone().unwrap();
    let second_path = report.items[1].path.clone().unwrap();
    assert_ne!(first_path, second_path);

    assert!(read_cover_art(&first).unwrap().is_some());
    assert!(read_cover_art(&second).unwrap().is_some());
}

#[test]
fn undecodable_output_line_does_not_abort_the_run() {
    let _serial = serial();
    let tools = tempdir().unwrap();
    let output = tempdir().unwrap();
    let out = output.path();

    let audio = out.join("Cafe.wav");
    common::write_silent_wav(&audio);
    fs::write(out.join("Cafe.png"), common::png_bytes(8, 8)).unwrap();

    let lines = vec![item_line(serde_json::json!({
        "title": "Cafe",
        "filepath": audio,
    }))];
    let body = format!(
        "printf '[download] Caf\\351 titre\\n'\n{}exit 0\n",
        print_lines(&lines)
    );
    let extractor = script(tools.path(), &body);

    let options = DownloadOptions::new("https://example.com/watch?v=cafe")
        .with_output_dir(out)
        .with_audio_format(AudioFormat::Wav)
        .with_extractor(&extractor);

    let report = Downloader::new(options).run().unwrap();
    assert_eq!(report.items.len(), 1);
    assert!(report.items[0].has_cover());
}
