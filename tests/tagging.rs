mod common;

use lofty::prelude::*;
use lofty::probe::Probe;
use tempfile::tempdir;
use tunegrab::{
    CoverArtOptions, CoverFormat, TrackInfo, TunegrabError, embed_cover_art, fill_missing_fields,
    normalize_cover_art, read_cover_art,
};

fn track() -> TrackInfo {
    TrackInfo {
        title: Some("Video Title".to_string()),
        track: Some("Track Name".to_string()),
        uploader: Some("Channel".to_string()),
        album: Some("Album".to_string()),
        ..TrackInfo::default()
    }
}

fn primary_title(path: &std::path::Path) -> Option<String> {
    let tagged_file = Probe::open(path).unwrap().read().unwrap();
    tagged_file
        .primary_tag()
        .and_then(|tag| tag.title().map(|title| title.into_owned()))
}

#[test]
fn embedded_cover_reads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.wav");
    common::write_silent_wav(&path);

    assert_eq!(read_cover_art(&path).unwrap(), None);

    let cover = normalize_cover_art(&common::png_bytes(32, 32), &CoverArtOptions::default())
        .unwrap();
    embed_cover_art(&path, &cover, None).unwrap();

    let picture = read_cover_art(&path).unwrap().expect("cover should be embedded");
    assert_eq!(picture.data, cover.data);
    assert_eq!(picture.mime_type.as_deref(), Some("image/jpeg"));
    assert_eq!(primary_title(&path), None);
}

#[test]
fn embedding_again_replaces_the_front_cover() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.wav");
    common::write_silent_wav(&path);

    let first = normalize_cover_art(&common::png_bytes(16, 16), &CoverArtOptions::default())
        .unwrap();
    let second = normalize_cover_art(
        &common::png_bytes(24, 24),
        &CoverArtOptions::default().with_format(CoverFormat::Png),
    )
    .unwrap();

    embed_cover_art(&path, &first, None).unwrap();
    embed_cover_art(&path, &second, None).unwrap();

    let tagged_file = Probe::open(&path).unwrap().read().unwrap();
    let tag = tagged_file.primary_tag().unwrap();
    assert_eq!(tag.picture_count(), 1);

    let picture = read_cover_art(&path).unwrap().unwrap();
    assert_eq!(picture.data, second.data);
    assert_eq!(picture.mime_type.as_deref(), Some("image/png"));
}

#[test]
fn fields_are_filled_alongside_the_cover() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.wav");
    common::write_silent_wav(&path);

    let cover = normalize_cover_art(&common::png_bytes(8, 8), &CoverArtOptions::default())
        .unwrap();
    embed_cover_art(&path, &cover, Some(&track())).unwrap();

    let tagged_file = Probe::open(&path).unwrap().read().unwrap();
    let tag = tagged_file.primary_tag().unwrap();
    assert_eq!(tag.title().as_deref(), Some("Track Name"));
    assert_eq!(tag.artist().as_deref(), Some("Channel"));
    assert_eq!(tag.album().as_deref(), Some("Album"));
}

#[test]
fn existing_fields_are_not_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.wav");
    common::write_silent_wav(&path);

    let first = TrackInfo {
        title: Some("Kept".to_string()),
        ..TrackInfo::default()
    };
    fill_missing_fields(&path, &first).unwrap();
    fill_missing_fields(&path, &track()).unwrap();

    let tagged_file = Probe::open(&path).unwrap().read().unwrap();
    let tag = tagged_file.primary_tag().unwrap();
    assert_eq!(tag.title().as_deref(), Some("Kept"));
    assert_eq!(tag.artist().as_deref(), Some("Channel"));
}

#[test]
fn unparseable_file_is_a_tagging_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.mp3");
    std::fs::write(&path, b"definitely not audio").unwrap();

    let cover = normalize_cover_art(&common::png_bytes(8, 8), &CoverArtOptions::default())
        .unwrap();
    let result = embed_cover_art(&path, &cover, None);
    assert!(matches!(result, Err(TunegrabError::Tagging { .. })));

    let missing = dir.path().join("missing.mp3");
    assert!(matches!(
        read_cover_art(&missing),
        Err(TunegrabError::Tagging { .. })
    ));
}
