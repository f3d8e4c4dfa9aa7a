//! Writing cover art and basic fields into the audio file's own tags.
//!
//! The tag container depends on the file type (ID3v2 for MP3 and WAV, MP4
//! atoms for M4A, Vorbis comments for Ogg/Opus/FLAC); the tag library
//! picks the primary one and handles its layout.

use std::path::Path;

use image::ImageFormat;
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::Tag;

use crate::error::TunegrabError;
use crate::metadata::TrackInfo;
use crate::thumbnail::CoverArt;

/// A picture read back from a file's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPicture {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Declared MIME type.
    pub mime_type: Option<String>,
}

fn lofty_mime(format: ImageFormat) -> MimeType {
    match format {
        ImageFormat::Jpeg => MimeType::Jpeg,
        ImageFormat::Png => MimeType::Png,
        ImageFormat::Gif => MimeType::Gif,
        ImageFormat::Bmp => MimeType::Bmp,
        ImageFormat::Tiff => MimeType::Tiff,
        other => MimeType::Unknown(other.to_mime_type().to_string()),
    }
}

/// Embed `cover` as the front cover of the file at `path`.
///
/// Any existing front cover is replaced. When `fields` is given, empty
/// title, artist, and album fields are filled from it in the same write.
///
/// # Errors
///
/// Returns [`TunegrabError::Tagging`] if the file cannot be parsed or
/// written.
pub fn embed_cover_art(
    path: &Path,
    cover: &CoverArt,
    fields: Option<&TrackInfo>,
) -> Result<(), TunegrabError> {
    let mut tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .map_err(|error| TunegrabError::tagging(path, error))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.primary_tag().is_none() {
        log::debug!("Creating {tag_type:?} tag in {}", path.display());
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let Some(tag) = tagged_file.primary_tag_mut() else {
        return Err(TunegrabError::Tagging {
            path: path.to_path_buf(),
            reason: format!("file type does not accept a {tag_type:?} tag"),
        });
    };

    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(Picture::new_unchecked(
        PictureType::CoverFront,
        Some(lofty_mime(cover.format)),
        None,
        cover.data.clone(),
    ));

    if let Some(info) = fields {
        fill_missing(tag, info);
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|error| TunegrabError::tagging(path, error))?;

    log::debug!(
        "Embedded {} cover ({}x{}) into {}",
        cover.mime_type(),
        cover.width,
        cover.height,
        path.display()
    );
    Ok(())
}

/// Fill empty title, artist, and album fields of the file's primary tag.
///
/// Fields that already hold a value are left alone.
///
/// # Errors
///
/// Returns [`TunegrabError::Tagging`] if the file cannot be parsed or
/// written.
pub fn fill_missing_fields(path: &Path, info: &TrackInfo) -> Result<(), TunegrabError> {
    let mut tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .map_err(|error| TunegrabError::tagging(path, error))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.primary_tag().is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let Some(tag) = tagged_file.primary_tag_mut() else {
        return Ok(());
    };

    if fill_missing(tag, info) {
        tag.save_to_path(path, WriteOptions::default())
            .map_err(|error| TunegrabError::tagging(path, error))?;
    }
    Ok(())
}

/// Returns `true` if anything changed.
fn fill_missing(tag: &mut Tag, info: &TrackInfo) -> bool {
    let mut changed = false;

    if tag.title().is_none() {
        if let Some(title) = info.tag_title() {
            tag.set_title(title.to_string());
            changed = true;
        }
    }
    if tag.artist().is_none() {
        if let Some(artist) = info.tag_artist() {
            tag.set_artist(artist.to_string());
            changed = true;
        }
    }
    if tag.album().is_none() {
        if let Some(album) = info.album.as_deref() {
            tag.set_album(album.to_string());
            changed = true;
        }
    }

    changed
}

/// Read the front cover from any of the file's tags.
///
/// # Errors
///
/// Returns [`TunegrabError::Tagging`] if the file cannot be parsed.
pub fn read_cover_art(path: &Path) -> Result<Option<EmbeddedPicture>, TunegrabError> {
    let tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .map_err(|error| TunegrabError::tagging(path, error))?;

    let picture = tagged_file
        .tags()
        .iter()
        .find_map(|tag| tag.get_picture_type(PictureType::CoverFront))
        .map(|picture| EmbeddedPicture {
            data: picture.data().to_vec(),
            mime_type: picture.mime_type().map(|mime| mime.as_str().to_string()),
        });

    Ok(picture)
}
