//! Lightweight probing of converted files.
//!
//! [`AudioProbe`] opens a file with the linked FFmpeg libraries, reads the
//! container and best audio stream properties, and closes it again. It is
//! how `tunegrab` checks that the extractor's conversion produced what was
//! asked for.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use ffmpeg_next::{codec::context::Context as CodecContext, media::Type};

use crate::error::TunegrabError;
use crate::metadata::AudioMetadata;

/// Lightweight audio file probe.
///
/// # Example
///
/// ```no_run
/// use tunegrab::AudioProbe;
///
/// let metadata = AudioProbe::probe("downloads/song.mp3")?;
/// println!("{:?} {} Hz, {:?}", metadata.codec, metadata.sample_rate, metadata.duration);
/// # Ok::<(), tunegrab::TunegrabError>(())
/// ```
pub struct AudioProbe;

impl AudioProbe {
    /// Probe a file and return its properties.
    ///
    /// A file without an audio stream is not an error here; its
    /// [`AudioMetadata::codec`] is `None` and validation reports it.
    ///
    /// # Errors
    ///
    /// Returns [`TunegrabError::FileOpen`] if FFmpeg cannot open or
    /// recognise the file, and [`TunegrabError::FfmpegError`] if the
    /// libraries fail to initialise.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<AudioMetadata, TunegrabError> {
        let path = path.as_ref();
        log::debug!("Probing {}", path.display());

        ffmpeg_next::init()?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| TunegrabError::FileOpen {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let format = input_context.format().name().to_string();

        let tags: HashMap<String, String> = input_context
            .metadata()
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        // Cover art travels as a single-frame video stream.
        let has_cover_art = input_context
            .streams()
            .any(|stream| stream.parameters().medium() == Type::Video);

        let mut metadata = AudioMetadata {
            format,
            duration,
            codec: None,
            sample_rate: 0,
            channels: 0,
            bit_rate: input_context.bit_rate().max(0) as u64,
            has_cover_art,
            tags,
        };

        if let Some(stream) = input_context.streams().best(Type::Audio) {
            let index = stream.index();
            let decoder_context =
                CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                    TunegrabError::FileOpen {
                        path: path.to_path_buf(),
                        reason: format!(
                            "Failed to read audio codec parameters for stream {index}: {error}"
                        ),
                    }
                })?;
            let audio_decoder =
                decoder_context
                    .decoder()
                    .audio()
                    .map_err(|error| TunegrabError::FileOpen {
                        path: path.to_path_buf(),
                        reason: format!(
                            "Failed to create audio decoder for stream {index}: {error}"
                        ),
                    })?;

            metadata.sample_rate = audio_decoder.rate();
            metadata.channels = audio_decoder.channels();
            let stream_bit_rate = audio_decoder.bit_rate() as u64;
            if stream_bit_rate > 0 {
                metadata.bit_rate = stream_bit_rate;
            }
            metadata.codec = Some(
                audio_decoder
                    .codec()
                    .map(|codec| codec.name().to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            );
        }

        Ok(metadata)
    }

    /// Probe several files. Failures are returned per file rather than
    /// aborting the batch.
    pub fn probe_many<P: AsRef<Path>>(paths: &[P]) -> Vec<Result<AudioMetadata, TunegrabError>> {
        paths.iter().map(Self::probe).collect()
    }
}
