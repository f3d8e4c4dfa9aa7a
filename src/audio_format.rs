//! Target audio formats and quality settings.
//!
//! These map one-to-one onto the extractor's `--audio-format` and
//! `--audio-quality` values. Conversion itself is performed by the
//! extractor's ffmpeg post-processor; this module only names the target and
//! knows which file extension the result will carry.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::TunegrabError;

/// Audio file extensions the locator and cleanup passes recognise.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "opus", "ogg", "wav", "webm", "mka",
];

/// Target audio format for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioFormat {
    /// Keep whatever audio codec the source offers.
    Best,
    /// MPEG-1 Layer III. This is the default.
    #[default]
    Mp3,
    /// AAC in an MP4 container.
    M4a,
    /// Raw AAC (ADTS).
    Aac,
    /// Free Lossless Audio Codec.
    Flac,
    /// Opus in an Ogg container.
    Opus,
    /// Vorbis in an Ogg container.
    Vorbis,
    /// PCM WAV.
    Wav,
    /// Apple Lossless in an MP4 container.
    Alac,
}

impl AudioFormat {
    /// The value passed to the extractor's `--audio-format`.
    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Best => "best",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "opus",
            AudioFormat::Vorbis => "vorbis",
            AudioFormat::Wav => "wav",
            AudioFormat::Alac => "alac",
        }
    }

    /// File extension of the converted file.
    ///
    /// `None` for [`AudioFormat::Best`], whose extension depends on the
    /// source stream.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            AudioFormat::Best => None,
            AudioFormat::Mp3 => Some("mp3"),
            AudioFormat::M4a | AudioFormat::Alac => Some("m4a"),
            AudioFormat::Aac => Some("aac"),
            AudioFormat::Flac => Some("flac"),
            AudioFormat::Opus => Some("opus"),
            AudioFormat::Vorbis => Some("ogg"),
            AudioFormat::Wav => Some("wav"),
        }
    }

    /// Whether `extension` (without the dot, any case) is a plausible output
    /// file extension for this format.
    pub fn matches_extension(self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        match self.extension() {
            Some(expected) => extension == expected,
            None => AUDIO_EXTENSIONS.contains(&extension.as_str()),
        }
    }

    /// FFmpeg decoder names that are expected for files in this format.
    ///
    /// Used by output validation. Empty for [`AudioFormat::Best`].
    pub fn expected_codecs(self) -> &'static [&'static str] {
        match self {
            AudioFormat::Best => &[],
            AudioFormat::Mp3 => &["mp3", "mp3float"],
            AudioFormat::M4a | AudioFormat::Aac => &["aac", "aac_fixed"],
            AudioFormat::Flac => &["flac"],
            AudioFormat::Opus => &["opus", "libopus"],
            AudioFormat::Vorbis => &["vorbis", "libvorbis"],
            AudioFormat::Wav => &["pcm_s16le", "pcm_s24le", "pcm_s32le", "pcm_f32le"],
            AudioFormat::Alac => &["alac"],
        }
    }
}

impl Display for AudioFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = TunegrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best" => Ok(AudioFormat::Best),
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            "aac" => Ok(AudioFormat::Aac),
            "flac" => Ok(AudioFormat::Flac),
            "opus" => Ok(AudioFormat::Opus),
            "vorbis" | "ogg" => Ok(AudioFormat::Vorbis),
            "wav" => Ok(AudioFormat::Wav),
            "alac" => Ok(AudioFormat::Alac),
            other => Err(TunegrabError::InvalidOption {
                name: "audio format",
                reason: format!("unsupported format {other:?}"),
            }),
        }
    }
}

/// Conversion quality handed to the extractor.
///
/// Values `0` through `10` select a variable bit rate (0 is best); anything
/// larger, or a number suffixed with `K`, is a constant bit rate in kbit/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioQuality {
    /// VBR quality level, 0 (best) to 10 (worst).
    Vbr(u8),
    /// Constant bit rate in kbit/s.
    Bitrate(u32),
}

impl Default for AudioQuality {
    fn default() -> Self {
        AudioQuality::Bitrate(320)
    }
}

impl AudioQuality {
    /// The value passed to the extractor's `--audio-quality`.
    pub fn to_argument(self) -> String {
        match self {
            AudioQuality::Vbr(level) => level.to_string(),
            AudioQuality::Bitrate(kbps) => format!("{kbps}K"),
        }
    }
}

impl Display for AudioQuality {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AudioQuality::Vbr(level) => write!(f, "VBR {level}"),
            AudioQuality::Bitrate(kbps) => write!(f, "{kbps} kbit/s"),
        }
    }
}

impl FromStr for AudioQuality {
    type Err = TunegrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = |reason: String| TunegrabError::InvalidOption {
            name: "quality",
            reason,
        };

        if let Some(number) = trimmed
            .strip_suffix('K')
            .or_else(|| trimmed.strip_suffix('k'))
        {
            let kbps: u32 = number
                .trim()
                .parse()
                .map_err(|_| invalid(format!("{trimmed:?} is not a bit rate")))?;
            if kbps == 0 {
                return Err(invalid("bit rate must be greater than zero".to_string()));
            }
            return Ok(AudioQuality::Bitrate(kbps));
        }

        let number: u32 = trimmed
            .parse()
            .map_err(|_| invalid(format!("{trimmed:?} is neither 0-10 nor a bit rate")))?;
        match u8::try_from(number) {
            Ok(level) if level <= 10 => Ok(AudioQuality::Vbr(level)),
            _ => Ok(AudioQuality::Bitrate(number)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioFormat, AudioQuality};

    #[test]
    fn parse_audio_format_aliases() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("ogg".parse::<AudioFormat>().unwrap(), AudioFormat::Vorbis);
        assert_eq!(" flac ".parse::<AudioFormat>().unwrap(), AudioFormat::Flac);
        assert!("wma".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn extensions_follow_container() {
        assert_eq!(AudioFormat::Alac.extension(), Some("m4a"));
        assert_eq!(AudioFormat::Vorbis.extension(), Some("ogg"));
        assert_eq!(AudioFormat::Best.extension(), None);
        assert!(AudioFormat::Best.matches_extension("OPUS"));
        assert!(!AudioFormat::Mp3.matches_extension("m4a"));
    }

    #[test]
    fn parse_quality_levels_and_bitrates() {
        assert_eq!("0".parse::<AudioQuality>().unwrap(), AudioQuality::Vbr(0));
        assert_eq!("10".parse::<AudioQuality>().unwrap(), AudioQuality::Vbr(10));
        assert_eq!(
            "320".parse::<AudioQuality>().unwrap(),
            AudioQuality::Bitrate(320)
        );
        assert_eq!(
            "128k".parse::<AudioQuality>().unwrap(),
            AudioQuality::Bitrate(128)
        );
        assert!("0K".parse::<AudioQuality>().is_err());
        assert!("loud".parse::<AudioQuality>().is_err());
        assert!("-3".parse::<AudioQuality>().is_err());
    }

    #[test]
    fn quality_argument_rendering() {
        assert_eq!(AudioQuality::Vbr(5).to_argument(), "5");
        assert_eq!(AudioQuality::default().to_argument(), "320K");
    }
}
