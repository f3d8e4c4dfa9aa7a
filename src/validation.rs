//! Output validation.
//!
//! [`validate_output`] compares a probed file against the format that was
//! requested and returns a [`ValidationReport`].
//!
//! # Example
//!
//! ```no_run
//! use tunegrab::{AudioFormat, AudioProbe};
//!
//! let metadata = AudioProbe::probe("downloads/song.mp3")?;
//! let report = tunegrab::validate_output(&metadata, AudioFormat::Mp3);
//! if !report.is_valid() {
//!     print!("{report}");
//! }
//! # Ok::<(), tunegrab::TunegrabError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::Serialize;

use crate::audio_format::AudioFormat;
use crate::metadata::AudioMetadata;

/// Findings from checking a converted file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Informational notices (not problems).
    pub info: Vec<String>,
    /// Non-fatal issues.
    pub warnings: Vec<String>,
    /// The file is not usable audio.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` if no errors were found. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of entries (info + warnings + errors).
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len() + self.errors.len()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for item in &self.errors {
            writeln!(f, "[ERROR] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

/// Check probed metadata against the requested format.
pub fn validate_output(metadata: &AudioMetadata, expected: AudioFormat) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(codec) = metadata.codec.as_deref() else {
        report
            .errors
            .push("File contains no audio stream".to_string());
        return report;
    };

    if metadata.sample_rate == 0 {
        report.errors.push("Audio sample rate is zero".to_string());
    }
    if metadata.channels == 0 {
        report.errors.push("Audio channel count is zero".to_string());
    }

    if metadata.duration == Duration::ZERO {
        report
            .warnings
            .push("Duration is zero, the download may be truncated".to_string());
    }

    let expected_codecs = expected.expected_codecs();
    if !expected_codecs.is_empty() && !expected_codecs.contains(&codec) {
        report.warnings.push(format!(
            "Expected {expected} audio but found codec {codec}",
        ));
    }

    report.info.push(format!(
        "Audio: {} {}Hz {}ch {} kbit/s",
        codec,
        metadata.sample_rate,
        metadata.channels,
        metadata.bit_rate / 1000,
    ));

    if metadata.has_cover_art {
        report.info.push("Cover art present".to_string());
    } else {
        report.info.push("No cover art".to_string());
    }

    report
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::validate_output;
    use crate::audio_format::AudioFormat;
    use crate::metadata::AudioMetadata;

    fn metadata(codec: Option<&str>) -> AudioMetadata {
        AudioMetadata {
            format: "mp3".to_string(),
            duration: Duration::from_secs(200),
            codec: codec.map(str::to_string),
            sample_rate: 44_100,
            channels: 2,
            bit_rate: 320_000,
            has_cover_art: true,
            tags: HashMap::new(),
        }
    }

    #[test]
    fn matching_file_is_valid_without_warnings() {
        let report = validate_output(&metadata(Some("mp3float")), AudioFormat::Mp3);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
        assert!(report.info.iter().any(|line| line.contains("320 kbit/s")));
    }

    #[test]
    fn codec_mismatch_warns() {
        let report = validate_output(&metadata(Some("opus")), AudioFormat::Mp3);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(validate_output(&metadata(Some("opus")), AudioFormat::Best).warnings.is_empty());
    }

    #[test]
    fn missing_audio_is_an_error() {
        let report = validate_output(&metadata(None), AudioFormat::Mp3);
        assert!(!report.is_valid());
        assert!(report.to_string().contains("[ERROR] File contains no audio stream"));
    }

    #[test]
    fn zero_duration_and_sample_rate() {
        let mut broken = metadata(Some("mp3"));
        broken.duration = Duration::ZERO;
        broken.sample_rate = 0;
        let report = validate_output(&broken, AudioFormat::Mp3);
        assert_eq!(report.errors, vec!["Audio sample rate is zero".to_string()]);
        assert_eq!(report.warnings.len(), 1);
    }
}
