//! Checks for the external tools a download depends on.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::TunegrabError;

/// Run `binary version_flag` and return the first line of its output.
///
/// # Errors
///
/// [`TunegrabError::ToolNotFound`] when the binary cannot be spawned or
/// exits unsuccessfully.
pub fn check_tool(binary: &Path, version_flag: &str) -> Result<String, TunegrabError> {
    let tool = binary.display().to_string();
    let output = Command::new(binary)
        .arg(version_flag)
        .stdin(Stdio::null())
        .output()
        .map_err(|error| TunegrabError::ToolNotFound {
            tool: tool.clone(),
            reason: error.to_string(),
        })?;

    if !output.status.success() {
        return Err(TunegrabError::ToolNotFound {
            tool,
            reason: format!("`{version_flag}` exited with {}", output.status),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown version")
        .to_string())
}

/// Version lines of the extractor and ffmpeg.
#[derive(Debug)]
pub struct Toolchain {
    /// Extractor version, or why it could not be run.
    pub extractor: Result<String, TunegrabError>,
    /// ffmpeg version, or why it could not be run.
    pub ffmpeg: Result<String, TunegrabError>,
    /// The ffmpeg binary that was checked.
    pub ffmpeg_binary: PathBuf,
}

impl Toolchain {
    /// Check `extractor` and the ffmpeg it would use.
    ///
    /// `ffmpeg_location` may name the binary itself or the directory
    /// holding it, as the extractor accepts both. `None` means `PATH`.
    pub fn detect(extractor: &Path, ffmpeg_location: Option<&Path>) -> Self {
        let extractor = check_tool(extractor, "--version");

        let ffmpeg_binary = match ffmpeg_location {
            Some(location) if location.is_dir() => location.join("ffmpeg"),
            Some(location) => location.to_path_buf(),
            None => PathBuf::from("ffmpeg"),
        };
        let ffmpeg = check_tool(&ffmpeg_binary, "-version");

        Self {
            extractor,
            ffmpeg,
            ffmpeg_binary,
        }
    }

    /// Whether both tools answered.
    pub fn is_ready(&self) -> bool {
        self.extractor.is_ok() && self.ffmpeg.is_ok()
    }
}
