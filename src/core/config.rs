use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::FfmpegError;

pub const DEFAULT_STDOUT_LINES: usize = 100;

/// Process-level settings of a command. Shared between clones until one of
/// them changes it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Explicit ffmpeg binary; otherwise `FFMPEG_PATH` and then `PATH`.
    pub ffmpeg_path: Option<PathBuf>,
    /// Applied through `nice -n` on unix when non-zero.
    pub niceness: i32,
    /// Lines retained per stream for error reports; 0 keeps everything.
    pub stdout_lines: usize,
    pub timeout: Option<Duration>,
    /// Keep stdout lines in the stdout ring when stdout is not a pipe target.
    pub capture_stdout: bool,
    /// Feed stdout lines to the diagnostics parser as well.
    pub merge_stdout: bool,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            niceness: 0,
            stdout_lines: DEFAULT_STDOUT_LINES,
            timeout: None,
            capture_stdout: false,
            merge_stdout: false,
            working_dir: None,
            env: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn validate_niceness(niceness: i32) -> Result<i32, FfmpegError> {
        if (-20..=20).contains(&niceness) {
            Ok(niceness)
        } else {
            Err(FfmpegError::invalid(format!(
                "niceness must be between -20 and 20, got {niceness}"
            )))
        }
    }
}
