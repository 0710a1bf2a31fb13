use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FfmpegError {
    #[error("{name} binary not found (set FFMPEG_PATH or add it to PATH)")]
    BinaryNotFound { name: String },
    #[error("failed to spawn ffmpeg: {message}")]
    Spawn { message: String },
    #[error("{message}")]
    ProcessFailed {
        exit_code: Option<i32>,
        signal: Option<i32>,
        message: String,
        stdout: String,
        stderr: String,
    },
    #[error("process ran into a timeout ({}s)", .elapsed.as_secs_f64())]
    Timeout { elapsed: Duration },
    #[error("ffmpeg was cancelled")]
    Cancelled,
    #[error("invalid command: {message}")]
    InvalidCommand { message: String },
    #[error("invalid timemark: {value:?}")]
    InvalidTimemark { value: String },
    #[error("capability query failed: {message}")]
    Capabilities { message: String },
}

impl FfmpegError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FfmpegError::InvalidCommand {
            message: message.into(),
        }
    }

    /// Cancellation is reported as a notice, not as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FfmpegError::Cancelled)
    }
}
