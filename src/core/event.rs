use crate::core::metadata::CodecData;
use crate::core::progress::ProgressEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Progress,
    Input,
    Output,
    Warning,
    Error,
    Noise,
}

/// Events of one run, as delivered over the channel returned by
/// [`crate::core::run_with_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum FfmpegEvent {
    Start(String),
    CodecData(CodecData),
    Progress(ProgressEvent),
    Stderr(String),
    Error {
        message: String,
        stdout: String,
        stderr: String,
    },
    End {
        stdout: String,
        stderr: String,
    },
    Cancelled,
}

impl FfmpegEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FfmpegEvent::Error { .. } | FfmpegEvent::End { .. } | FfmpegEvent::Cancelled
        )
    }
}

/// Rough classification of a diagnostic line, used to pick a log level.
pub fn classify_log_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Noise;
    }

    if trimmed.starts_with("Input #") {
        return LineKind::Input;
    }
    if trimmed.starts_with("Output #") {
        return LineKind::Output;
    }
    if trimmed.contains("time=") && (trimmed.contains("frame=") || trimmed.contains("size=")) {
        return LineKind::Progress;
    }

    let lower = trimmed.to_ascii_lowercase();
    let noise_prefixes = [
        "ffmpeg version",
        "built with",
        "configuration:",
        "libavutil",
        "libavcodec",
        "libavformat",
        "libavdevice",
        "libavfilter",
        "libswscale",
        "libswresample",
        "libpostproc",
    ];
    if noise_prefixes.iter().any(|prefix| lower.starts_with(prefix)) {
        return LineKind::Noise;
    }

    if lower.contains("error") || lower.contains("invalid") || lower.contains("no such file") {
        return LineKind::Error;
    }

    if lower.contains("warning") || lower.contains("deprecated") {
        return LineKind::Warning;
    }

    LineKind::Noise
}
