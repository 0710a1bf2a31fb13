use std::collections::VecDeque;

use crate::core::event::{classify_log_line, LineKind};
use crate::core::metadata::{CodecData, MetadataParser};
use crate::core::progress::{ProgressAccumulator, ProgressEvent};

const MAX_BANNER_LINES: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    CodecData(CodecData),
    Progress(ProgressEvent),
}

/// Line-driven scanner over ffmpeg's stderr.
///
/// Codec banners are read until the first codec data is released, progress
/// lines produce one event each, and the trailing block of unindented lines is
/// kept as the error banner. Unrecognised lines are ignored.
#[derive(Debug, Default)]
pub struct DiagnosticsParser {
    metadata: MetadataParser,
    progress: ProgressAccumulator,
    banner: VecDeque<String>,
}

impl DiagnosticsParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_line(&mut self, line: &str, mut emit: impl FnMut(DiagnosticEvent)) {
        log_line(line);

        if let Some(data) = self.metadata.parse_line(line) {
            emit(DiagnosticEvent::CodecData(data));
        }

        if let Some(event) = self.progress.update(line, self.metadata.duration_seconds()) {
            if let Some(data) = self.metadata.flush() {
                emit(DiagnosticEvent::CodecData(data));
            }
            emit(DiagnosticEvent::Progress(event));
            return;
        }

        self.track_banner(line);
    }

    /// Releases codec data that never saw a banner terminator.
    pub fn finish(&mut self) -> Option<CodecData> {
        self.metadata.flush()
    }

    /// The trailing run of lines that are neither indented nor prefixed with
    /// a `[context]` tag.
    pub fn error_banner(&self) -> Option<String> {
        if self.banner.is_empty() {
            return None;
        }
        Some(self.banner.iter().cloned().collect::<Vec<_>>().join("\n"))
    }

    fn track_banner(&mut self, line: &str) {
        if line.starts_with(' ') || line.starts_with('[') {
            self.banner.clear();
            return;
        }
        if self.banner.len() == MAX_BANNER_LINES {
            self.banner.pop_front();
        }
        self.banner.push_back(line.to_string());
    }
}

fn log_line(line: &str) {
    match classify_log_line(line) {
        LineKind::Warning => log::warn!("ffmpeg: {line}"),
        LineKind::Error => log::debug!("ffmpeg: {line}"),
        _ => log::trace!("ffmpeg: {line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lines: &[&str]) -> (DiagnosticsParser, Vec<DiagnosticEvent>) {
        let mut parser = DiagnosticsParser::new();
        let mut events = Vec::new();
        for line in lines {
            parser.parse_line(line, |event| events.push(event));
        }
        (parser, events)
    }

    #[test]
    fn codec_data_then_progress() {
        let (_, events) = run(&[
            "Input #0, matroska,webm, from 'in.mkv':",
            "  Duration: 00:00:10.00, start: 0.000000, bitrate: 800 kb/s",
            "    Stream #0:0: Video: vp9 (Profile 0), yuv420p(tv), 640x360, 25 fps",
            "frame=   50 fps=0.0 q=28.0 size=     256kB time=00:00:02.00 bitrate=1048.6kbits/s speed=4.0x",
            "frame=  100 fps= 99 q=28.0 size=     512kB time=00:00:04.00 bitrate=1048.6kbits/s speed=4.0x",
        ]);
        assert_eq!(events.len(), 3);
        match &events[0] {
            DiagnosticEvent::CodecData(data) => {
                assert_eq!(data.format, "matroska,webm");
                assert_eq!(data.video, "vp9 (Profile 0)");
                assert_eq!(data.audio, "none");
            }
            other => panic!("unexpected {other:?}"),
        }
        match &events[2] {
            DiagnosticEvent::Progress(progress) => {
                assert_eq!(progress.frames, 100);
                assert_eq!(progress.percent, Some(40.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn progress_without_banner_emits_no_codec_data() {
        let (mut parser, events) = run(&["size=1kB time=00:00:01.00 bitrate=8.0kbits/s"]);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DiagnosticEvent::Progress(_)));
        assert!(parser.finish().is_none());
    }

    #[test]
    fn error_banner_is_trailing_unindented_block() {
        let (parser, _) = run(&[
            "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':",
            "  Duration: 00:00:01.00, start: 0.000000, bitrate: 1 kb/s",
            "[libx264 @ 0x55] broken ffmpeg default settings detected",
            "Error initializing output stream 0:0 -- Error while opening encoder",
            "Conversion failed!",
        ]);
        assert_eq!(
            parser.error_banner().as_deref(),
            Some("Error initializing output stream 0:0 -- Error while opening encoder\nConversion failed!")
        );
    }

    #[test]
    fn unrecognised_lines_are_ignored() {
        let (parser, events) = run(&["  Metadata:", "    encoder : Lavf"]);
        assert!(events.is_empty());
        assert!(parser.error_banner().is_none());
    }
}
