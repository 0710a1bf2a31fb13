use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::timemark::timemark_to_seconds;

/// Codec information gathered from ffmpeg's input banner.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecData {
    /// Input container format, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    pub format: String,
    /// First audio codec seen, or `"none"`.
    pub audio: String,
    pub audio_details: Vec<String>,
    /// First video codec seen, or `"none"`.
    pub video: String,
    pub video_details: Vec<String>,
    /// Raw `Duration:` value of the first input, if reported.
    pub duration: Option<String>,
}

impl CodecData {
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration
            .as_deref()
            .and_then(|value| timemark_to_seconds(value).ok())
    }
}

static RE_INPUT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Input #\d+, ([^ ]+),").unwrap());
static RE_DURATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*Duration: ([^,]+)").unwrap());
static RE_AUDIO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Stream #\d+:\d+.*?Audio: (.*)").unwrap());
static RE_VIDEO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Stream #\d+:\d+.*?Video: (.*)").unwrap());
static RE_OUTPUT_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*Output #\d+").unwrap());
static RE_BANNER_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Stream mapping:|Press (\[q\]|ctrl-c) to stop").unwrap());

#[derive(Debug, Default)]
struct PendingCodecs {
    format: Option<String>,
    audio: Option<(String, Vec<String>)>,
    video: Option<(String, Vec<String>)>,
    duration: Option<String>,
}

/// Collects codec declarations across input banners and releases them once,
/// when the banner section ends. After that it ignores every line.
#[derive(Debug, Default)]
pub struct MetadataParser {
    pending: PendingCodecs,
    in_input: bool,
    seen_input: bool,
    latched: bool,
}

impl MetadataParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Duration of the first input once its banner has been read.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.pending
            .duration
            .as_deref()
            .and_then(|value| timemark_to_seconds(value).ok())
    }

    /// Feeds one diagnostic line. Returns the codec data when this line closes
    /// the input banners.
    pub fn parse_line(&mut self, line: &str) -> Option<CodecData> {
        if self.latched {
            return None;
        }

        if let Some(capture) = RE_INPUT_HEADER.captures(line) {
            self.in_input = true;
            if !self.seen_input {
                self.pending.format = capture.get(1).map(|m| m.as_str().to_string());
            }
            self.seen_input = true;
            return None;
        }

        if self.in_input {
            if let Some(capture) = RE_DURATION.captures(line) {
                if self.pending.duration.is_none() {
                    self.pending.duration = capture.get(1).map(|m| m.as_str().trim().to_string());
                }
                return None;
            }
            if let Some(capture) = RE_AUDIO.captures(line) {
                if self.pending.audio.is_none() {
                    self.pending.audio = Some(split_details(&capture[1]));
                }
                return None;
            }
            if let Some(capture) = RE_VIDEO.captures(line) {
                if self.pending.video.is_none() {
                    self.pending.video = Some(split_details(&capture[1]));
                }
                return None;
            }
        }

        if RE_OUTPUT_HEADER.is_match(line) {
            self.in_input = false;
            return self.release();
        }

        if RE_BANNER_END.is_match(line) {
            return self.release();
        }

        None
    }

    /// Releases whatever was collected, e.g. when progress starts before a
    /// banner terminator was seen.
    pub fn flush(&mut self) -> Option<CodecData> {
        if self.latched {
            return None;
        }
        self.release()
    }

    fn release(&mut self) -> Option<CodecData> {
        if !self.seen_input {
            return None;
        }
        self.latched = true;
        self.in_input = false;

        let pending = std::mem::take(&mut self.pending);
        let (audio, audio_details) = pending
            .audio
            .unwrap_or_else(|| ("none".to_string(), Vec::new()));
        let (video, video_details) = pending
            .video
            .unwrap_or_else(|| ("none".to_string(), Vec::new()));
        let data = CodecData {
            format: pending.format.unwrap_or_default(),
            audio,
            audio_details,
            video,
            video_details,
            duration: pending.duration.clone(),
        };
        self.pending.duration = pending.duration;
        Some(data)
    }
}

fn split_details(text: &str) -> (String, Vec<String>) {
    let details: Vec<String> = text.split(", ").map(|part| part.trim().to_string()).collect();
    let codec = details.first().cloned().unwrap_or_default();
    (codec, details)
}
