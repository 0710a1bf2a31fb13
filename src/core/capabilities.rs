//! Queries of what the local ffmpeg build supports.

use std::collections::BTreeMap;
use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::config::RunConfig;
use crate::core::error::FfmpegError;
use crate::core::locate::locate_ffmpeg;

static RE_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([D ])([E ])[d ]?\s+(\S+)\s+(.*)$").unwrap());
static RE_CODEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([D.])([E.])([VASDT])([I.])([L.])([S.])\s+(\S+)\s+(.*)$").unwrap()
});
static RE_ENCODER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([VASDT.])([F.])([S.])([X.])([B.])([D.])\s+(\S+)\s+(.*)$").unwrap()
});
static RE_FILTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[T.][S.][C.]\s+)?(\S+)\s+([AVN|]+)->([AVN|]+)\s+(.*)$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    /// Encoders listed without a type marker.
    Unknown,
}

impl MediaType {
    fn from_marker(marker: &str) -> Self {
        match marker {
            "V" => MediaType::Video,
            "A" => MediaType::Audio,
            "S" => MediaType::Subtitle,
            "D" => MediaType::Data,
            "T" => MediaType::Attachment,
            _ => MediaType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub description: String,
    pub can_demux: bool,
    pub can_mux: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInfo {
    pub kind: MediaType,
    pub description: String,
    pub can_decode: bool,
    pub can_encode: bool,
    pub intra_frame_only: bool,
    pub is_lossy: bool,
    pub is_lossless: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderInfo {
    pub kind: MediaType,
    pub description: String,
    pub frame_mt: bool,
    pub slice_mt: bool,
    pub experimental: bool,
    pub draw_horiz_band: bool,
    pub direct_rendering: bool,
}

/// Pad kinds of a filter's inputs or outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadKind {
    Audio,
    Video,
    /// Source or sink side.
    None,
    /// Count decided at runtime.
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInfo {
    pub description: String,
    pub input: PadKind,
    pub multiple_inputs: bool,
    pub output: PadKind,
    pub multiple_outputs: bool,
}

fn pads(spec: &str) -> (PadKind, bool) {
    let kind = match spec.chars().next() {
        Some('A') => PadKind::Audio,
        Some('V') => PadKind::Video,
        Some('N') => PadKind::Dynamic,
        _ => PadKind::None,
    };
    (kind, spec.len() > 1)
}

/// Lines following the `--` separator that ends ffmpeg's legend.
fn listing(output: &str) -> impl Iterator<Item = &str> {
    let has_separator = output.lines().any(is_separator);
    output
        .lines()
        .skip_while(move |line| has_separator && !is_separator(line))
        .skip(usize::from(has_separator))
        .filter(|line| !line.trim().is_empty())
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.chars().all(|c| c == '-')
}

pub fn parse_formats(output: &str) -> BTreeMap<String, FormatInfo> {
    let mut formats = BTreeMap::new();
    for line in listing(output) {
        let Some(caps) = RE_FORMAT.captures(line) else {
            continue;
        };
        let can_demux = &caps[1] == "D";
        let can_mux = &caps[2] == "E";
        for name in caps[3].split(',') {
            // A name may appear once as demuxer and once as muxer.
            let entry = formats.entry(name.to_string()).or_insert_with(|| FormatInfo {
                description: caps[4].trim().to_string(),
                can_demux: false,
                can_mux: false,
            });
            entry.can_demux |= can_demux;
            entry.can_mux |= can_mux;
        }
    }
    formats
}

pub fn parse_codecs(output: &str) -> BTreeMap<String, CodecInfo> {
    listing(output)
        .filter_map(|line| RE_CODEC.captures(line))
        .map(|caps| {
            (
                caps[7].to_string(),
                CodecInfo {
                    kind: MediaType::from_marker(&caps[3]),
                    description: caps[8].trim().to_string(),
                    can_decode: &caps[1] == "D",
                    can_encode: &caps[2] == "E",
                    intra_frame_only: &caps[4] == "I",
                    is_lossy: &caps[5] == "L",
                    is_lossless: &caps[6] == "S",
                },
            )
        })
        .collect()
}

pub fn parse_encoders(output: &str) -> BTreeMap<String, EncoderInfo> {
    listing(output)
        .filter_map(|line| RE_ENCODER.captures(line))
        .map(|caps| {
            (
                caps[7].to_string(),
                EncoderInfo {
                    kind: MediaType::from_marker(&caps[1]),
                    description: caps[8].trim().to_string(),
                    frame_mt: &caps[2] == "F",
                    slice_mt: &caps[3] == "S",
                    experimental: &caps[4] == "X",
                    draw_horiz_band: &caps[5] == "B",
                    direct_rendering: &caps[6] == "D",
                },
            )
        })
        .collect()
}

pub fn parse_filters(output: &str) -> BTreeMap<String, FilterInfo> {
    output
        .lines()
        .filter_map(|line| RE_FILTER.captures(line))
        .map(|caps| {
            let (input, multiple_inputs) = pads(&caps[2]);
            let (output, multiple_outputs) = pads(&caps[3]);
            (
                caps[1].to_string(),
                FilterInfo {
                    description: caps[4].trim().to_string(),
                    input,
                    multiple_inputs,
                    output,
                    multiple_outputs,
                },
            )
        })
        .collect()
}

fn query(config: &RunConfig, flag: &str) -> Result<String, FfmpegError> {
    let ffmpeg = locate_ffmpeg(config)?;
    log::debug!("querying {} {flag}", ffmpeg.display());
    let output = Command::new(&ffmpeg)
        .args(["-hide_banner", flag])
        .stdin(Stdio::null())
        .output()
        .map_err(|err| FfmpegError::Capabilities {
            message: format!("{}: {err}", ffmpeg.display()),
        })?;
    if !output.status.success() {
        return Err(FfmpegError::Capabilities {
            message: format!(
                "{flag} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn available_formats(config: &RunConfig) -> Result<BTreeMap<String, FormatInfo>, FfmpegError> {
    query(config, "-formats").map(|text| parse_formats(&text))
}

pub fn available_codecs(config: &RunConfig) -> Result<BTreeMap<String, CodecInfo>, FfmpegError> {
    query(config, "-codecs").map(|text| parse_codecs(&text))
}

pub fn available_encoders(
    config: &RunConfig,
) -> Result<BTreeMap<String, EncoderInfo>, FfmpegError> {
    query(config, "-encoders").map(|text| parse_encoders(&text))
}

pub fn available_filters(config: &RunConfig) -> Result<BTreeMap<String, FilterInfo>, FfmpegError> {
    query(config, "-filters").map(|text| parse_filters(&text))
}
