use std::time::Duration;

use crate::core::metadata::CodecData;
use crate::core::progress::ProgressEvent;
use crate::core::runner::RunReport;

pub fn format_codec_line(data: &CodecData) -> String {
    let format = if data.format.is_empty() {
        "unknown"
    } else {
        data.format.as_str()
    };
    let duration = data
        .duration_seconds()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map(format_duration)
        .unwrap_or_else(|| "--:--:--".to_string());
    format!(
        "Input  : {format} video={} audio={} duration={duration}",
        data.video, data.audio
    )
}

pub fn format_progress_line(update: &ProgressEvent) -> Option<String> {
    if update.frames == 0 && update.speed == 0.0 && update.time == 0.0 {
        return None;
    }

    let elapsed = Duration::try_from_secs_f64(update.time.max(0.0))
        .map(format_duration)
        .unwrap_or_else(|_| "--:--:--".to_string());
    let percent = update
        .percent
        .map(|percent| format!("{percent:.1}%"))
        .unwrap_or_else(|| "--.-%".to_string());

    Some(format!(
        "progress: time={elapsed} {percent} frame={} fps={} size={} speed={}x",
        update.frames,
        update.current_fps,
        format_bytes(update.target_size_kb.saturating_mul(1024)),
        update.speed
    ))
}

pub fn format_summary_line(report: &RunReport) -> String {
    let size = report
        .last_progress
        .as_ref()
        .map(|progress| format_bytes(progress.target_size_kb.saturating_mul(1024)))
        .unwrap_or_else(|| "unknown".to_string());
    let bitrate = match &report.last_progress {
        Some(progress) if progress.current_kbps > 0.0 => {
            format!("{:.1} kbps", progress.current_kbps)
        }
        _ => "unknown".to_string(),
    };
    format!(
        "Final  : size={size} bitrate={bitrate} elapsed={}",
        format_duration(report.elapsed)
    )
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let value = bytes as f64;
    if value >= GB {
        format!("{:.2} GB", value / GB)
    } else if value >= MB {
        format!("{:.2} MB", value / MB)
    } else if value >= KB {
        format!("{:.2} KB", value / KB)
    } else {
        format!("{} B", bytes)
    }
}
