use crate::core::error::FfmpegError;

/// Parses `[[hh:]mm:]ss[.fraction]`, `123.45` or `123.45s` into seconds.
/// Only the leading field may exceed 59, so hours are not wrapped into days
/// and `mm:ss` accepts any number of minutes.
pub fn timemark_to_seconds(timemark: &str) -> Result<f64, FfmpegError> {
    let invalid = || FfmpegError::InvalidTimemark {
        value: timemark.to_string(),
    };

    let trimmed = timemark.trim();
    let trimmed = trimmed.strip_suffix('s').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    let mut seconds = 0.0;
    for (index, part) in parts.iter().enumerate() {
        let is_last = index + 1 == parts.len();
        let valid = !part.is_empty()
            && part.chars().all(|ch| ch.is_ascii_digit() || (is_last && ch == '.'));
        if !valid {
            return Err(invalid());
        }
        let value: f64 = part.parse().map_err(|_| invalid())?;
        if index > 0 && value >= 60.0 {
            return Err(invalid());
        }
        seconds = seconds * 60.0 + value;
    }

    Ok(seconds)
}

/// Renders seconds as zero-padded `hh:mm:ss.mmm`.
pub fn seconds_to_timemark(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}
