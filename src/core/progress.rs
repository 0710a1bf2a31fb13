use crate::core::timemark::timemark_to_seconds;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEvent {
    pub frames: u64,
    pub current_fps: f64,
    /// Processed output size in kB.
    pub target_size_kb: u64,
    pub timemark: String,
    /// Output time in seconds.
    pub time: f64,
    pub current_kbps: f64,
    pub speed: f64,
    /// Set when the input duration is known.
    pub percent: Option<f64>,
}

/// Splits a progress banner into its `key=value` pairs. Returns `None` when
/// any token is not a pair, since such a line is not a progress line.
pub fn parse_progress_fields(line: &str) -> Option<Vec<(String, String)>> {
    let collapsed = collapse_spaces_after_equals(line.trim());
    if !collapsed.contains("time=") && !collapsed.contains("frame=") {
        return None;
    }

    let mut fields = Vec::new();
    for token in collapsed.split_whitespace() {
        let (key, value) = token.split_once('=')?;
        if key.is_empty() {
            return None;
        }
        fields.push((key.to_string(), value.to_string()));
    }

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

fn collapse_spaces_after_equals(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut after_equals = false;
    for ch in line.chars() {
        if after_equals && ch.is_whitespace() {
            continue;
        }
        after_equals = ch == '=';
        out.push(ch);
    }
    out
}

/// Running progress state. Keys absent from a line leave the previous value
/// in place.
#[derive(Debug, Default)]
pub struct ProgressAccumulator {
    current: ProgressEvent,
}

impl ProgressAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, line: &str, duration: Option<f64>) -> Option<ProgressEvent> {
        let fields = parse_progress_fields(line)?;
        for (key, value) in &fields {
            self.set_kv(key, value);
        }
        self.current.percent = duration
            .filter(|total| *total > 0.0)
            .map(|total| self.current.time * 100.0 / total);
        Some(self.current.clone())
    }

    fn set_kv(&mut self, key: &str, value: &str) {
        match key {
            "frame" => {
                if let Ok(parsed) = value.parse::<u64>() {
                    self.current.frames = parsed;
                }
            }
            "fps" => {
                if let Ok(parsed) = value.parse::<f64>() {
                    self.current.current_fps = parsed;
                }
            }
            "size" | "Lsize" => {
                if let Some(size) = leading_number(value) {
                    self.current.target_size_kb = size as u64;
                }
            }
            "time" => match timemark_to_seconds(value) {
                Ok(seconds) => {
                    self.current.time = seconds;
                    self.current.timemark = value.to_string();
                }
                Err(err) => log::debug!("ignoring progress time: {err}"),
            },
            "bitrate" => {
                if let Some(kbps) = leading_number(value) {
                    self.current.current_kbps = kbps;
                }
            }
            "speed" => {
                if let Ok(parsed) = value.trim_end_matches('x').parse::<f64>() {
                    self.current.speed = parsed;
                }
            }
            _ => {}
        }
    }
}

/// `1024kB` -> 1024.0, `2000.5kbits/s` -> 2000.5, `N/A` -> None.
fn leading_number(value: &str) -> Option<f64> {
    let end = value
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_digit() || *ch == '.'))
        .map(|(pos, _)| pos)
        .unwrap_or(value.len());
    if end == 0 {
        return None;
    }
    value[..end].parse().ok()
}
