//! Per-feature setters. Single-valued options replace their previous value.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::args::ArgumentList;
use crate::core::command::FfmpegCommand;
use crate::core::config::RunConfig;
use crate::core::error::FfmpegError;
use crate::core::filter::{bracket_label, FilterGraph, FilterSpec};
use crate::core::size::{parse_aspect, SizeSpec};
use crate::core::timemark::timemark_to_seconds;

/// One string is split when it holds exactly a flag and a value; several
/// strings are taken as-is.
fn add_options(list: &mut ArgumentList, options: &[&str]) {
    match options {
        [single] => {
            list.add_option(single);
        }
        many => {
            for option in many {
                list.add([*option]);
            }
        }
    }
}

fn replace(list: &mut ArgumentList, flag: &str, value: impl Into<String>) {
    list.remove(flag, 1);
    list.add_pair(flag, value);
}

fn kilo(bitrate: &str) -> String {
    let trimmed = bitrate.trim();
    if trimmed.ends_with('k') {
        trimmed.to_string()
    } else {
        format!("{trimmed}k")
    }
}

fn checked_timemark(value: &str) -> Result<String, FfmpegError> {
    timemark_to_seconds(value)
        .map(|_| value.trim().to_string())
        .map_err(|_| FfmpegError::invalid(format!("invalid timemark: {value}")))
}

impl FfmpegCommand {
    pub fn global_options(&mut self, options: &[&str]) -> &mut Self {
        add_options(&mut self.global, options);
        self
    }

    pub fn ffmpeg_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.config_mut().ffmpeg_path = Some(path.into());
        self
    }

    pub fn niceness(&mut self, niceness: i32) -> Result<&mut Self, FfmpegError> {
        self.config_mut().niceness = RunConfig::validate_niceness(niceness)?;
        Ok(self)
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config_mut().timeout = Some(timeout);
        self
    }

    pub fn stdout_lines(&mut self, lines: usize) -> &mut Self {
        self.config_mut().stdout_lines = lines;
        self
    }

    // Input

    pub fn input_options(&mut self, options: &[&str]) -> Result<&mut Self, FfmpegError> {
        add_options(&mut self.current_input_mut()?.options, options);
        Ok(self)
    }

    pub fn input_format(&mut self, format: &str) -> Result<&mut Self, FfmpegError> {
        replace(&mut self.current_input_mut()?.options, "-f", format);
        Ok(self)
    }

    pub fn input_fps(&mut self, fps: f64) -> Result<&mut Self, FfmpegError> {
        if fps <= 0.0 || !fps.is_finite() {
            return Err(FfmpegError::invalid(format!("invalid input fps: {fps}")));
        }
        replace(&mut self.current_input_mut()?.options, "-r", fps.to_string());
        Ok(self)
    }

    /// Reads the input at its native frame rate (`-re`).
    pub fn native(&mut self) -> Result<&mut Self, FfmpegError> {
        let options = &mut self.current_input_mut()?.options;
        if !options.contains("-re") {
            options.add_flag("-re");
        }
        Ok(self)
    }

    pub fn seek_input(&mut self, timemark: &str) -> Result<&mut Self, FfmpegError> {
        let timemark = checked_timemark(timemark)?;
        replace(&mut self.current_input_mut()?.options, "-ss", timemark);
        Ok(self)
    }

    /// Loops a still input, optionally for `duration`.
    pub fn loop_input(&mut self, duration: Option<&str>) -> Result<&mut Self, FfmpegError> {
        let duration = duration.map(checked_timemark).transpose()?;
        let options = &mut self.current_input_mut()?.options;
        replace(options, "-loop", "1");
        if let Some(duration) = duration {
            replace(options, "-t", duration);
        }
        Ok(self)
    }

    // Audio

    pub fn no_audio(&mut self) -> &mut Self {
        let output = self.current_output_mut();
        output.audio.clear();
        output.audio_filters.clear();
        output.audio.add_flag("-an");
        self
    }

    pub fn audio_codec(&mut self, codec: &str) -> &mut Self {
        replace(&mut self.current_output_mut().audio, "-acodec", codec);
        self
    }

    /// Bitrate in kbps; a `k` suffix is added when missing.
    pub fn audio_bitrate(&mut self, bitrate: &str) -> &mut Self {
        replace(&mut self.current_output_mut().audio, "-b:a", kilo(bitrate));
        self
    }

    pub fn audio_channels(&mut self, channels: u32) -> &mut Self {
        replace(&mut self.current_output_mut().audio, "-ac", channels.to_string());
        self
    }

    pub fn audio_frequency(&mut self, hz: u32) -> &mut Self {
        replace(&mut self.current_output_mut().audio, "-ar", hz.to_string());
        self
    }

    pub fn audio_quality(&mut self, quality: u32) -> &mut Self {
        replace(&mut self.current_output_mut().audio, "-aq", quality.to_string());
        self
    }

    pub fn audio_filters<I, F>(&mut self, filters: I) -> &mut Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FilterSpec>,
    {
        self.current_output_mut()
            .audio_filters
            .extend(filters.into_iter().map(Into::into));
        self
    }

    // Video

    pub fn no_video(&mut self) -> &mut Self {
        let output = self.current_output_mut();
        output.video.clear();
        output.video_filters.clear();
        output.video.add_flag("-vn");
        self
    }

    pub fn video_codec(&mut self, codec: &str) -> &mut Self {
        replace(&mut self.current_output_mut().video, "-vcodec", codec);
        self
    }

    /// With `constant`, min/max rate and buffer size are pinned to the
    /// bitrate as well.
    pub fn video_bitrate(&mut self, bitrate: &str, constant: bool) -> &mut Self {
        let bitrate = kilo(bitrate);
        let video = &mut self.current_output_mut().video;
        for flag in ["-b:v", "-maxrate", "-minrate", "-bufsize"] {
            video.remove(flag, 1);
        }
        video.add_pair("-b:v", bitrate.clone());
        if constant {
            video
                .add_pair("-maxrate", bitrate.clone())
                .add_pair("-minrate", bitrate.clone())
                .add_pair("-bufsize", bitrate);
        }
        self
    }

    pub fn fps(&mut self, fps: f64) -> Result<&mut Self, FfmpegError> {
        if fps <= 0.0 || !fps.is_finite() {
            return Err(FfmpegError::invalid(format!("invalid fps: {fps}")));
        }
        replace(&mut self.current_output_mut().video, "-r", fps.to_string());
        Ok(self)
    }

    pub fn frames(&mut self, frames: u64) -> &mut Self {
        replace(&mut self.current_output_mut().video, "-vframes", frames.to_string());
        self
    }

    pub fn video_filters<I, F>(&mut self, filters: I) -> &mut Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FilterSpec>,
    {
        self.current_output_mut()
            .video_filters
            .extend(filters.into_iter().map(Into::into));
        self
    }

    // Size

    pub fn size(&mut self, size: &str) -> Result<&mut Self, FfmpegError> {
        self.current_output_mut().size.size = Some(SizeSpec::parse(size)?);
        Ok(self)
    }

    pub fn aspect(&mut self, aspect: &str) -> Result<&mut Self, FfmpegError> {
        self.current_output_mut().size.aspect = Some(parse_aspect(aspect)?);
        Ok(self)
    }

    /// Pads to the requested size with `color`; `None` turns padding off.
    pub fn autopad(&mut self, color: Option<&str>) -> &mut Self {
        self.current_output_mut().size.pad = color.map(str::to_string);
        self
    }

    // Output

    pub fn output_options(&mut self, options: &[&str]) -> &mut Self {
        add_options(&mut self.current_output_mut().options, options);
        self
    }

    pub fn format(&mut self, format: &str) -> &mut Self {
        replace(&mut self.current_output_mut().options, "-f", format);
        self
    }

    pub fn duration(&mut self, duration: &str) -> Result<&mut Self, FfmpegError> {
        let duration = checked_timemark(duration)?;
        replace(&mut self.current_output_mut().options, "-t", duration);
        Ok(self)
    }

    pub fn seek(&mut self, timemark: &str) -> Result<&mut Self, FfmpegError> {
        let timemark = checked_timemark(timemark)?;
        replace(&mut self.current_output_mut().options, "-ss", timemark);
        Ok(self)
    }

    pub fn map(&mut self, stream: &str) -> &mut Self {
        self.current_output_mut().maps.add_pair("-map", stream);
        self
    }

    pub fn flvmeta(&mut self) -> &mut Self {
        self.current_output_mut().flags.flvmeta = true;
        self
    }

    // Complex filtergraph

    /// Each spec becomes its own filtergraph block. Replaces any previous
    /// complex filtergraph.
    pub fn complex_filter<I, F>(&mut self, filters: I, map: &[&str]) -> &mut Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FilterSpec>,
    {
        let graph: FilterGraph = filters.into_iter().collect();
        self.complex_filter_graph(graph, map)
    }

    pub fn complex_filter_graph(&mut self, graph: FilterGraph, map: &[&str]) -> &mut Self {
        self.complex_filters.clear();
        if graph.is_empty() {
            return self;
        }
        self.complex_filters
            .add_pair("-filter_complex", graph.render());
        for label in map {
            self.complex_filters.add_pair("-map", bracket_label(label));
        }
        self
    }
}
