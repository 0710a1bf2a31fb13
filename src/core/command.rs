use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use crate::core::args::ArgumentList;
use crate::core::config::RunConfig;
use crate::core::error::FfmpegError;
use crate::core::filter::{render_chain, FilterSpec};
use crate::core::size::SizeSettings;

/// A stream handed to ffmpeg. Clones share the same underlying stream, which
/// is consumed by the first run that uses it.
pub struct StreamHandle<T>(Arc<Mutex<Option<T>>>);

impl<T> StreamHandle<T> {
    pub fn new(stream: T) -> Self {
        Self(Arc::new(Mutex::new(Some(stream))))
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Puts a stream back so a later run can use it again.
    pub(crate) fn restore(&self, stream: T) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(stream);
        }
    }
}

impl<T> Clone for StreamHandle<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for StreamHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let available = self.0.lock().map(|slot| slot.is_some()).unwrap_or(false);
        f.debug_struct("StreamHandle")
            .field("available", &available)
            .finish()
    }
}

pub type InputStream = StreamHandle<Box<dyn Read + Send>>;
pub type OutputStream = StreamHandle<Box<dyn Write + Send>>;

#[derive(Debug, Clone)]
pub enum InputSource {
    Path(String),
    /// Written to the child's stdin.
    Stream(InputStream),
}

impl InputSource {
    fn origin(&self) -> &str {
        match self {
            InputSource::Path(path) => path,
            InputSource::Stream(_) => "pipe:0",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Input {
    pub source: InputSource,
    pub options: ArgumentList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeOptions {
    /// Drop (close) the writer once ffmpeg's stdout ends.
    pub close_on_end: bool,
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self { close_on_end: true }
    }
}

#[derive(Debug, Clone)]
pub enum OutputTarget {
    Path(String),
    /// Receives the child's stdout.
    Stream(OutputStream, PipeOptions),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFlags {
    /// Rewrite FLV metadata after a successful run.
    pub flvmeta: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Output {
    pub target: Option<OutputTarget>,
    pub audio: ArgumentList,
    pub audio_filters: Vec<FilterSpec>,
    pub video: ArgumentList,
    pub video_filters: Vec<FilterSpec>,
    pub size: SizeSettings,
    pub options: ArgumentList,
    pub maps: ArgumentList,
    pub flags: OutputFlags,
}

impl Output {
    pub fn is_file(&self) -> bool {
        matches!(self.target, Some(OutputTarget::Path(_)))
    }

    pub fn path(&self) -> Option<&str> {
        match &self.target {
            Some(OutputTarget::Path(path)) => Some(path),
            _ => None,
        }
    }

    fn extend_into(&self, argv: &mut Vec<String>) {
        self.audio.extend_into(argv);
        if !self.audio_filters.is_empty() {
            argv.push("-filter:a".to_string());
            argv.push(render_chain(&self.audio_filters));
        }

        self.video.extend_into(argv);
        let mut video_filters = self.video_filters.clone();
        video_filters.extend(self.size.filters());
        if !video_filters.is_empty() {
            argv.push("-filter:v".to_string());
            argv.push(render_chain(&video_filters));
        }

        self.options.extend_into(argv);
        self.maps.extend_into(argv);

        match &self.target {
            Some(OutputTarget::Path(path)) => argv.push(path.clone()),
            Some(OutputTarget::Stream(..)) => argv.push("pipe:1".to_string()),
            None => {}
        }
    }
}

/// A transcoding task: inputs, outputs, global options and a complex
/// filtergraph, linearised into ffmpeg's positional argument grammar.
#[derive(Debug)]
pub struct FfmpegCommand {
    pub(crate) inputs: Vec<Input>,
    pub(crate) current_input: Option<usize>,
    pub(crate) outputs: Vec<Output>,
    pub(crate) current_output: usize,
    pub(crate) global: ArgumentList,
    pub(crate) complex_filters: ArgumentList,
    pub(crate) config: Arc<RunConfig>,
    pub(crate) cancel: Arc<AtomicBool>,
}

impl Default for FfmpegCommand {
    fn default() -> Self {
        Self::with_config(RunConfig::default())
    }
}

impl Clone for FfmpegCommand {
    /// Deep-copies inputs, outputs and argument lists. The config stays shared
    /// until either side changes it; the clone gets its own cancel flag.
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
            current_input: self.current_input,
            outputs: self.outputs.clone(),
            current_output: self.current_output,
            global: self.global.clone(),
            complex_filters: self.complex_filters.clone(),
            config: Arc::clone(&self.config),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FfmpegCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RunConfig) -> Self {
        Self {
            inputs: Vec::new(),
            current_input: None,
            outputs: vec![Output::default()],
            current_output: 0,
            global: ArgumentList::new(),
            complex_filters: ArgumentList::new(),
            config: Arc::new(config),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Clones of a command share one `RunConfig` until either side calls
    /// this, which first copies the config so the change stays local.
    pub fn config_mut(&mut self) -> &mut RunConfig {
        Arc::make_mut(&mut self.config)
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn global(&self) -> &ArgumentList {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut ArgumentList {
        &mut self.global
    }

    pub fn add_input(&mut self, source: InputSource) -> Result<&mut Self, FfmpegError> {
        if matches!(source, InputSource::Stream(_)) && self.has_input_stream() {
            return Err(FfmpegError::invalid("only one input stream is supported"));
        }
        self.inputs.push(Input {
            source,
            options: ArgumentList::new(),
        });
        self.current_input = Some(self.inputs.len() - 1);
        Ok(self)
    }

    /// Adds a file or URL input and makes it current.
    pub fn input(&mut self, path: impl Into<String>) -> &mut Self {
        self.inputs.push(Input {
            source: InputSource::Path(path.into()),
            options: ArgumentList::new(),
        });
        self.current_input = Some(self.inputs.len() - 1);
        self
    }

    pub fn input_stream<R: Read + Send + 'static>(
        &mut self,
        reader: R,
    ) -> Result<&mut Self, FfmpegError> {
        self.add_input(InputSource::Stream(StreamHandle::new(Box::new(reader))))
    }

    pub fn current_input_mut(&mut self) -> Result<&mut Input, FfmpegError> {
        let index = self
            .current_input
            .ok_or_else(|| FfmpegError::invalid("no input specified"))?;
        Ok(&mut self.inputs[index])
    }

    /// Sets the target of the current output when it has none, otherwise
    /// appends a new output. The affected output becomes current.
    pub fn add_output(&mut self, target: OutputTarget) -> Result<&mut Self, FfmpegError> {
        if matches!(target, OutputTarget::Stream(..)) && self.has_output_stream() {
            return Err(FfmpegError::invalid("only one output stream is supported"));
        }
        self.set_target(target);
        Ok(self)
    }

    pub fn output(&mut self, path: impl Into<String>) -> &mut Self {
        self.set_target(OutputTarget::Path(path.into()));
        self
    }

    fn set_target(&mut self, target: OutputTarget) {
        if self.outputs[self.current_output].target.is_none() {
            self.outputs[self.current_output].target = Some(target);
        } else {
            self.outputs.push(Output {
                target: Some(target),
                ..Output::default()
            });
            self.current_output = self.outputs.len() - 1;
        }
    }

    pub fn output_stream<W: Write + Send + 'static>(
        &mut self,
        writer: W,
        options: PipeOptions,
    ) -> Result<&mut Self, FfmpegError> {
        self.add_output(OutputTarget::Stream(
            StreamHandle::new(Box::new(writer)),
            options,
        ))
    }

    pub fn current_output_mut(&mut self) -> &mut Output {
        &mut self.outputs[self.current_output]
    }

    fn has_input_stream(&self) -> bool {
        self.inputs
            .iter()
            .any(|input| matches!(input.source, InputSource::Stream(_)))
    }

    fn has_output_stream(&self) -> bool {
        self.outputs
            .iter()
            .any(|output| matches!(output.target, Some(OutputTarget::Stream(..))))
    }

    pub(crate) fn input_stream_handle(&self) -> Option<&InputStream> {
        self.inputs.iter().find_map(|input| match &input.source {
            InputSource::Stream(stream) => Some(stream),
            InputSource::Path(_) => None,
        })
    }

    pub(crate) fn output_stream_handle(&self) -> Option<(&OutputStream, PipeOptions)> {
        self.outputs.iter().find_map(|output| match &output.target {
            Some(OutputTarget::Stream(stream, options)) => Some((stream, *options)),
            _ => None,
        })
    }

    /// Final argv, in ffmpeg's positional order: global options, each input's
    /// options followed by `-i origin`, the complex filtergraph, then per
    /// output audio, video, video filters, output options, maps and target.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        self.global.extend_into(&mut args);
        if self.outputs.iter().any(Output::is_file) && !self.global.contains("-n") {
            args.push("-y".to_string());
        }

        for input in &self.inputs {
            input.options.extend_into(&mut args);
            args.push("-i".to_string());
            args.push(input.source.origin().to_string());
        }

        self.complex_filters.extend_into(&mut args);

        for output in &self.outputs {
            output.extend_into(&mut args);
        }

        args
    }

    /// argv rendered as a single shell-quoted line.
    pub fn command_line(&self) -> String {
        let mut words = vec!["ffmpeg".to_string()];
        words.extend(self.to_args());
        shell_words::join(words)
    }
}
