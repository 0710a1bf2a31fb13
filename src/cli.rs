use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use ffdrive::core::capabilities::{
    available_codecs, available_encoders, available_filters, available_formats,
};
use ffdrive::core::formatter::{format_codec_line, format_progress_line, format_summary_line};
use ffdrive::{FfmpegCommand, FfmpegError, RunConfig, RunHandlers};

#[derive(Debug, Parser)]
#[command(name = "ffdrive", version, about = "Build and run ffmpeg commands")]
pub struct Cli {
    /// ffmpeg binary to use instead of FFMPEG_PATH / PATH
    #[arg(long = "ffmpeg", global = true, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,
    /// Diagnostic lines kept for error reports (0 keeps all)
    #[arg(long = "lines", global = true, default_value_t = ffdrive::core::config::DEFAULT_STDOUT_LINES)]
    pub lines: usize,
    /// -v for debug logs, -vv for trace
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Encode(EncodeArgs),
    Inspect(InspectArgs),
    Capabilities(CapabilitiesArgs),
}

#[derive(Debug, Parser)]
pub struct EncodeArgs {
    #[arg(short = 'i', long = "input", required = true)]
    pub inputs: Vec<String>,
    #[arg(short = 'o', long = "output")]
    pub output: String,
    #[arg(long = "vcodec")]
    pub video_codec: Option<String>,
    #[arg(long = "acodec")]
    pub audio_codec: Option<String>,
    #[arg(long = "audio-bitrate")]
    pub audio_bitrate: Option<String>,
    #[arg(long = "video-bitrate")]
    pub video_bitrate: Option<String>,
    /// WxH, Wx?, ?xH or N%
    #[arg(long = "size")]
    pub size: Option<String>,
    #[arg(long = "format")]
    pub format: Option<String>,
    #[arg(long = "seek")]
    pub seek: Option<String>,
    #[arg(long = "duration")]
    pub duration: Option<String>,
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,
    #[arg(long = "niceness", allow_hyphen_values = true)]
    pub niceness: Option<i32>,
    /// Extra output options, split like a shell would
    #[arg(long = "options")]
    pub options: Option<String>,
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct InspectArgs {
    #[arg(short = 'i', long = "input")]
    pub input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Capability {
    Formats,
    Codecs,
    Encoders,
    Filters,
}

#[derive(Debug, Parser)]
pub struct CapabilitiesArgs {
    #[arg(value_enum)]
    pub kind: Capability,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            ffmpeg_path: self.ffmpeg.clone(),
            stdout_lines: self.lines,
            ..RunConfig::default()
        }
    }
}

pub fn encode_args_to_command(
    args: &EncodeArgs,
    config: RunConfig,
) -> Result<FfmpegCommand, FfmpegError> {
    let mut command = FfmpegCommand::with_config(config);
    for input in &args.inputs {
        command.input(input.as_str());
    }
    if let Some(seek) = &args.seek {
        command.seek_input(seek)?;
    }
    if let Some(codec) = &args.audio_codec {
        command.audio_codec(codec);
    }
    if let Some(bitrate) = &args.audio_bitrate {
        command.audio_bitrate(bitrate);
    }
    if let Some(codec) = &args.video_codec {
        command.video_codec(codec);
    }
    if let Some(bitrate) = &args.video_bitrate {
        command.video_bitrate(bitrate, false);
    }
    if let Some(size) = &args.size {
        command.size(size)?;
    }
    if let Some(format) = &args.format {
        command.format(format);
    }
    if let Some(duration) = &args.duration {
        command.duration(duration)?;
    }
    if let Some(options) = &args.options {
        let words = shell_words::split(options)
            .map_err(|err| FfmpegError::invalid(format!("--options: {err}")))?;
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        command.output_options(&words);
    }
    if !args.extra_args.is_empty() {
        let words: Vec<&str> = args.extra_args.iter().map(String::as_str).collect();
        command.output_options(&words);
    }
    if let Some(timeout) = args.timeout {
        command.timeout(Duration::from_secs(timeout));
    }
    if let Some(niceness) = args.niceness {
        command.niceness(niceness)?;
    }
    command.output(args.output.as_str());
    Ok(command)
}

/// Decodes the input into the null muxer, which reports codec data and
/// progress without writing anything.
pub fn inspect_args_to_command(args: &InspectArgs, config: RunConfig) -> FfmpegCommand {
    let mut command = FfmpegCommand::with_config(config);
    command.input(args.input.as_str()).format("null").output("-");
    command
}

pub fn execute(cli: Cli) -> Result<(), FfmpegError> {
    let config = cli.run_config();
    let command = match &cli.command {
        Commands::Encode(args) => encode_args_to_command(args, config)?,
        Commands::Inspect(args) => inspect_args_to_command(args, config),
        Commands::Capabilities(args) => return print_capabilities(args.kind, &config),
    };

    let handlers = RunHandlers::new()
        .on_start(|line| println!("Command: {line}"))
        .on_codec_data(|data| println!("{}", format_codec_line(data)))
        .on_progress(|update| {
            if let Some(line) = format_progress_line(update) {
                println!("{line}");
            }
        });

    let report = command.run(handlers)?;
    println!("{}", format_summary_line(&report));
    Ok(())
}

fn print_capabilities(kind: Capability, config: &RunConfig) -> Result<(), FfmpegError> {
    let rows: Vec<(String, String)> = match kind {
        Capability::Formats => available_formats(config)?
            .into_iter()
            .map(|(name, info)| {
                let flags = format!(
                    "{}{}",
                    if info.can_demux { "D" } else { "." },
                    if info.can_mux { "E" } else { "." }
                );
                (name, format!("{flags} {}", info.description))
            })
            .collect(),
        Capability::Codecs => available_codecs(config)?
            .into_iter()
            .map(|(name, info)| (name, format!("{:?} {}", info.kind, info.description)))
            .collect(),
        Capability::Encoders => available_encoders(config)?
            .into_iter()
            .map(|(name, info)| (name, format!("{:?} {}", info.kind, info.description)))
            .collect(),
        Capability::Filters => available_filters(config)?
            .into_iter()
            .map(|(name, info)| (name, info.description))
            .collect(),
    };

    for (name, description) in rows {
        println!("{name:<24} {description}");
    }
    Ok(())
}
