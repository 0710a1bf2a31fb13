//! Build ffmpeg command lines, run them, and follow their progress.
//!
//! ```no_run
//! use ffdrive::{FfmpegCommand, RunHandlers};
//!
//! let mut command = FfmpegCommand::new();
//! command
//!     .input("in.mp4")
//!     .audio_codec("aac")
//!     .audio_bitrate("128")
//!     .output("out.mp4");
//! let report = command.run(RunHandlers::new().on_progress(|p| println!("{:?}", p.percent)))?;
//! println!("{}", report.stderr);
//! # Ok::<(), ffdrive::FfmpegError>(())
//! ```

pub mod core;

pub use crate::core::args::ArgumentList;
pub use crate::core::command::{Input, InputSource, Output, OutputTarget, PipeOptions};
pub use crate::core::filter::{FilterGraph, FilterOptions, FilterSpec};
pub use crate::core::metadata::CodecData;
pub use crate::core::progress::ProgressEvent;
pub use crate::core::ring::LineRing;
pub use crate::core::timemark::{seconds_to_timemark, timemark_to_seconds};
pub use crate::core::{
    run, run_with_events, CancelHandle, FfmpegCommand, FfmpegError, FfmpegEvent, RunConfig,
    RunHandlers, RunReport,
};
