pub mod args;
pub mod capabilities;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod formatter;
pub mod job;
pub mod lines;
pub mod locate;
pub mod metadata;
pub mod options;
pub mod parser;
pub mod progress;
pub mod ring;
pub mod runner;
pub mod size;
pub mod timemark;

pub use command::FfmpegCommand;
pub use config::RunConfig;
pub use error::FfmpegError;
pub use event::FfmpegEvent;
pub use runner::{run, run_with_events, CancelHandle, RunHandlers, RunReport};
