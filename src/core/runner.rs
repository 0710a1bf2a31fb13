use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::core::command::FfmpegCommand;
use crate::core::config::RunConfig;
use crate::core::error::FfmpegError;
use crate::core::event::FfmpegEvent;
use crate::core::job::{Job, RunState};
use crate::core::lines::{spawn_line_reader, StreamKind};
use crate::core::locate::{locate_binary, locate_ffmpeg};
use crate::core::metadata::CodecData;
use crate::core::parser::{DiagnosticEvent, DiagnosticsParser};
use crate::core::progress::ProgressEvent;
use crate::core::ring::LineRing;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

type LineCallback<'a> = Box<dyn FnMut(&str) + 'a>;
type OutputCallback<'a> = Box<dyn FnMut(&str, &str) + 'a>;

/// Callbacks of one run. Every callback is invoked on the thread that called
/// [`run`], one diagnostic line at a time.
#[derive(Default)]
pub struct RunHandlers<'a> {
    on_start: Option<LineCallback<'a>>,
    on_codec_data: Option<Box<dyn FnMut(&CodecData) + 'a>>,
    on_progress: Option<Box<dyn FnMut(&ProgressEvent) + 'a>>,
    on_stderr: Option<LineCallback<'a>>,
    on_error: Option<Box<dyn FnMut(&FfmpegError, &str, &str) + 'a>>,
    on_end: Option<OutputCallback<'a>>,
    on_cancelled: Option<Box<dyn FnMut() + 'a>>,
}

impl<'a> RunHandlers<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives the shell-quoted command line once the process is running.
    pub fn on_start(mut self, callback: impl FnMut(&str) + 'a) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    pub fn on_codec_data(mut self, callback: impl FnMut(&CodecData) + 'a) -> Self {
        self.on_codec_data = Some(Box::new(callback));
        self
    }

    pub fn on_progress(mut self, callback: impl FnMut(&ProgressEvent) + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn on_stderr(mut self, callback: impl FnMut(&str) + 'a) -> Self {
        self.on_stderr = Some(Box::new(callback));
        self
    }

    /// Terminal failure with the retained stdout and stderr lines.
    pub fn on_error(mut self, callback: impl FnMut(&FfmpegError, &str, &str) + 'a) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Terminal success with the retained stdout and stderr lines.
    pub fn on_end(mut self, callback: impl FnMut(&str, &str) + 'a) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }

    pub fn on_cancelled(mut self, callback: impl FnMut() + 'a) -> Self {
        self.on_cancelled = Some(Box::new(callback));
        self
    }
}

/// Requests termination of a running command from any thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn describe(&self) -> String {
        match (self.code, self.signal) {
            (Some(code), _) => format!("ffmpeg exited with code {code}"),
            (None, Some(signal)) => format!("ffmpeg was killed with signal {signal}"),
            (None, None) => "ffmpeg exited abnormally".to_string(),
        }
    }
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Exited(ExitInfo),
    TimedOut(Duration),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub codec_data: Option<CodecData>,
    pub last_progress: Option<ProgressEvent>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Turns the child's lines and exit into events. Owns the parser and both
/// rings, and guarantees exactly one terminal notification.
pub struct RunMonitor<'a> {
    handlers: RunHandlers<'a>,
    parser: DiagnosticsParser,
    stdout_ring: LineRing,
    stderr_ring: LineRing,
    job: Job,
    capture_stdout: bool,
    merge_stdout: bool,
    codec_data: Option<CodecData>,
    last_progress: Option<ProgressEvent>,
}

impl<'a> RunMonitor<'a> {
    pub fn new(config: &RunConfig, handlers: RunHandlers<'a>) -> Self {
        Self {
            handlers,
            parser: DiagnosticsParser::new(),
            stdout_ring: LineRing::new(config.stdout_lines),
            stderr_ring: LineRing::new(config.stdout_lines),
            job: Job::new(),
            capture_stdout: config.capture_stdout,
            merge_stdout: config.merge_stdout,
            codec_data: None,
            last_progress: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.job.status
    }

    pub fn spawning(&mut self) {
        self.job.advance(RunState::Spawning);
    }

    pub fn started(&mut self, command_line: &str) {
        if self.job.advance(RunState::Running) {
            if let Some(callback) = self.handlers.on_start.as_mut() {
                callback(command_line);
            }
        }
    }

    pub fn on_line(&mut self, stream: StreamKind, line: &str) {
        if self.job.status.is_terminal() {
            return;
        }

        match stream {
            StreamKind::Stdout => {
                if self.capture_stdout {
                    self.stdout_ring.append(line);
                }
                if self.merge_stdout {
                    self.parse(line);
                }
            }
            StreamKind::Stderr => {
                self.stderr_ring.append(line);
                if let Some(callback) = self.handlers.on_stderr.as_mut() {
                    callback(line);
                }
                self.parse(line);
            }
        }
    }

    fn parse(&mut self, line: &str) {
        let mut events = Vec::new();
        self.parser.parse_line(line, |event| events.push(event));
        for event in events {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::CodecData(data) => {
                if self.codec_data.is_some() {
                    return;
                }
                if let Some(callback) = self.handlers.on_codec_data.as_mut() {
                    callback(&data);
                }
                self.codec_data = Some(data);
            }
            DiagnosticEvent::Progress(progress) => {
                if let Some(callback) = self.handlers.on_progress.as_mut() {
                    callback(&progress);
                }
                self.last_progress = Some(progress);
            }
        }
    }

    /// Reports a failure that happened before or instead of a process exit.
    pub fn fail(mut self, err: FfmpegError) -> FfmpegError {
        if self.job.advance(RunState::Failed) {
            let stdout = self.stdout_ring.get();
            let stderr = self.stderr_ring.get();
            if let Some(callback) = self.handlers.on_error.as_mut() {
                callback(&err, &stdout, &stderr);
            }
        }
        err
    }

    pub fn finish(mut self, exit: RunExit) -> Result<RunReport, FfmpegError> {
        if let Some(data) = self.parser.finish() {
            if !self.job.status.is_terminal() && !matches!(exit, RunExit::Cancelled) {
                self.dispatch(DiagnosticEvent::CodecData(data));
            }
        }

        let stdout = self.stdout_ring.get();
        let stderr = self.stderr_ring.get();
        self.stdout_ring.close();
        self.stderr_ring.close();

        match exit {
            RunExit::Exited(info) if info.success() => {
                self.job.advance(RunState::Succeeded);
                if let Some(callback) = self.handlers.on_end.as_mut() {
                    callback(&stdout, &stderr);
                }
                Ok(RunReport {
                    codec_data: self.codec_data,
                    last_progress: self.last_progress,
                    stdout,
                    stderr,
                    elapsed: self.job.elapsed(),
                })
            }
            RunExit::Exited(info) => {
                let err = FfmpegError::ProcessFailed {
                    exit_code: info.code,
                    signal: info.signal,
                    message: failure_message(&info, self.parser.error_banner(), &stderr),
                    stdout: stdout.clone(),
                    stderr: stderr.clone(),
                };
                self.job.advance(RunState::Failed);
                if let Some(callback) = self.handlers.on_error.as_mut() {
                    callback(&err, &stdout, &stderr);
                }
                Err(err)
            }
            RunExit::TimedOut(elapsed) => {
                let err = FfmpegError::Timeout { elapsed };
                self.job.advance(RunState::TimedOut);
                if let Some(callback) = self.handlers.on_error.as_mut() {
                    callback(&err, &stdout, &stderr);
                }
                Err(err)
            }
            RunExit::Cancelled => {
                if self.job.advance(RunState::Cancelled) {
                    if let Some(callback) = self.handlers.on_cancelled.as_mut() {
                        callback();
                    }
                }
                Err(FfmpegError::Cancelled)
            }
        }
    }
}

fn failure_message(info: &ExitInfo, banner: Option<String>, stderr: &str) -> String {
    let mut message = info.describe();
    if let Some(banner) = banner {
        message.push_str(": ");
        message.push_str(&banner);
    }
    if !stderr.is_empty() {
        message.push_str("\n--- last ffmpeg output ---\n");
        message.push_str(stderr);
    }
    message
}

impl FfmpegCommand {
    /// Handle for cancelling this command's run from another thread. Clones
    /// of the command get their own flag. A cancel is cleared once the run it
    /// stopped has reached a terminal state, so the command can be run again.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancel),
        }
    }

    pub fn run(&self, handlers: RunHandlers<'_>) -> Result<RunReport, FfmpegError> {
        run(self, handlers)
    }
}

/// Spawns ffmpeg for `command` and blocks until it reaches a terminal state.
pub fn run(command: &FfmpegCommand, handlers: RunHandlers<'_>) -> Result<RunReport, FfmpegError> {
    let result = run_once(command, handlers);
    command.cancel_handle().reset();
    result
}

fn run_once(command: &FfmpegCommand, handlers: RunHandlers<'_>) -> Result<RunReport, FfmpegError> {
    let config = command.config();
    let cancel = command.cancel_handle();
    let mut monitor = RunMonitor::new(config, handlers);

    if command.inputs().is_empty() {
        return Err(monitor.fail(FfmpegError::invalid("no input specified")));
    }
    if command.outputs().iter().all(|output| output.target.is_none()) {
        return Err(monitor.fail(FfmpegError::invalid("no output specified")));
    }
    if cancel.is_cancelled() {
        return monitor.finish(RunExit::Cancelled);
    }

    monitor.spawning();
    let ffmpeg = match locate_ffmpeg(config) {
        Ok(path) => path,
        Err(err) => return Err(monitor.fail(err)),
    };

    let args = command.to_args();
    let mut process = build_process(config, &ffmpeg, &args);
    process
        .stdin(if command.input_stream_handle().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(
            if command.output_stream_handle().is_some()
                || config.capture_stdout
                || config.merge_stdout
            {
                Stdio::piped()
            } else {
                Stdio::null()
            },
        )
        .stderr(Stdio::piped());

    log::debug!("spawning {}", command.command_line());
    let mut child = match process.spawn() {
        Ok(child) => child,
        Err(err) => {
            let program = process.get_program().to_string_lossy().into_owned();
            let err = if err.kind() == io::ErrorKind::NotFound {
                FfmpegError::BinaryNotFound { name: program }
            } else {
                FfmpegError::Spawn {
                    message: format!("{program}: {err}"),
                }
            };
            return Err(monitor.fail(err));
        }
    };
    let started = Instant::now();
    monitor.started(&command.command_line());

    if let (Some(stdin), Some(mut reader)) = (
        child.stdin.take(),
        command.input_stream_handle().and_then(|handle| handle.take()),
    ) {
        thread::spawn(move || {
            let mut stdin = stdin;
            if let Err(err) = io::copy(&mut reader, &mut stdin) {
                log::debug!("stopped feeding ffmpeg stdin: {err}");
            }
        });
    }

    let (line_tx, line_rx) = mpsc::channel::<(StreamKind, String)>();
    let stderr = match child.stderr.take() {
        Some(stderr) => stderr,
        None => {
            kill(&mut child);
            return Err(monitor.fail(FfmpegError::Spawn {
                message: "failed to capture ffmpeg stderr".to_string(),
            }));
        }
    };
    spawn_line_reader(StreamKind::Stderr, stderr, line_tx.clone());

    let mut pipe_handle = None;
    if let Some(stdout) = child.stdout.take() {
        match command.output_stream_handle() {
            Some((handle, options)) => {
                let handle = handle.clone();
                pipe_handle = Some(thread::spawn(move || {
                    let Some(mut writer) = handle.take() else {
                        log::warn!("output stream already consumed by an earlier run");
                        return;
                    };
                    let mut stdout = stdout;
                    if let Err(err) = io::copy(&mut stdout, &mut writer) {
                        log::debug!("stopped copying ffmpeg stdout: {err}");
                    }
                    let _ = writer.flush();
                    if !options.close_on_end {
                        handle.restore(writer);
                    }
                }));
            }
            None => {
                spawn_line_reader(StreamKind::Stdout, stdout, line_tx.clone());
            }
        }
    }
    drop(line_tx);

    let deadline = config.timeout.map(|timeout| started + timeout);
    let exit = match drive(&mut child, &mut monitor, &line_rx, &cancel, started, deadline) {
        Ok(exit) => exit,
        Err(err) => {
            kill(&mut child);
            return Err(monitor.fail(FfmpegError::Spawn {
                message: format!("failed to wait for ffmpeg: {err}"),
            }));
        }
    };

    if let RunExit::Exited(info) = exit {
        if let Some(handle) = pipe_handle {
            let _ = handle.join();
        }
        if info.success() {
            update_flv_metadata(command);
        }
    }

    monitor.finish(exit)
}

/// Delivers lines until both readers are done and the child has exited, or
/// until cancellation or the deadline kills it.
fn drive(
    child: &mut Child,
    monitor: &mut RunMonitor<'_>,
    lines: &Receiver<(StreamKind, String)>,
    cancel: &CancelHandle,
    started: Instant,
    deadline: Option<Instant>,
) -> io::Result<RunExit> {
    let mut readers_done = false;
    loop {
        if cancel.is_cancelled() {
            log::warn!("cancelling ffmpeg");
            kill(child);
            return Ok(RunExit::Cancelled);
        }
        let now = Instant::now();
        if let Some(deadline) = deadline {
            if now >= deadline {
                log::warn!("ffmpeg timed out after {:?}", started.elapsed());
                kill(child);
                return Ok(RunExit::TimedOut(started.elapsed()));
            }
        }
        let wait = deadline
            .map(|deadline| deadline.saturating_duration_since(now).min(POLL_INTERVAL))
            .unwrap_or(POLL_INTERVAL);

        if !readers_done {
            match lines.recv_timeout(wait) {
                Ok((stream, line)) => monitor.on_line(stream, &line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => readers_done = true,
            }
            continue;
        }

        match child.try_wait()? {
            Some(status) => return Ok(RunExit::Exited(ExitInfo::from(status))),
            None => thread::sleep(wait),
        }
    }
}

fn build_process(config: &RunConfig, ffmpeg: &Path, args: &[String]) -> Command {
    let mut process = if cfg!(unix) && config.niceness != 0 {
        let mut nice = Command::new("nice");
        nice.arg("-n").arg(config.niceness.to_string()).arg(ffmpeg);
        nice
    } else {
        Command::new(ffmpeg)
    };
    process.args(args);
    if let Some(dir) = &config.working_dir {
        process.current_dir(dir);
    }
    process.envs(config.env.iter().map(|(key, value)| (key, value)));
    process
}

fn kill(child: &mut Child) {
    if let Err(err) = child.kill() {
        log::debug!("kill failed: {err}");
    }
    let _ = child.wait();
}

/// Rewrites FLV metadata on `.flv` file outputs flagged with `flvmeta`.
/// A missing tool only produces a warning.
fn update_flv_metadata(command: &FfmpegCommand) {
    let paths: Vec<&str> = command
        .outputs()
        .iter()
        .filter(|output| output.flags.flvmeta)
        .filter_map(|output| output.path())
        .filter(|path| path.to_ascii_lowercase().ends_with(".flv"))
        .collect();
    if paths.is_empty() {
        return;
    }

    let tool = locate_binary("flvmeta", Some("FLVMETA_PATH"))
        .map(|path| (path, true))
        .or_else(|_| locate_binary("flvtool2", Some("FLVTOOL2_PATH")).map(|path| (path, false)));
    let (tool, is_flvmeta) = match tool {
        Ok(found) => found,
        Err(err) => {
            log::warn!("skipping FLV metadata update: {err}");
            return;
        }
    };

    for path in paths {
        let mut process = Command::new(&tool);
        if is_flvmeta {
            process.arg(path).arg(path);
        } else {
            process.arg("-U").arg(path);
        }
        match process.stdout(Stdio::null()).stderr(Stdio::null()).status() {
            Ok(status) if status.success() => log::debug!("updated FLV metadata of {path}"),
            Ok(status) => log::warn!("{} failed on {path}: {status}", tool.display()),
            Err(err) => log::warn!("{} failed on {path}: {err}", tool.display()),
        }
    }
}

/// Runs `command` on a background thread and forwards its events over a
/// channel. The channel closes after the terminal event.
pub fn run_with_events(
    command: FfmpegCommand,
) -> (
    Receiver<FfmpegEvent>,
    CancelHandle,
    thread::JoinHandle<Result<RunReport, FfmpegError>>,
) {
    let (event_tx, event_rx) = mpsc::channel::<FfmpegEvent>();
    let cancel = command.cancel_handle();

    let handle = thread::spawn(move || {
        let start_tx = event_tx.clone();
        let codec_tx = event_tx.clone();
        let progress_tx = event_tx.clone();
        let stderr_tx = event_tx.clone();
        let error_tx = event_tx.clone();
        let end_tx = event_tx.clone();
        let cancel_tx = event_tx;

        let handlers = RunHandlers::new()
            .on_start(move |line| {
                let _ = start_tx.send(FfmpegEvent::Start(line.to_string()));
            })
            .on_codec_data(move |data| {
                let _ = codec_tx.send(FfmpegEvent::CodecData(data.clone()));
            })
            .on_progress(move |progress| {
                let _ = progress_tx.send(FfmpegEvent::Progress(progress.clone()));
            })
            .on_stderr(move |line| {
                let _ = stderr_tx.send(FfmpegEvent::Stderr(line.to_string()));
            })
            .on_error(move |err, stdout, stderr| {
                let _ = error_tx.send(FfmpegEvent::Error {
                    message: err.to_string(),
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                });
            })
            .on_end(move |stdout, stderr| {
                let _ = end_tx.send(FfmpegEvent::End {
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                });
            })
            .on_cancelled(move || {
                let _ = cancel_tx.send(FfmpegEvent::Cancelled);
            });

        run(&command, handlers)
    });

    (event_rx, cancel, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    enum Seen {
        Start,
        Codec(String),
        Progress(f64),
        Error(String),
        End,
        Cancelled,
    }

    const STREAM: &[&str] = &[
        "ffmpeg version 6.1 Copyright (c) 2000-2023 the FFmpeg developers",
        "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':",
        "  Duration: 00:00:03.00, start: 0.000000, bitrate: 500 kb/s",
        "    Stream #0:0(und): Video: h264 (High), yuv420p, 320x240, 25 fps",
        "    Stream #0:1(und): Audio: aac (LC), 44100 Hz, stereo, fltp",
        "frame=   25 fps=0.0 q=28.0 size=      48kB time=00:00:01.00 bitrate= 393.2kbits/s speed=2.0x",
        "frame=   50 fps= 49 q=28.0 size=      96kB time=00:00:02.00 bitrate= 393.2kbits/s speed=2.0x",
        "frame=   75 fps= 49 q=28.0 size=     144kB time=00:00:03.00 bitrate= 393.2kbits/s speed=2.0x",
    ];

    fn drive_monitor(exit: RunExit, capacity: usize) -> (Vec<Seen>, Result<RunReport, FfmpegError>) {
        let seen = RefCell::new(Vec::new());
        let config = RunConfig {
            stdout_lines: capacity,
            ..RunConfig::default()
        };
        let handlers = RunHandlers::new()
            .on_start(|_| seen.borrow_mut().push(Seen::Start))
            .on_codec_data(|data| seen.borrow_mut().push(Seen::Codec(data.video.clone())))
            .on_progress(|progress| seen.borrow_mut().push(Seen::Progress(progress.time)))
            .on_error(|_, _, stderr| seen.borrow_mut().push(Seen::Error(stderr.to_string())))
            .on_end(|_, _| seen.borrow_mut().push(Seen::End))
            .on_cancelled(|| seen.borrow_mut().push(Seen::Cancelled));

        let mut monitor = RunMonitor::new(&config, handlers);
        monitor.spawning();
        monitor.started("ffmpeg -i in.mp4 out.mp4");
        for line in STREAM {
            monitor.on_line(StreamKind::Stderr, line);
        }
        let result = monitor.finish(exit);
        (seen.into_inner(), result)
    }

    fn exited(code: i32) -> RunExit {
        RunExit::Exited(ExitInfo {
            code: Some(code),
            signal: None,
        })
    }

    #[test]
    fn success_yields_codec_progress_then_end() {
        let (seen, result) = drive_monitor(exited(0), 100);
        assert_eq!(
            seen,
            vec![
                Seen::Start,
                Seen::Codec("h264 (High)".to_string()),
                Seen::Progress(1.0),
                Seen::Progress(2.0),
                Seen::Progress(3.0),
                Seen::End,
            ]
        );
        let report = result.unwrap();
        assert_eq!(report.last_progress.unwrap().percent, Some(100.0));
        assert_eq!(report.codec_data.unwrap().audio, "aac (LC)");
    }

    #[test]
    fn failure_carries_ring_tail_and_no_end() {
        let (seen, result) = drive_monitor(exited(1), 2);
        let expected_tail = format!("{}\n{}", STREAM[6], STREAM[7]);
        assert_eq!(seen.last(), Some(&Seen::Error(expected_tail.clone())));
        assert!(!seen.contains(&Seen::End));
        match result {
            Err(FfmpegError::ProcessFailed {
                exit_code,
                message,
                stderr,
                ..
            }) => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr, expected_tail);
                assert!(message.starts_with("ffmpeg exited with code 1"));
                assert!(message.ends_with(&expected_tail));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cancellation_is_a_single_notice() {
        let (seen, result) = drive_monitor(RunExit::Cancelled, 100);
        assert_eq!(seen.last(), Some(&Seen::Cancelled));
        assert!(!seen.iter().any(|event| matches!(event, Seen::Error(_))));
        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn timeout_reports_elapsed() {
        let (seen, result) = drive_monitor(RunExit::TimedOut(Duration::from_secs(2)), 100);
        assert!(matches!(seen.last(), Some(Seen::Error(_))));
        assert!(matches!(
            result,
            Err(FfmpegError::Timeout { elapsed }) if elapsed == Duration::from_secs(2)
        ));
    }

    #[test]
    fn failure_before_spawn_calls_on_error_once() {
        let config = RunConfig::default();
        let errors = RefCell::new(Vec::new());
        let handlers = RunHandlers::new()
            .on_error(|err, stdout, stderr| {
                errors
                    .borrow_mut()
                    .push((err.to_string(), stdout.to_string(), stderr.to_string()))
            });
        let mut monitor = RunMonitor::new(&config, handlers);
        monitor.spawning();
        let err = monitor.fail(FfmpegError::invalid("no output specified"));
        assert!(matches!(err, FfmpegError::InvalidCommand { .. }));
        assert_eq!(
            errors.into_inner(),
            vec![(
                "invalid command: no output specified".to_string(),
                String::new(),
                String::new()
            )]
        );
    }

    #[test]
    fn state_follows_the_run() {
        let config = RunConfig::default();
        let mut monitor = RunMonitor::new(&config, RunHandlers::new());
        assert_eq!(monitor.state(), RunState::Idle);
        monitor.spawning();
        assert_eq!(monitor.state(), RunState::Spawning);
        monitor.started("ffmpeg");
        assert_eq!(monitor.state(), RunState::Running);
    }

    #[test]
    fn stdout_is_kept_only_when_captured() {
        let config = RunConfig {
            capture_stdout: true,
            ..RunConfig::default()
        };
        let mut monitor = RunMonitor::new(&config, RunHandlers::new());
        monitor.spawning();
        monitor.started("ffmpeg");
        monitor.on_line(StreamKind::Stdout, "hello");
        let report = monitor.finish(exited(0)).unwrap();
        assert_eq!(report.stdout, "hello");
        assert_eq!(report.stderr, "");
    }

    #[test]
    fn merged_stdout_feeds_the_parser() {
        let config = RunConfig {
            merge_stdout: true,
            ..RunConfig::default()
        };
        let count = RefCell::new(0);
        let handlers = RunHandlers::new().on_progress(|_| *count.borrow_mut() += 1);
        let mut monitor = RunMonitor::new(&config, handlers);
        monitor.spawning();
        monitor.started("ffmpeg");
        monitor.on_line(StreamKind::Stdout, STREAM[5]);
        monitor.finish(exited(0)).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn run_without_output_is_a_configuration_error() {
        let mut command = FfmpegCommand::new();
        command.input("in.mp4");
        assert!(matches!(
            command.run(RunHandlers::new()),
            Err(FfmpegError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn cancel_before_run_never_spawns() {
        let mut command = FfmpegCommand::new();
        command
            .input("in.mp4")
            .output("out.mp4")
            .ffmpeg_path("/nonexistent/ffmpeg");
        command.cancel_handle().cancel();
        assert!(command.run(RunHandlers::new()).unwrap_err().is_cancelled());
    }

    #[test]
    fn cancel_clears_after_the_run_it_stopped() {
        let mut command = FfmpegCommand::new();
        command
            .input("in.mp4")
            .output("out.mp4")
            .ffmpeg_path("/nonexistent/ffmpeg");
        let cancel = command.cancel_handle();
        cancel.cancel();
        assert!(command.run(RunHandlers::new()).unwrap_err().is_cancelled());
        assert!(!cancel.is_cancelled());

        let again = command.run(RunHandlers::new());
        assert!(matches!(again, Err(FfmpegError::BinaryNotFound { .. })));
    }

    #[test]
    fn missing_binary_is_reported_before_events() {
        let mut command = FfmpegCommand::new();
        command
            .input("in.mp4")
            .output("out.mp4")
            .ffmpeg_path("/nonexistent/ffmpeg");
        let errors = RefCell::new(0);
        let result = command.run(RunHandlers::new().on_error(|_, _, _| *errors.borrow_mut() += 1));
        assert!(matches!(result, Err(FfmpegError::BinaryNotFound { .. })));
        assert_eq!(*errors.borrow(), 1);
    }
}
