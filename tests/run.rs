#![cfg(unix)]

use std::cell::RefCell;
use std::fs;
use std::io::{self, Cursor, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ffdrive::{run_with_events, FfmpegCommand, FfmpegError, FfmpegEvent, PipeOptions, RunHandlers};
use tempfile::TempDir;

const BANNER: &str = r#"cat >&2 <<'EOF'
ffmpeg version 6.1 Copyright (c) 2000-2023 the FFmpeg developers
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':
  Duration: 00:00:02.00, start: 0.000000, bitrate: 500 kb/s
    Stream #0:0(und): Video: h264 (High), yuv420p, 320x240, 25 fps
    Stream #0:1(und): Audio: aac (LC), 44100 Hz, stereo, fltp
Stream mapping:
  Stream #0:0 -> #0:0 (h264 (native) -> h264 (libx264))
EOF
"#;

const PROGRESS: &str = r#"printf 'frame=   25 fps=0.0 q=28.0 size=      48kB time=00:00:01.00 bitrate= 393.2kbits/s speed=2.0x\r' >&2
printf 'frame=   50 fps= 49 q=28.0 size=      96kB time=00:00:02.00 bitrate= 393.2kbits/s speed=2.0x\n' >&2
"#;

fn fake_ffmpeg(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("ffmpeg");
    let script = format!("#!/bin/sh\nprintf '%s\\n' \"$@\" > \"$0.args\"\n{body}");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn recorded_args(ffmpeg: &Path) -> Vec<String> {
    fs::read_to_string(ffmpeg.with_extension("args"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn command(ffmpeg: &Path, dir: &TempDir) -> FfmpegCommand {
    let mut command = FfmpegCommand::new();
    command
        .ffmpeg_path(ffmpeg)
        .input("in put.mp4")
        .output(dir.path().join("out.mp4").to_string_lossy().into_owned());
    command
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn successful_run_reports_codec_data_and_progress() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_ffmpeg(&dir, &format!("{BANNER}{PROGRESS}exit 0\n"));
    let mut command = command(&ffmpeg, &dir);
    command.audio_codec("aac");

    let seen = RefCell::new(Vec::new());
    let report = command
        .run(
            RunHandlers::new()
                .on_codec_data(|data| seen.borrow_mut().push(format!("codec {}", data.audio)))
                .on_progress(|progress| {
                    seen.borrow_mut()
                        .push(format!("progress {:?}", progress.percent))
                }),
        )
        .unwrap();

    assert_eq!(
        seen.into_inner(),
        vec![
            "codec aac (LC)".to_string(),
            "progress Some(50.0)".to_string(),
            "progress Some(100.0)".to_string(),
        ]
    );
    assert_eq!(report.last_progress.unwrap().frames, 50);
    assert!(report.stderr.contains("Stream mapping:"));

    let args = recorded_args(&ffmpeg);
    assert_eq!(args[..3], ["-y", "-i", "in put.mp4"]);
    assert_eq!(args[3..5], ["-acodec", "aac"]);
}

#[test]
fn failing_run_carries_the_last_lines() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        "{BANNER}echo '[libx264 @ 0x1] broken' >&2\necho 'Conversion failed!' >&2\nexit 1\n"
    );
    let ffmpeg = fake_ffmpeg(&dir, &body);
    let mut command = command(&ffmpeg, &dir);
    command.stdout_lines(2);

    let mut ended = false;
    let mut error_stderr = None;
    let result = command.run(
        RunHandlers::new()
            .on_end(|_, _| ended = true)
            .on_error(|_, _, stderr| error_stderr = Some(stderr.to_string())),
    );

    assert!(!ended);
    let expected = "[libx264 @ 0x1] broken\nConversion failed!";
    assert_eq!(error_stderr.as_deref(), Some(expected));
    match result {
        Err(FfmpegError::ProcessFailed {
            exit_code, message, ..
        }) => {
            assert_eq!(exit_code, Some(1));
            assert!(message.starts_with("ffmpeg exited with code 1: Conversion failed!"));
            assert!(message.ends_with(expected));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn timeout_kills_the_process() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_ffmpeg(&dir, &format!("{BANNER}exec sleep 10\n"));
    let mut command = command(&ffmpeg, &dir);
    command.timeout(Duration::from_millis(300));

    let started = Instant::now();
    let result = command.run(RunHandlers::new());
    assert!(matches!(result, Err(FfmpegError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn cancel_ends_with_a_single_cancelled_event() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_ffmpeg(&dir, &format!("{BANNER}exec sleep 10\n"));
    let command = command(&ffmpeg, &dir);

    let (events, cancel, handle) = run_with_events(command);
    match events.recv_timeout(Duration::from_secs(5)).unwrap() {
        FfmpegEvent::Start(line) => assert!(line.starts_with("ffmpeg -y -i 'in put.mp4'")),
        other => panic!("unexpected {other:?}"),
    }
    cancel.cancel();

    let result = handle.join().unwrap();
    assert!(result.unwrap_err().is_cancelled());

    let rest: Vec<FfmpegEvent> = events.iter().collect();
    let terminal: Vec<&FfmpegEvent> = rest.iter().filter(|event| event.is_terminal()).collect();
    assert_eq!(terminal, vec![&FfmpegEvent::Cancelled]);
    assert_eq!(rest.last(), Some(&FfmpegEvent::Cancelled));
}

#[test]
fn streams_are_piped_through_stdin_and_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let captured = dir.path().join("stdin.bin");
    let body = format!("cat > '{}'\nprintf 'encoded'\nexit 0\n", captured.display());
    let ffmpeg = fake_ffmpeg(&dir, &body);

    let sink = SharedBuffer::default();
    let mut command = FfmpegCommand::new();
    command.ffmpeg_path(&ffmpeg);
    command.input_stream(Cursor::new(b"raw bytes".to_vec())).unwrap();
    command.format("matroska");
    command
        .output_stream(sink.clone(), PipeOptions::default())
        .unwrap();

    command.run(RunHandlers::new()).unwrap();

    assert_eq!(fs::read(&captured).unwrap(), b"raw bytes");
    assert_eq!(sink.0.lock().unwrap().as_slice(), b"encoded");
    assert_eq!(
        recorded_args(&ffmpeg),
        vec!["-i", "pipe:0", "-f", "matroska", "pipe:1"]
    );
}

#[test]
fn environment_and_working_dir_reach_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_ffmpeg(&dir, "echo \"tag=$FFDRIVE_TAG cwd=$(pwd)\" >&2\nexit 0\n");
    let mut command = command(&ffmpeg, &dir);
    command
        .config_mut()
        .env
        .push(("FFDRIVE_TAG".to_string(), "blue".to_string()));
    command.config_mut().working_dir = Some(dir.path().to_path_buf());

    let report = command.run(RunHandlers::new()).unwrap();
    let cwd = dir.path().canonicalize().unwrap();
    assert_eq!(report.stderr, format!("tag=blue cwd={}", cwd.display()));
}
