use std::io::Read;
use std::sync::mpsc::Sender;
use std::thread;

/// Which pipe of the child a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Splits a byte stream into lines on `\n`, `\r` or `\r\n`. A partial trailing
/// line stays buffered until more bytes arrive or the stream ends.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
    last_was_cr: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8], mut emit: impl FnMut(String)) {
        for &byte in chunk {
            match byte {
                b'\n' if self.last_was_cr => {
                    self.last_was_cr = false;
                }
                b'\r' | b'\n' => {
                    self.last_was_cr = byte == b'\r';
                    emit(self.take_line());
                }
                other => {
                    self.last_was_cr = false;
                    self.pending.push(other);
                }
            }
        }
    }

    /// Flushes the buffered partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.last_was_cr = false;
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

/// Reads `reader` on its own thread and forwards non-empty lines in order.
pub(crate) fn spawn_line_reader<R: Read + Send + 'static>(
    stream: StreamKind,
    mut reader: R,
    sender: Sender<(StreamKind, String)>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut splitter = LineSplitter::new();
        let mut chunk = [0u8; 4096];
        let forward = |line: String| {
            if !line.is_empty() {
                let _ = sender.send((stream, line));
            }
        };

        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => splitter.push(&chunk[..n], forward),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::debug!("{stream:?} reader stopped: {err}");
                    break;
                }
            }
        }

        if let Some(line) = splitter.finish() {
            forward(line);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(chunks: &[&[u8]]) -> Vec<String> {
        let mut splitter = LineSplitter::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            splitter.push(chunk, |line| lines.push(line));
        }
        lines.extend(splitter.finish());
        lines
    }

    #[test]
    fn buffers_partial_lines_across_chunks() {
        assert_eq!(split(&[b"fra", b"me=1\nfr", b"ame=2\n"]), vec!["frame=1", "frame=2"]);
    }

    #[test]
    fn splits_on_carriage_returns() {
        assert_eq!(
            split(&[b"frame=1\rframe=2\r\nend"]),
            vec!["frame=1", "frame=2", "end"]
        );
    }

    #[test]
    fn crlf_split_over_chunks_is_one_break() {
        assert_eq!(split(&[b"a\r", b"\nb\n"]), vec!["a", "b"]);
    }

    #[test]
    fn trailing_partial_line_is_flushed_at_end() {
        assert_eq!(split(&[b"one\ntwo"]), vec!["one", "two"]);
    }
}
