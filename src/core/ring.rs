use std::collections::VecDeque;

/// Keeps the most recent diagnostic lines for error reports.
#[derive(Debug, Clone, Default)]
pub struct LineRing {
    capacity: usize,
    lines: VecDeque<String>,
    closed: bool,
}

impl LineRing {
    /// `capacity == 0` retains every line.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: VecDeque::new(),
            closed: false,
        }
    }

    pub fn append(&mut self, line: impl Into<String>) {
        if self.closed {
            return;
        }
        if self.capacity > 0 && self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Retained lines joined with `\n`, oldest first.
    pub fn get(&self) -> String {
        let mut joined = String::new();
        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                joined.push('\n');
            }
            joined.push_str(line);
        }
        joined
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drops the backing storage; later appends are ignored.
    pub fn close(&mut self) {
        self.closed = true;
        self.lines = VecDeque::new();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
