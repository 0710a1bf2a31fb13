use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Spawning,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::TimedOut | RunState::Cancelled
        )
    }
}

/// State and timing of one ffmpeg execution.
#[derive(Debug, Clone)]
pub struct Job {
    pub status: RunState,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
}

impl Default for Job {
    fn default() -> Self {
        Self {
            status: RunState::Idle,
            started_at: None,
            ended_at: None,
        }
    }
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to `next`. Terminal states are final; a second terminal
    /// transition is ignored and reported as `false`.
    pub fn advance(&mut self, next: RunState) -> bool {
        if self.status.is_terminal() {
            log::debug!("ignoring transition {:?} -> {next:?}", self.status);
            return false;
        }
        log::debug!("ffmpeg job {:?} -> {next:?}", self.status);
        match next {
            RunState::Running => self.started_at = Some(Instant::now()),
            state if state.is_terminal() => self.ended_at = Some(Instant::now()),
            _ => {}
        }
        self.status = next;
        true
    }

    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}
