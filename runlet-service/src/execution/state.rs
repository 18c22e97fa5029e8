// Runner lifecycle state
// Starting -> Running -> {Completed | Failed}; terminal states are never left.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Starting,
    Running,
    Completed,
    Failed,
}

impl RunnerState {
    /// Status value reported on the health endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerState::Starting => "ready",
            RunnerState::Running => "running",
            RunnerState::Completed => "completed",
            RunnerState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerState::Completed | RunnerState::Failed)
    }
}

/// Write side of the lifecycle state. Only the executor holds one; everyone
/// else observes through `watch::Receiver`s.
#[derive(Debug)]
pub struct StateHandle {
    tx: watch::Sender<RunnerState>,
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RunnerState::Starting);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunnerState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> RunnerState {
        *self.tx.borrow()
    }

    /// Transition to a new state. Terminal states are sticky: once the runner
    /// has completed or failed, further transitions are ignored.
    pub fn set(&self, state: RunnerState) {
        self.tx.send_if_modified(|current| {
            if current.is_terminal() || *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}
