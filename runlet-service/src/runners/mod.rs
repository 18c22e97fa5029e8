// Step Runners
// Pluggable execution backends for pipeline steps. The runner shell stays
// agnostic of what a step does; anything that can turn a step into an
// outcome can be plugged in here.

pub mod shell;

pub use shell::{Shell, ShellRunner};

use crate::execution::events::ProgressSender;
use crate::pipeline::models::{ExecutionContext, Step};

use async_trait::async_trait;

/// Raw outcome of running one step.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Execute one step to completion. Output lines are streamed through
    /// `progress` while the step runs; the collected output comes back in
    /// the outcome.
    async fn run(
        &self,
        step: &Step,
        step_index: usize,
        context: &ExecutionContext,
        progress: Option<&ProgressSender>,
    ) -> StepOutcome;
}
