// Execution Events
// Progress reporting for pipeline execution

use crate::pipeline::models::StepResult;

use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for execution progress events
pub type ProgressSender = mpsc::UnboundedSender<ExecutionEvent>;

/// Receiver for execution progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Pipeline execution started
    PipelineStarted {
        pipeline_name: String,
        total_steps: usize,
    },

    /// Step execution started
    StepStarted {
        step_name: String,
        step_index: usize,
    },

    /// One line of step output (stdout or stderr)
    StepOutput {
        step_name: String,
        step_index: usize,
        output: String,
        is_error: bool,
    },

    /// Step execution completed
    StepCompleted {
        result: StepResult,
        step_index: usize,
    },

    /// Step was not run (shutdown requested before it started)
    StepSkipped {
        step_name: String,
        step_index: usize,
        reason: String,
    },

    /// Pipeline execution completed
    PipelineCompleted {
        pipeline_name: String,
        success: bool,
        failed_steps: usize,
        duration: Duration,
    },
}

impl ExecutionEvent {
    /// Short event kind tag, used on the control stream.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionEvent::PipelineStarted { .. } => "pipeline_started",
            ExecutionEvent::StepStarted { .. } => "step_started",
            ExecutionEvent::StepOutput { .. } => "step_output",
            ExecutionEvent::StepCompleted { .. } => "step_completed",
            ExecutionEvent::StepSkipped { .. } => "step_skipped",
            ExecutionEvent::PipelineCompleted { .. } => "pipeline_completed",
        }
    }
}
