pub mod events;
pub mod executor;
pub mod state;

pub use events::{progress_channel, ExecutionEvent, ProgressReceiver, ProgressSender};
pub use executor::PipelineExecutor;
pub use state::{RunnerState, StateHandle};

pub use crate::pipeline::models::{ExecutionContext, RunSummary, StepResult, StepStatus};
