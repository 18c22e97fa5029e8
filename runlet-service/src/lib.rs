// Runlet Service Library
// Core runner for resolving and executing named YAML pipelines

pub mod config;
pub mod error;
pub mod execution;
pub mod grpc;
pub mod pipeline;
pub mod runners;

// Re-export commonly used types
pub use error::{ServiceError, ServiceResult};

// Re-export pipeline types
pub use pipeline::{
    ExecutionContext, ExecutionMode, Pipeline, PipelineParser, PipelineRegistry,
    PipelineValidator, RunSummary, Step, StepAction, StepResult, StepStatus, ValidationError,
};

// Re-export execution types
pub use execution::{
    progress_channel, ExecutionEvent, PipelineExecutor, ProgressSender, RunnerState, StateHandle,
};

// Re-export runner types
pub use runners::{ShellRunner, StepOutcome, StepRunner};

// Re-export the control surface
pub use grpc::ControlService;

// Re-export configuration
pub use config::{RunnerConfig, DEFAULT_CONTROL_PORT};
