pub mod models;
pub mod parser;
pub mod registry;

pub use models::{
    ExecutionContext, ExecutionMode, Pipeline, RunSummary, Step, StepAction, StepResult,
    StepStatus,
};
pub use parser::{PipelineParser, PipelineValidator, ValidationError};
pub use registry::PipelineRegistry;
