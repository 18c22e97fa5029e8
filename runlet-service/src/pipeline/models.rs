use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// A pipeline definition: an externally supplied, ordered unit of work.
/// The runner never interprets what a step does beyond spawning it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Run once and exit, or stay resident serving the control port.
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Execute the pipeline to completion and exit.
    #[default]
    Once,
    /// Execute the pipeline, then stay alive serving the control port
    /// until an external shutdown request arrives.
    Service,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(flatten)]
    pub action: StepAction,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    /// Single command line, run through the default shell.
    Command(String),
    /// Multi-line script, optionally naming the shell to use.
    Shell {
        shell: Option<String>,
        script: String,
    },
}

impl Step {
    /// The script text this step hands to its shell.
    pub fn script(&self) -> &str {
        match &self.action {
            StepAction::Command(cmd) => cmd,
            StepAction::Shell { script, .. } => script,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_name: String,
    pub status: StepStatus,
    pub output: String,
    pub error: Option<String>,
    #[serde(skip)]
    pub duration: Duration,
    pub exit_code: Option<i32>,
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub pipeline_name: String,
    pub steps: Vec<StepResult>,
    pub duration: Duration,
    pub failed_steps: usize,
    /// True when a shutdown request stopped the run before all steps ran.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failed_steps == 0
    }
}

/// Runtime inputs for one pipeline run: where to execute and with what
/// environment. Built once at startup, never mutated by steps.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub pipeline_name: String,
    /// Base environment for every step; the definition's `env` blocks merge
    /// into it.
    pub env: HashMap<String, String>,
    /// Caller-supplied variables. These win over anything the definition
    /// sets, at pipeline or step level.
    pub overrides: HashMap<String, String>,
    pub working_dir: PathBuf,
}

impl ExecutionContext {
    pub fn new(pipeline_name: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            env: HashMap::new(),
            overrides: HashMap::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }
}
