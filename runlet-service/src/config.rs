// Runner Configuration
// Environment-driven settings, overridable by CLI flags

use crate::pipeline::models::ExecutionMode;
use crate::{ServiceError, ServiceResult};

use std::collections::HashMap;
use std::path::PathBuf;

/// Default control/health port, per the deployment contract.
pub const DEFAULT_CONTROL_PORT: u16 = 8080;

pub const PIPELINE_ENV: &str = "RUNLET_PIPELINE";
pub const PIPELINES_DIR_ENV: &str = "RUNLET_PIPELINES_DIR";
pub const CONTROL_PORT_ENV: &str = "RUNLET_CONTROL_PORT";
pub const MODE_ENV: &str = "RUNLET_MODE";

/// Runner settings assembled at startup. Everything here is optional except
/// the control port, which falls back to the default; the CLI fills in the
/// rest from flags.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pipeline identifier to run when no CLI argument names one.
    pub pipeline: Option<String>,
    /// Directory holding pipeline definitions.
    pub pipelines_dir: Option<PathBuf>,
    /// Port for the control/health endpoint in service mode.
    pub control_port: u16,
    /// Execution mode override.
    pub mode: Option<ExecutionMode>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pipeline: None,
            pipelines_dir: None,
            control_port: DEFAULT_CONTROL_PORT,
            mode: None,
        }
    }
}

impl RunnerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> ServiceResult<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    fn from_vars(vars: HashMap<String, String>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(pipeline) = vars.get(PIPELINE_ENV) {
            if !pipeline.trim().is_empty() {
                config.pipeline = Some(pipeline.clone());
            }
        }

        if let Some(dir) = vars.get(PIPELINES_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.pipelines_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(port) = vars.get(CONTROL_PORT_ENV) {
            config.control_port = port.parse().map_err(|_| {
                ServiceError::configuration(format!(
                    "invalid {}: '{}' is not a port number",
                    CONTROL_PORT_ENV, port
                ))
            })?;
        }

        if let Some(mode) = vars.get(MODE_ENV) {
            config.mode = Some(parse_mode(mode)?);
        }

        Ok(config)
    }
}

pub fn parse_mode(value: &str) -> ServiceResult<ExecutionMode> {
    match value.to_ascii_lowercase().as_str() {
        "once" => Ok(ExecutionMode::Once),
        "service" => Ok(ExecutionMode::Service),
        other => Err(ServiceError::configuration(format!(
            "invalid execution mode '{}' (expected 'once' or 'service')",
            other
        ))),
    }
}
