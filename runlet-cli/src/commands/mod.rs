pub mod list;
pub mod run;
pub mod shutdown;
pub mod status;
pub mod validate;
pub mod watch;

use std::path::PathBuf;

use runlet_service::{PipelineRegistry, RunnerConfig, ServiceResult};

/// Registry selection shared by the commands: an explicit flag wins, then the
/// environment, then the default directory.
pub fn registry(flag: Option<PathBuf>, config: &RunnerConfig) -> ServiceResult<PipelineRegistry> {
    match flag.or_else(|| config.pipelines_dir.clone()) {
        Some(dir) => Ok(PipelineRegistry::new(dir)),
        None => PipelineRegistry::from_env_or_default(),
    }
}

/// Control endpoint address for client commands.
pub fn control_addr(port: Option<u16>, config: &RunnerConfig) -> String {
    format!("http://127.0.0.1:{}", port.unwrap_or(config.control_port))
}
