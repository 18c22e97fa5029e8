use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use runlet_service::{ExecutionMode, PipelineValidator, RunnerConfig};

/// Validate a pipeline definition
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Pipeline identifier, or a path to a definition file
    pub pipeline: String,

    /// Directory holding pipeline definitions
    #[arg(long, value_name = "DIR")]
    pub pipelines_dir: Option<PathBuf>,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let config = match RunnerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("{}", e));
            std::process::exit(e.exit_code());
        }
    };

    let registry = match super::registry(args.pipelines_dir, &config) {
        Ok(registry) => registry,
        Err(e) => {
            output::error(&format!("{}", e));
            std::process::exit(e.exit_code());
        }
    };

    output::status("Validating", &args.pipeline);

    let pipeline = match registry.load(&args.pipeline) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            output::error(&format!("{}", e));
            std::process::exit(e.exit_code());
        }
    };

    output::check("YAML syntax valid");
    output::check(&format!(
        "Structure: {} steps, {} mode",
        pipeline.steps.len(),
        match pipeline.mode {
            ExecutionMode::Once => "run-once",
            ExecutionMode::Service => "service",
        }
    ));

    match PipelineValidator::validate(&pipeline) {
        Ok(()) => {
            output::check("Semantic validation passed");
        }
        Err(errors) => {
            output::error(&format!("{} validation error(s):", errors.len()));
            for error in &errors {
                output::error(&format!("  - {}", error));
            }
            std::process::exit(2);
        }
    }

    println!();
    output::success(&format!("Pipeline '{}' is valid", pipeline.name));

    Ok(())
}
