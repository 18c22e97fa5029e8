use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use runlet_service::RunnerConfig;

/// List pipelines in the registry
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory holding pipeline definitions
    #[arg(long, value_name = "DIR")]
    pub pipelines_dir: Option<PathBuf>,
}

pub fn execute(args: ListArgs) -> Result<()> {
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

    let ids = match registry.list() {
        Ok(ids) => ids,
        Err(e) => {
            output::error(&format!("{}", e));
            std::process::exit(e.exit_code());
        }
    };

    if ids.is_empty() {
        output::dim(&format!(
            "no pipelines found in {}",
            registry.root().display()
        ));
        return Ok(());
    }

    output::info(&format!(
        "{} pipeline(s) in {}",
        ids.len(),
        registry.root().display()
    ));
    for id in ids {
        println!("  {}", id);
    }

    Ok(())
}
