mod commands;
mod output;

use clap::{Parser, Subcommand};
use color_eyre::Result;

/// Run named data pipelines and serve their control port
#[derive(Parser, Debug)]
#[command(name = "runlet", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a pipeline, once or as a resident service
    Run(commands::run::RunArgs),
    /// Validate a pipeline definition
    Validate(commands::validate::ValidateArgs),
    /// List pipelines in the registry
    List(commands::list::ListArgs),
    /// Query a running runner's control endpoint
    Status(commands::status::StatusArgs),
    /// Stream execution events from a running runner
    Watch(commands::watch::WatchArgs),
    /// Ask a running runner to shut down gracefully
    Shutdown(commands::shutdown::ShutdownArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::List(args) => commands::list::execute(args),
        Commands::Status(args) => commands::status::execute(args).await,
        Commands::Watch(args) => commands::watch::execute(args).await,
        Commands::Shutdown(args) => commands::shutdown::execute(args).await,
    }
}
