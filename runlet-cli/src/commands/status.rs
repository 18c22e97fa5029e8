use crate::output;

use clap::Args;
use color_eyre::Result;

use runlet_service::grpc::proto::runner_control_client::RunnerControlClient;
use runlet_service::grpc::proto::StatusRequest;
use runlet_service::RunnerConfig;

/// Query a running runner's control endpoint
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Control port of the runner (default: $RUNLET_CONTROL_PORT or 8080)
    #[arg(long, short = 'p', value_name = "PORT")]
    pub port: Option<u16>,

    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: StatusArgs) -> Result<()> {
    let config = RunnerConfig::from_env().unwrap_or_default();
    let addr = super::control_addr(args.port, &config);

    let mut client = match RunnerControlClient::connect(addr.clone()).await {
        Ok(client) => client,
        Err(e) => {
            output::error(&format!("could not reach runner at {}: {}", addr, e));
            std::process::exit(1);
        }
    };

    let status = client.status(StatusRequest {}).await?.into_inner();

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "pipeline": status.pipeline,
                "state": status.state,
                "steps_total": status.steps_total,
                "steps_completed": status.steps_completed,
                "steps_failed": status.steps_failed,
                "uptime_ms": status.uptime_ms,
            })
        );
        return Ok(());
    }

    output::header(&format!("Pipeline '{}'", status.pipeline));
    println!("  state:     {}", status.state);
    println!(
        "  steps:     {}/{} completed, {} failed",
        status.steps_completed, status.steps_total, status.steps_failed
    );
    println!("  uptime:    {:.1}s", status.uptime_ms as f64 / 1000.0);

    Ok(())
}
