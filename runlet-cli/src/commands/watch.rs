use crate::output;

use clap::Args;
use color_eyre::Result;

use runlet_service::grpc::proto::runner_control_client::RunnerControlClient;
use runlet_service::grpc::proto::WatchRequest;
use runlet_service::RunnerConfig;

/// Stream execution events from a running runner
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Control port of the runner (default: $RUNLET_CONTROL_PORT or 8080)
    #[arg(long, short = 'p', value_name = "PORT")]
    pub port: Option<u16>,
}

pub async fn execute(args: WatchArgs) -> Result<()> {
    let config = RunnerConfig::from_env().unwrap_or_default();
    let addr = super::control_addr(args.port, &config);

    let mut client = match RunnerControlClient::connect(addr.clone()).await {
        Ok(client) => client,
        Err(e) => {
            output::error(&format!("could not reach runner at {}: {}", addr, e));
            std::process::exit(1);
        }
    };

    let mut stream = client.watch(WatchRequest {}).await?.into_inner();

    output::dim(&format!("watching {} (ctrl-c to stop)", addr));
    while let Some(event) = stream.message().await? {
        match event.kind.as_str() {
            "step_output" => {
                if event.is_error {
                    output::step_error(&event.output);
                } else {
                    output::step_output(&event.output);
                }
            }
            "step_started" => println!("  > {}", event.step_name),
            "step_completed" => {
                let exit = event
                    .exit_code
                    .map(|c| format!(" (exit code {})", c))
                    .unwrap_or_default();
                println!("  < {} {}{}", event.step_name, event.status, exit);
            }
            "step_skipped" => {
                output::warning(&format!("  {} skipped: {}", event.step_name, event.output));
            }
            "pipeline_started" => output::header(&format!("Pipeline '{}'", event.output)),
            "pipeline_completed" => {
                output::info(&format!("pipeline {}", event.status));
                break;
            }
            other => output::dim(other),
        }
    }

    Ok(())
}
