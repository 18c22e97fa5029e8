use crate::output;

use clap::Args;
use color_eyre::Result;

use runlet_service::grpc::proto::runner_control_client::RunnerControlClient;
use runlet_service::grpc::proto::ShutdownRequest;
use runlet_service::RunnerConfig;

/// Ask a running runner to shut down gracefully
#[derive(Args, Debug)]
pub struct ShutdownArgs {
    /// Control port of the runner (default: $RUNLET_CONTROL_PORT or 8080)
    #[arg(long, short = 'p', value_name = "PORT")]
    pub port: Option<u16>,
}

pub async fn execute(args: ShutdownArgs) -> Result<()> {
    let config = RunnerConfig::from_env().unwrap_or_default();
    let addr = super::control_addr(args.port, &config);

    let mut client = match RunnerControlClient::connect(addr.clone()).await {
        Ok(client) => client,
        Err(e) => {
            output::error(&format!("could not reach runner at {}: {}", addr, e));
            std::process::exit(1);
        }
    };

    let resp = client.shutdown(ShutdownRequest {}).await?.into_inner();

    if resp.accepted {
        output::success("shutdown requested; the in-flight step will finish first");
    } else {
        output::warning("runner did not accept the shutdown request");
    }

    Ok(())
}
