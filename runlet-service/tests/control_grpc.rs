// End-to-end exercise of the control endpoint: a runner executing a pipeline
// while a client queries health over gRPC, then shuts it down remotely.

use runlet_service::grpc::proto::runner_control_client::RunnerControlClient;
use runlet_service::grpc::proto::{HealthRequest, ShutdownRequest, StatusRequest};
use runlet_service::grpc::ControlService;
use runlet_service::{
    progress_channel, ExecutionContext, PipelineExecutor, PipelineParser, RunnerState,
};

use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

async fn spawn_control(
    service: ControlService,
) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let incoming = TcpListenerStream::new(listener);

    let shutdown = service.clone();
    let handle = tokio::spawn(async move {
        service
            .into_router()
            .serve_with_incoming_shutdown(incoming, async move {
                shutdown.wait_for_shutdown().await
            })
            .await
            .unwrap();
    });

    (addr, handle)
}

#[tokio::test]
async fn health_reports_running_then_completed() {
    let yaml = r#"
name: etl_daily
steps:
  - name: extract
    command: sleep 0.4 && echo extracted
"#;
    let pipeline = PipelineParser::from_str(yaml).unwrap();

    let context = ExecutionContext::new("etl_daily", std::env::current_dir().unwrap());
    let (progress_tx, mut progress_rx) = progress_channel();

    let executor = PipelineExecutor::new(context).with_progress(progress_tx);
    let state = executor.state();

    let control = ControlService::new("etl_daily", state.clone());
    let executor = executor.with_shutdown(control.shutdown_receiver());
    let (addr, server) = spawn_control(control.clone()).await;

    let mut client = RunnerControlClient::connect(format!("http://{}", addr))
        .await
        .unwrap();

    // Before the run starts the runner is ready
    let health = client.health(HealthRequest {}).await.unwrap().into_inner();
    assert_eq!(health.status, "ready");

    let exec = tokio::spawn(async move { executor.execute(&pipeline).await });

    // Feed events to the control service the way the serve loop does
    let recorder = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            control.record(&event);
        }
    });

    // While the step sleeps, health answers "running"
    let mut state_rx = state.clone();
    state_rx
        .wait_for(|s| *s == RunnerState::Running)
        .await
        .unwrap();
    let health = client.health(HealthRequest {}).await.unwrap().into_inner();
    assert_eq!(health.status, "running");

    let summary = exec.await.unwrap().unwrap();
    assert!(summary.success());
    recorder.await.unwrap();

    let health = client.health(HealthRequest {}).await.unwrap().into_inner();
    assert_eq!(health.status, "completed");

    let status = client.status(StatusRequest {}).await.unwrap().into_inner();
    assert_eq!(status.pipeline, "etl_daily");
    assert_eq!(status.steps_total, 1);
    assert_eq!(status.steps_completed, 1);
    assert_eq!(status.steps_failed, 0);

    // Remote shutdown stops the server and releases the port
    let resp = client
        .shutdown(ShutdownRequest {})
        .await
        .unwrap()
        .into_inner();
    assert!(resp.accepted);

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not release the port after shutdown")
        .unwrap();
}

#[tokio::test]
async fn failed_pipeline_reports_failed_health() {
    let yaml = r#"
name: broken
steps:
  - name: explode
    command: exit 9
"#;
    let pipeline = PipelineParser::from_str(yaml).unwrap();

    let context = ExecutionContext::new("broken", std::env::current_dir().unwrap());

    let executor = PipelineExecutor::new(context);
    let state = executor.state();

    let control = ControlService::new("broken", state);
    let (addr, server) = spawn_control(control.clone()).await;

    let err = executor.execute(&pipeline).await.unwrap_err();
    assert_eq!(err.exit_code(), 1);

    let mut client = RunnerControlClient::connect(format!("http://{}", addr))
        .await
        .unwrap();
    let health = client.health(HealthRequest {}).await.unwrap().into_inner();
    assert_eq!(health.status, "failed");

    control.request_shutdown();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
}
