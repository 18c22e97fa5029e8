// gRPC Control Surface
// Liveness, status, event streaming, and remote shutdown for a runner in
// service mode.

use crate::execution::events::ExecutionEvent;
use crate::execution::state::RunnerState;
use crate::pipeline::models::StepStatus;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::{transport::Server, Request, Response, Status};

pub mod proto {
    tonic::include_proto!("runlet");
}

use proto::runner_control_server::{RunnerControl, RunnerControlServer};

/// Capacity of the event fanout buffer; slow watchers miss events rather
/// than stalling the executor.
const EVENT_BUFFER: usize = 256;

struct Inner {
    pipeline_name: String,
    state: watch::Receiver<RunnerState>,
    started_at: Instant,
    steps_total: AtomicUsize,
    steps_completed: AtomicUsize,
    steps_failed: AtomicUsize,
    events: broadcast::Sender<ExecutionEvent>,
    shutdown: watch::Sender<bool>,
}

/// Control service backing the runner's health port. Holds read views of the
/// executor's state plus the write side of the shutdown flag.
#[derive(Clone)]
pub struct ControlService {
    inner: Arc<Inner>,
}

impl ControlService {
    pub fn new(pipeline_name: impl Into<String>, state: watch::Receiver<RunnerState>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                pipeline_name: pipeline_name.into(),
                state,
                started_at: Instant::now(),
                steps_total: AtomicUsize::new(0),
                steps_completed: AtomicUsize::new(0),
                steps_failed: AtomicUsize::new(0),
                events,
                shutdown,
            }),
        }
    }

    /// Shutdown flag for the executor: flips to true when a shutdown has
    /// been requested over RPC or by a signal handler.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }

    /// Request a graceful shutdown, same as the Shutdown RPC.
    pub fn request_shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    /// Feed one execution event into the counters and the watch fanout.
    pub fn record(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::PipelineStarted { total_steps, .. } => {
                self.inner.steps_total.store(*total_steps, Ordering::Relaxed);
            }
            ExecutionEvent::StepCompleted { result, .. } => {
                self.inner.steps_completed.fetch_add(1, Ordering::Relaxed);
                if result.status == StepStatus::Failed {
                    self.inner.steps_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            _ => {}
        }
        let _ = self.inner.events.send(event.clone());
    }

    /// Resolves once a shutdown has been requested, locally or over RPC.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.inner.shutdown.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }

    pub fn into_router(self) -> tonic::transport::server::Router {
        Server::builder().add_service(RunnerControlServer::new(self))
    }

    /// Serve the control endpoint until a shutdown is requested, then release
    /// the port.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), tonic::transport::Error> {
        let shutdown = self.clone();
        self.into_router()
            .serve_with_shutdown(addr, async move { shutdown.wait_for_shutdown().await })
            .await
    }
}

#[tonic::async_trait]
impl RunnerControl for ControlService {
    async fn health(
        &self,
        _request: Request<proto::HealthRequest>,
    ) -> Result<Response<proto::HealthResponse>, Status> {
        let state = *self.inner.state.borrow();
        Ok(Response::new(proto::HealthResponse {
            status: state.as_str().to_string(),
        }))
    }

    async fn status(
        &self,
        _request: Request<proto::StatusRequest>,
    ) -> Result<Response<proto::StatusResponse>, Status> {
        let state = *self.inner.state.borrow();
        Ok(Response::new(proto::StatusResponse {
            pipeline: self.inner.pipeline_name.clone(),
            state: state.as_str().to_string(),
            steps_total: self.inner.steps_total.load(Ordering::Relaxed) as u32,
            steps_completed: self.inner.steps_completed.load(Ordering::Relaxed) as u32,
            steps_failed: self.inner.steps_failed.load(Ordering::Relaxed) as u32,
            uptime_ms: self.inner.started_at.elapsed().as_millis() as u64,
        }))
    }

    type WatchStream = UnboundedReceiverStream<Result<proto::RunEvent, Status>>;

    async fn watch(
        &self,
        _request: Request<proto::WatchRequest>,
    ) -> Result<Response<Self::WatchStream>, Status> {
        let mut events = self.inner.events.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if tx.send(Ok(proto::RunEvent::from(&event))).is_err() {
                            break;
                        }
                    }
                    // Dropped events on a slow watcher; keep streaming.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Response::new(UnboundedReceiverStream::new(rx)))
    }

    async fn shutdown(
        &self,
        _request: Request<proto::ShutdownRequest>,
    ) -> Result<Response<proto::ShutdownResponse>, Status> {
        self.inner.shutdown.send_replace(true);
        Ok(Response::new(proto::ShutdownResponse { accepted: true }))
    }
}

impl From<&ExecutionEvent> for proto::RunEvent {
    fn from(event: &ExecutionEvent) -> Self {
        let mut out = proto::RunEvent {
            kind: event.kind().to_string(),
            step_name: String::new(),
            output: String::new(),
            is_error: false,
            exit_code: None,
            status: String::new(),
        };

        match event {
            ExecutionEvent::PipelineStarted { pipeline_name, .. } => {
                out.output = pipeline_name.clone();
            }
            ExecutionEvent::StepStarted { step_name, .. } => {
                out.step_name = step_name.clone();
            }
            ExecutionEvent::StepOutput {
                step_name,
                output,
                is_error,
                ..
            } => {
                out.step_name = step_name.clone();
                out.output = output.clone();
                out.is_error = *is_error;
            }
            ExecutionEvent::StepCompleted { result, .. } => {
                out.step_name = result.step_name.clone();
                out.status = result.status.as_str().to_string();
                out.exit_code = result.exit_code;
            }
            ExecutionEvent::StepSkipped {
                step_name, reason, ..
            } => {
                out.step_name = step_name.clone();
                out.output = reason.clone();
                out.status = StepStatus::Skipped.as_str().to_string();
            }
            ExecutionEvent::PipelineCompleted { success, .. } => {
                out.status = if *success { "succeeded" } else { "failed" }.to_string();
            }
        }

        out
    }
}
