// Pipeline Executor
// Runs one pipeline's steps in order, reporting progress and lifecycle state

use crate::execution::events::{ExecutionEvent, ProgressSender};
use crate::execution::state::{RunnerState, StateHandle};
use crate::pipeline::models::{
    ExecutionContext, Pipeline, RunSummary, StepResult, StepStatus,
};
use crate::runners::{ShellRunner, StepRunner};
use crate::{ServiceError, ServiceResult};

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

pub struct PipelineExecutor {
    context: ExecutionContext,
    runner: Arc<dyn StepRunner>,
    progress: Option<ProgressSender>,
    state: StateHandle,
    shutdown: Option<watch::Receiver<bool>>,
}

impl PipelineExecutor {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            runner: Arc::new(ShellRunner::new()),
            progress: None,
            state: StateHandle::new(),
            shutdown: None,
        }
    }

    /// Replace the default shell runner with another step backend.
    pub fn with_runner(mut self, runner: Arc<dyn StepRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Honor an external shutdown request: the in-flight step finishes and
    /// the remaining steps are skipped.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Observe the runner's lifecycle state.
    pub fn state(&self) -> watch::Receiver<RunnerState> {
        self.state.subscribe()
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }

    /// Execute the pipeline to completion. Returns the run summary, or the
    /// execution error for the step that failed. Steps that fail with
    /// `continue_on_error` are recorded in the summary without aborting
    /// the run.
    pub async fn execute(&self, pipeline: &Pipeline) -> ServiceResult<RunSummary> {
        let start = Instant::now();
        let total_steps = pipeline.steps.len();

        self.emit(ExecutionEvent::PipelineStarted {
            pipeline_name: pipeline.name.clone(),
            total_steps,
        });

        // Pipeline env overlays the ambient context env; caller overrides
        // are applied per step by the runner and win over both.
        let mut run_context = self.context.clone();
        run_context.env.extend(pipeline.env.clone());

        self.state.set(RunnerState::Running);

        let mut results = Vec::with_capacity(total_steps);
        let mut failed_steps = 0;
        let mut interrupted = false;

        for (index, step) in pipeline.steps.iter().enumerate() {
            if self.shutdown_requested() {
                interrupted = true;
                self.emit(ExecutionEvent::StepSkipped {
                    step_name: step.name.clone(),
                    step_index: index,
                    reason: "shutdown requested".to_string(),
                });
                results.push(StepResult {
                    step_name: step.name.clone(),
                    status: StepStatus::Skipped,
                    output: String::new(),
                    error: None,
                    duration: std::time::Duration::ZERO,
                    exit_code: None,
                });
                continue;
            }

            self.emit(ExecutionEvent::StepStarted {
                step_name: step.name.clone(),
                step_index: index,
            });

            let step_start = Instant::now();
            let outcome = self
                .runner
                .run(step, index, &run_context, self.progress.as_ref())
                .await;

            let status = if outcome.succeeded() {
                StepStatus::Succeeded
            } else {
                StepStatus::Failed
            };

            let result = StepResult {
                step_name: step.name.clone(),
                status,
                output: outcome.stdout,
                error: if outcome.stderr.is_empty() {
                    None
                } else {
                    Some(outcome.stderr)
                },
                duration: step_start.elapsed(),
                exit_code: outcome.exit_code,
            };

            self.emit(ExecutionEvent::StepCompleted {
                result: result.clone(),
                step_index: index,
            });

            let failed = result.status == StepStatus::Failed;
            let exit_code = result.exit_code;
            results.push(result);

            if failed {
                failed_steps += 1;
                if !step.continue_on_error {
                    self.state.set(RunnerState::Failed);
                    self.emit(ExecutionEvent::PipelineCompleted {
                        pipeline_name: pipeline.name.clone(),
                        success: false,
                        failed_steps,
                        duration: start.elapsed(),
                    });
                    return Err(ServiceError::Execution {
                        step: step.name.clone(),
                        exit_code,
                    });
                }
            }
        }

        self.state.set(RunnerState::Completed);
        self.emit(ExecutionEvent::PipelineCompleted {
            pipeline_name: pipeline.name.clone(),
            success: failed_steps == 0,
            failed_steps,
            duration: start.elapsed(),
        });

        Ok(RunSummary {
            pipeline_name: pipeline.name.clone(),
            steps: results,
            duration: start.elapsed(),
            failed_steps,
            interrupted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::events::progress_channel;
    use crate::pipeline::models::{Step, StepAction};
    use std::collections::HashMap;

    fn step(name: &str, command: &str) -> Step {
        Step {
            name: name.to_string(),
            action: StepAction::Command(command.to_string()),
            env: HashMap::new(),
            continue_on_error: false,
        }
    }

    fn pipeline(name: &str, steps: Vec<Step>) -> Pipeline {
        Pipeline {
            name: name.to_string(),
            description: None,
            mode: Default::default(),
            env: HashMap::new(),
            steps,
        }
    }

    fn executor(name: &str) -> PipelineExecutor {
        let context = ExecutionContext::new(name, std::env::current_dir().unwrap());
        PipelineExecutor::new(context)
    }

    #[tokio::test]
    async fn test_execute_success() {
        let p = pipeline(
            "etl_daily",
            vec![step("extract", "echo extract"), step("load", "echo load")],
        );
        let executor = executor("etl_daily");
        let state = executor.state();

        let summary = executor.execute(&p).await.unwrap();

        assert!(summary.success());
        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.failed_steps, 0);
        assert!(!summary.interrupted);
        assert_eq!(*state.borrow(), RunnerState::Completed);
    }

    #[tokio::test]
    async fn test_execute_failure_stops_pipeline() {
        let p = pipeline(
            "etl_daily",
            vec![
                step("extract", "echo extract"),
                step("transform", "exit 7"),
                step("load", "echo load"),
            ],
        );
        let executor = executor("etl_daily");
        let state = executor.state();
        let (tx, mut rx) = progress_channel();
        let executor = executor.with_progress(tx);

        let err = executor.execute(&p).await.unwrap_err();

        match err {
            ServiceError::Execution { step, exit_code } => {
                assert_eq!(step, "transform");
                assert_eq!(exit_code, Some(7));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(*state.borrow(), RunnerState::Failed);

        // The step after the failure never started
        drop(executor);
        let mut started = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ExecutionEvent::StepStarted { step_name, .. } = event {
                started.push(step_name);
            }
        }
        assert_eq!(started, vec!["extract", "transform"]);
    }

    #[tokio::test]
    async fn test_continue_on_error() {
        let mut tolerated = step("lint", "exit 1");
        tolerated.continue_on_error = true;

        let p = pipeline(
            "etl_daily",
            vec![tolerated, step("load", "echo load")],
        );
        let executor = executor("etl_daily");
        let state = executor.state();

        let summary = executor.execute(&p).await.unwrap();

        assert_eq!(summary.failed_steps, 1);
        assert!(!summary.success());
        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.steps[1].status, StepStatus::Succeeded);
        assert_eq!(*state.borrow(), RunnerState::Completed);
    }

    #[tokio::test]
    async fn test_event_order() {
        let p = pipeline("etl_daily", vec![step("only", "echo hi")]);
        let (tx, mut rx) = progress_channel();
        let executor = executor("etl_daily").with_progress(tx);

        executor.execute(&p).await.unwrap();
        drop(executor);

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec![
                "pipeline_started",
                "step_started",
                "step_output",
                "step_completed",
                "pipeline_completed",
            ]
        );
    }

    #[tokio::test]
    async fn test_pipeline_env_reaches_steps() {
        let mut p = pipeline("etl_daily", vec![step("env", "echo $SOURCE")]);
        p.env.insert("SOURCE".to_string(), "mongodb".to_string());

        let summary = executor("etl_daily").execute(&p).await.unwrap();
        assert!(summary.steps[0].output.contains("mongodb"));
    }

    #[tokio::test]
    async fn test_env_overrides_beat_definition_env() {
        let mut s = step("env", "echo $SOURCE");
        s.env.insert("SOURCE".to_string(), "step-level".to_string());
        let mut p = pipeline("etl_daily", vec![s]);
        p.env.insert("SOURCE".to_string(), "mongodb".to_string());

        let mut overrides = HashMap::new();
        overrides.insert("SOURCE".to_string(), "postgres".to_string());
        let context = ExecutionContext::new("etl_daily", std::env::current_dir().unwrap())
            .with_overrides(overrides);

        let summary = PipelineExecutor::new(context).execute(&p).await.unwrap();
        assert!(summary.steps[0].output.contains("postgres"));
    }

    #[tokio::test]
    async fn test_shutdown_before_start_skips_all_steps() {
        let p = pipeline(
            "etl_daily",
            vec![step("extract", "echo extract"), step("load", "echo load")],
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(true);
        let executor = executor("etl_daily").with_shutdown(shutdown_rx);
        let state = executor.state();

        let summary = executor.execute(&p).await.unwrap();
        drop(shutdown_tx);

        assert!(summary.interrupted);
        assert!(summary
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Skipped));
        assert_eq!(*state.borrow(), RunnerState::Completed);
    }

    #[tokio::test]
    async fn test_shutdown_lets_in_flight_step_finish() {
        let p = pipeline(
            "etl_daily",
            vec![step("slow", "sleep 0.3 && echo done"), step("late", "echo late")],
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let executor = executor("etl_daily").with_shutdown(shutdown_rx);
        let handle = tokio::spawn(async move { executor.execute(&p).await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let summary = handle.await.unwrap().unwrap();
        assert!(summary.interrupted);
        assert_eq!(summary.steps[0].status, StepStatus::Succeeded);
        assert!(summary.steps[0].output.contains("done"));
        assert_eq!(summary.steps[1].status, StepStatus::Skipped);
    }
}
