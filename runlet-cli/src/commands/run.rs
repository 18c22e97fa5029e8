use crate::output;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use runlet_service::{
    config::parse_mode, progress_channel, ControlService, ExecutionContext, ExecutionEvent,
    ExecutionMode, PipelineExecutor, PipelineValidator, RunnerConfig, ServiceError,
};
use tokio::sync::watch;

/// Execute a pipeline, once or as a resident service
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Pipeline identifier, or a path to a definition file.
    /// Falls back to $RUNLET_PIPELINE.
    pub pipeline: Option<String>,

    /// Execution mode override: once or service
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Control port for service mode
    #[arg(long, short = 'p', value_name = "PORT")]
    pub port: Option<u16>,

    /// Directory holding pipeline definitions
    #[arg(long, value_name = "DIR")]
    pub pipelines_dir: Option<PathBuf>,

    /// Working directory for execution
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Set an environment variable for the run, overriding any value the
    /// definition sets (can be repeated)
    #[arg(long = "env", short = 'e', value_name = "NAME=VALUE")]
    pub env: Vec<String>,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            output::error(&format!("{}", e));
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(args: RunArgs) -> Result<(), ServiceError> {
    let config = RunnerConfig::from_env()?;

    let pipeline_id = args
        .pipeline
        .or_else(|| config.pipeline.clone())
        .ok_or_else(|| {
            ServiceError::configuration(
                "no pipeline specified (pass an identifier or set RUNLET_PIPELINE)",
            )
        })?;

    // Parse -e overrides before touching the registry
    let mut vars = HashMap::new();
    for var in &args.env {
        let (name, value) = var.split_once('=').ok_or_else(|| {
            ServiceError::configuration(format!(
                "invalid environment override '{}' (expected name=value)",
                var
            ))
        })?;
        vars.insert(name.to_string(), value.to_string());
    }

    let registry = super::registry(args.pipelines_dir, &config)?;

    output::status("Resolving", &pipeline_id);
    let pipeline = registry.load(&pipeline_id)?;

    if let Err(errors) = PipelineValidator::validate(&pipeline) {
        for error in &errors {
            output::error(&format!("{}", error));
        }
        return Err(ServiceError::configuration(format!(
            "pipeline '{}' failed validation with {} error(s)",
            pipeline.name,
            errors.len()
        )));
    }

    // Mode precedence: flag, then environment, then the definition itself
    let mode = match &args.mode {
        Some(flag) => parse_mode(flag)?,
        None => config.mode.unwrap_or(pipeline.mode),
    };

    let working_dir = match args.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    output::info(&format!(
        "Pipeline '{}': {} steps, {} mode",
        pipeline.name,
        pipeline.steps.len(),
        match mode {
            ExecutionMode::Once => "run-once",
            ExecutionMode::Service => "service",
        }
    ));

    let context =
        ExecutionContext::new(pipeline.name.clone(), working_dir).with_overrides(vars);

    let (progress_tx, mut progress_rx) = progress_channel();
    let mut executor = PipelineExecutor::new(context).with_progress(progress_tx);

    // Bind the control endpoint before the first step runs
    let control = if mode == ExecutionMode::Service {
        let control = ControlService::new(pipeline.name.clone(), executor.state());
        executor = executor.with_shutdown(control.shutdown_receiver());

        let addr: SocketAddr = ([0, 0, 0, 0], args.port.unwrap_or(config.control_port)).into();
        output::info(&format!("Control endpoint on {}", addr));

        let server = control.clone();
        tokio::spawn(async move {
            if let Err(e) = server.serve(addr).await {
                output::error(&format!("control endpoint failed: {}", e));
            }
        });

        let signal_target = control.clone();
        spawn_signal_handler(move || signal_target.request_shutdown());
        Some(control)
    } else {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        executor = executor.with_shutdown(shutdown_rx);
        spawn_signal_handler(move || {
            shutdown_tx.send_replace(true);
        });
        None
    };

    let total_steps = pipeline.steps.len();
    let exec_handle = tokio::spawn(async move { executor.execute(&pipeline).await });

    // Render events in the foreground, feeding the control service as we go
    while let Some(event) = progress_rx.recv().await {
        if let Some(control) = &control {
            control.record(&event);
        }
        render_event(&event, total_steps);
    }

    let result = exec_handle
        .await
        .map_err(|e| ServiceError::configuration(format!("executor task panicked: {}", e)))?;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => return Err(e),
    };

    if summary.interrupted {
        output::warning("Run interrupted by shutdown request");
    }

    // In service mode the process stays resident until a shutdown request,
    // with health reporting the terminal state.
    if let Some(control) = &control {
        if !summary.interrupted {
            output::dim("Staying resident; waiting for shutdown request");
            control.wait_for_shutdown().await;
        }
        output::dim("Shutting down; control port released");
    }

    Ok(())
}

/// Forward SIGINT/SIGTERM into the shutdown flag so the in-flight step can
/// finish before the process exits.
fn spawn_signal_handler<F>(on_signal: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    output::error(&format!("failed to install SIGTERM handler: {}", e));
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        on_signal();
    });
}

fn render_event(event: &ExecutionEvent, total_steps: usize) {
    match event {
        ExecutionEvent::PipelineStarted {
            pipeline_name,
            total_steps,
        } => {
            output::header(&format!(
                "Pipeline '{}' ({} steps)",
                pipeline_name, total_steps
            ));
        }

        ExecutionEvent::StepStarted {
            step_name,
            step_index,
        } => {
            output::step_started(*step_index, total_steps, step_name);
        }

        ExecutionEvent::StepOutput {
            output, is_error, ..
        } => {
            if *is_error {
                output::step_error(output);
            } else {
                output::step_output(output);
            }
        }

        ExecutionEvent::StepCompleted { result, .. } => {
            output::step_finished(result.status, result.duration, result.exit_code);
        }

        ExecutionEvent::StepSkipped {
            step_name, reason, ..
        } => {
            output::warning(&format!("  {} skipped: {}", step_name, reason));
        }

        ExecutionEvent::PipelineCompleted {
            success,
            failed_steps,
            duration,
            ..
        } => {
            println!();
            if *success {
                output::success(&format!(
                    "Pipeline completed successfully in {:.2}s",
                    duration.as_secs_f64()
                ));
            } else {
                output::failure(&format!(
                    "Pipeline failed after {:.2}s ({} failed step(s))",
                    duration.as_secs_f64(),
                    failed_steps
                ));
            }
        }
    }
}
