// Shell Runner
// Executes command and script steps through a system shell

use crate::execution::events::{ExecutionEvent, ProgressSender};
use crate::pipeline::models::{ExecutionContext, Step, StepAction};
use crate::runners::{StepOutcome, StepRunner};

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Shell types supported by the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shell {
    /// Default shell (sh on Unix, cmd on Windows)
    Default,
    /// Bash, resolved through PATH
    Bash,
    /// Any other shell named in the step, invoked with -c
    Other(String),
}

impl Shell {
    /// Map the optional shell name from a step definition.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            None | Some("sh") | Some("default") => Shell::Default,
            Some("bash") => Shell::Bash,
            Some(other) => Shell::Other(other.to_string()),
        }
    }

    /// Get the shell executable and its script argument
    fn get_command(&self) -> (String, &'static str) {
        match self {
            Shell::Default => {
                if cfg!(target_os = "windows") {
                    ("cmd".to_string(), "/C")
                } else {
                    ("sh".to_string(), "-c")
                }
            }
            Shell::Bash => {
                // Fall back to the default shell when bash is not on PATH
                if which::which("bash").is_ok() {
                    ("bash".to_string(), "-c")
                } else {
                    Shell::Default.get_command()
                }
            }
            Shell::Other(name) => (name.clone(), "-c"),
        }
    }
}

/// Shell runner for executing pipeline steps
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    /// Execute a script with a specific shell, streaming output lines as
    /// progress events.
    async fn run_with_shell(
        &self,
        shell: Shell,
        script: &str,
        env: &HashMap<String, String>,
        working_dir: &Path,
        step_name: &str,
        step_index: usize,
        progress: Option<&ProgressSender>,
    ) -> StepOutcome {
        let (shell_cmd, script_arg) = shell.get_command();

        let mut cmd = Command::new(&shell_cmd);
        cmd.arg(script_arg);
        cmd.arg(script);
        cmd.current_dir(working_dir);
        cmd.envs(env);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return StepOutcome {
                    stdout: String::new(),
                    stderr: format!("Failed to spawn shell process '{}': {}", shell_cmd, e),
                    exit_code: None,
                };
            }
        };

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let stdout_reader = BufReader::new(stdout);
        let stderr_reader = BufReader::new(stderr);

        let stdout_progress = progress.cloned();
        let stdout_name = step_name.to_string();
        let stdout_handle = tokio::spawn(async move {
            let mut lines = stdout_reader.lines();
            let mut output = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(tx) = &stdout_progress {
                    let _ = tx.send(ExecutionEvent::StepOutput {
                        step_name: stdout_name.clone(),
                        step_index,
                        output: line.clone(),
                        is_error: false,
                    });
                }
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(&line);
            }
            output
        });

        let stderr_progress = progress.cloned();
        let stderr_name = step_name.to_string();
        let stderr_handle = tokio::spawn(async move {
            let mut lines = stderr_reader.lines();
            let mut output = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(tx) = &stderr_progress {
                    let _ = tx.send(ExecutionEvent::StepOutput {
                        step_name: stderr_name.clone(),
                        step_index,
                        output: line.clone(),
                        is_error: true,
                    });
                }
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(&line);
            }
            output
        });

        let exit_code = child.wait().await.ok().and_then(|s| s.code());
        let stdout = stdout_handle.await.unwrap_or_default();
        let stderr = stderr_handle.await.unwrap_or_default();

        StepOutcome {
            stdout,
            stderr,
            exit_code,
        }
    }
}

#[async_trait]
impl StepRunner for ShellRunner {
    async fn run(
        &self,
        step: &Step,
        step_index: usize,
        context: &ExecutionContext,
        progress: Option<&ProgressSender>,
    ) -> StepOutcome {
        let (shell, script) = match &step.action {
            StepAction::Command(cmd) => (Shell::Default, cmd.as_str()),
            StepAction::Shell { shell, script } => {
                (Shell::from_name(shell.as_deref()), script.as_str())
            }
        };

        // Env layering: step overlays the pipeline env, caller overrides win
        let mut env = context.env.clone();
        env.extend(step.env.clone());
        env.extend(context.overrides.clone());

        self.run_with_shell(
            shell,
            script,
            &env,
            &context.working_dir,
            &step.name,
            step_index,
            progress,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::events::progress_channel;

    fn step(name: &str, command: &str) -> Step {
        Step {
            name: name.to_string(),
            action: StepAction::Command(command.to_string()),
            env: HashMap::new(),
            continue_on_error: false,
        }
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new("test", std::env::current_dir().unwrap())
    }

    #[tokio::test]
    async fn test_run_echo() {
        let runner = ShellRunner::new();
        let outcome = runner
            .run(&step("echo", "echo hello"), 0, &context(), None)
            .await;

        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.succeeded());
        assert!(outcome.stdout.contains("hello"));
        assert!(outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_run_with_env() {
        let runner = ShellRunner::new();
        let mut s = step("env", if cfg!(target_os = "windows") {
            "echo %MY_VAR%"
        } else {
            "echo $MY_VAR"
        });
        s.env.insert("MY_VAR".to_string(), "test_value".to_string());

        let outcome = runner.run(&s, 0, &context(), None).await;

        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.stdout.contains("test_value"));
    }

    #[tokio::test]
    async fn test_override_env_wins_over_step_env() {
        let runner = ShellRunner::new();
        let mut s = step("env", if cfg!(target_os = "windows") {
            "echo %MY_VAR%"
        } else {
            "echo $MY_VAR"
        });
        s.env.insert("MY_VAR".to_string(), "from-step".to_string());

        let mut overrides = HashMap::new();
        overrides.insert("MY_VAR".to_string(), "from-caller".to_string());
        let context = context().with_overrides(overrides);

        let outcome = runner.run(&s, 0, &context, None).await;

        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.stdout.contains("from-caller"));
    }

    #[tokio::test]
    async fn test_run_exit_code() {
        let runner = ShellRunner::new();
        let outcome = runner.run(&step("fail", "exit 42"), 0, &context(), None).await;

        assert_eq!(outcome.exit_code, Some(42));
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn test_run_stderr() {
        let runner = ShellRunner::new();
        let outcome = runner
            .run(&step("warn", "echo warning >&2"), 0, &context(), None)
            .await;

        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.stderr.contains("warning"));
    }

    #[tokio::test]
    async fn test_output_is_streamed() {
        let runner = ShellRunner::new();
        let (tx, mut rx) = progress_channel();

        let outcome = runner
            .run(&step("stream", "echo one && echo two"), 3, &context(), Some(&tx))
            .await;
        drop(tx);

        assert_eq!(outcome.exit_code, Some(0));

        let mut lines = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ExecutionEvent::StepOutput {
                output,
                step_index,
                is_error,
                ..
            } = event
            {
                assert_eq!(step_index, 3);
                assert!(!is_error);
                lines.push(output);
            }
        }
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_shell_script_step() {
        let runner = ShellRunner::new();
        let s = Step {
            name: "script".to_string(),
            action: StepAction::Shell {
                shell: Some("bash".to_string()),
                script: "echo from-script".to_string(),
            },
            env: HashMap::new(),
            continue_on_error: false,
        };

        let outcome = runner.run(&s, 0, &context(), None).await;
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.stdout.contains("from-script"));
    }

    #[test]
    fn test_shell_from_name() {
        assert_eq!(Shell::from_name(None), Shell::Default);
        assert_eq!(Shell::from_name(Some("sh")), Shell::Default);
        assert_eq!(Shell::from_name(Some("bash")), Shell::Bash);
        assert_eq!(
            Shell::from_name(Some("zsh")),
            Shell::Other("zsh".to_string())
        );
    }
}
