//! Single-attempt process spawning behind the `CommandRunner` seam

use crate::error::ExecError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Output of a single attempt
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process exited successfully
    pub error: Option<ExecError>,
}

impl AttemptOutcome {
    pub fn completed(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: None,
        }
    }

    pub fn failed(error: ExecError, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs one attempt of an external command
///
/// Implementations must never go through a shell and must not outlive
/// `timeout`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
        timeout: Duration,
    ) -> AttemptOutcome;
}

/// Spawns real processes with tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
        limit: Duration,
    ) -> AttemptOutcome {
        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        // Capture output, close stdin to prevent blocking, and make sure a
        // timed-out child is killed when its future is dropped
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::trace!("Spawning: {:?}", cmd);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to spawn {}: {}", program, e);
                return AttemptOutcome::failed(ExecError::spawn(program, &e), "", "");
            }
        };

        match timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();

                if output.status.success() {
                    AttemptOutcome::completed(stdout, stderr)
                } else {
                    let error = ExecError::ExitFailure {
                        code: output.status.code().unwrap_or(-1),
                        stderr: stderr.trim().to_string(),
                    };
                    AttemptOutcome::failed(error, stdout, stderr)
                }
            }
            Ok(Err(e)) => AttemptOutcome::failed(ExecError::spawn(program, &e), "", ""),
            Err(_) => {
                let context = std::iter::once(program)
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ");
                AttemptOutcome::failed(
                    ExecError::Timeout {
                        timeout_seconds: limit.as_secs(),
                        context,
                    },
                    "",
                    "",
                )
            }
        }
    }
}
