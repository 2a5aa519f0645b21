//! Process execution with timeout and retry/backoff
//!
//! [`Executor::run`] never fails: every outcome, including exhausted
//! retries, comes back as a [`ResultEnvelope`]. At most
//! `spec.retry_count() + 1` attempts are made, and the delays slept between
//! them never shrink.

pub mod backoff;
pub mod runner;

pub use backoff::{Backoff, RetryPolicy};
pub use runner::{AttemptOutcome, CommandRunner, ProcessRunner};

use crate::command::CommandSpec;
use crate::envelope::ResultEnvelope;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Runs specs against one program, retrying failed attempts
pub struct Executor {
    runner: Arc<dyn CommandRunner>,
    program: String,
    working_dir: Option<PathBuf>,
    policy: RetryPolicy,
    retries: AtomicU64,
}

impl Executor {
    /// Executor spawning real processes
    pub fn new(program: impl Into<String>, working_dir: Option<PathBuf>, policy: RetryPolicy) -> Self {
        Self::with_runner(Arc::new(ProcessRunner), program, working_dir, policy)
    }

    pub fn with_runner(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        working_dir: Option<PathBuf>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            working_dir,
            policy,
            retries: AtomicU64::new(0),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Total retries performed over the executor's lifetime
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Full argument vector for a spec, program first
    pub fn command_line(&self, spec: &CommandSpec) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(spec.args().iter().cloned())
            .collect()
    }

    /// Execute a spec with its retry budget
    pub async fn run(&self, spec: &CommandSpec) -> ResultEnvelope {
        let command = self.command_line(spec);
        let started = Instant::now();
        let max_attempts = spec.max_attempts();
        let mut backoff = self.policy.backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(
                "Executing {} (attempt {}/{})",
                command.join(" "),
                attempt,
                max_attempts
            );

            let outcome = self
                .runner
                .run(
                    &self.program,
                    spec.args(),
                    self.working_dir.as_deref(),
                    spec.timeout(),
                )
                .await;

            let error = match outcome.error {
                None => {
                    debug!("Command completed in {:?}", started.elapsed());
                    return ResultEnvelope::success(
                        spec,
                        command,
                        outcome.stdout,
                        outcome.stderr,
                        started.elapsed(),
                    )
                    .with_attempts(attempt);
                }
                Some(error) => error,
            };

            if attempt >= max_attempts || !self.policy.allows_retry(&error) {
                warn!(
                    "{} failed after {} attempt(s): {}",
                    command.join(" "),
                    attempt,
                    error
                );
                return ResultEnvelope::failure(
                    spec,
                    command,
                    error,
                    outcome.stdout,
                    outcome.stderr,
                    started.elapsed(),
                )
                .with_attempts(attempt);
            }

            let delay = backoff.next_delay();
            warn!(
                "{} failed (attempt {}/{}): {}; retrying after {:?}",
                command.join(" "),
                attempt,
                max_attempts,
                error,
                delay
            );
            self.retries.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(delay).await;
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("program", &self.program)
            .field("working_dir", &self.working_dir)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
