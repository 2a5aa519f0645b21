//! The outcome of one invocation

use crate::command::{CommandCategory, CommandSpec};
use crate::error::ExecError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Result of executing a [`CommandSpec`]
///
/// Always returned by value, never thrown. A copy handed out from the cache
/// carries `cached = true` and `cache_hit = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,

    /// Wall time spent producing the result
    pub elapsed: Duration,

    /// Served from the cache rather than a fresh execution
    pub cached: bool,
    pub cache_hit: bool,

    pub category: CommandCategory,

    /// Full argument vector including the program
    pub command: Vec<String>,

    /// Number of executions made (0 when served from cache or rejected)
    pub attempts: u32,

    pub completed_at: DateTime<Utc>,

    /// Set for results produced by the queue worker
    pub job_id: Option<Uuid>,

    #[serde(skip)]
    pub(crate) error: Option<ExecError>,
}

impl ResultEnvelope {
    /// Successful execution
    pub fn success(
        spec: &CommandSpec,
        command: Vec<String>,
        stdout: String,
        stderr: String,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: true,
            stdout,
            stderr,
            exit_code: 0,
            elapsed,
            cached: false,
            cache_hit: false,
            category: spec.category(),
            command,
            attempts: 1,
            completed_at: Utc::now(),
            job_id: None,
            error: None,
        }
    }

    /// Failed execution; stderr carries the captured output or, when the
    /// process produced none, a description of the error
    pub fn failure(
        spec: &CommandSpec,
        command: Vec<String>,
        error: ExecError,
        stdout: String,
        stderr: String,
        elapsed: Duration,
    ) -> Self {
        let stderr = if stderr.trim().is_empty() {
            error.to_string()
        } else {
            stderr
        };

        Self {
            success: false,
            stdout,
            stderr,
            exit_code: error.exit_code(),
            elapsed,
            cached: false,
            cache_hit: false,
            category: spec.category(),
            command,
            attempts: 1,
            completed_at: Utc::now(),
            job_id: None,
            error: Some(error),
        }
    }

    /// Failure that happened before any process was spawned
    pub fn rejected(spec: &CommandSpec, command: Vec<String>, error: ExecError) -> Self {
        let mut envelope =
            Self::failure(spec, command, error, String::new(), String::new(), Duration::ZERO);
        envelope.attempts = 0;
        envelope
    }

    /// Defensive copy handed out on a cache hit
    pub(crate) fn as_cache_hit(&self) -> Self {
        let mut copy = self.clone();
        copy.cached = true;
        copy.cache_hit = true;
        copy.attempts = 0;
        copy.job_id = None;
        copy
    }

    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub(crate) fn with_job_id(mut self, job_id: Uuid) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// The error behind a failed result, when it came from this process
    pub fn error(&self) -> Option<&ExecError> {
        self.error.as_ref()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.error, Some(ExecError::Timeout { .. }))
    }

    /// stdout followed by stderr, for callers that only display output
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}
