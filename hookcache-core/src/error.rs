//! Error types for command execution
//!
//! These errors never cross the [`CommandManager`](crate::CommandManager)
//! execution boundary: every execution path folds them into a
//! [`ResultEnvelope`](crate::ResultEnvelope). They are returned as `Err` only
//! from construction and configuration.

use std::io;
use thiserror::Error;

/// Main error type for command execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The process ran longer than its timeout and was killed
    #[error("Command timed out after {timeout_seconds}s: {context}")]
    Timeout {
        timeout_seconds: u64,
        context: String,
    },

    /// The process ran to completion with a non-zero exit status
    #[error("Command exited with status {code}: {stderr}")]
    ExitFailure { code: i32, stderr: String },

    /// The process could not be launched at all
    #[error("Failed to spawn '{program}': {reason}")]
    Spawn {
        program: String,
        reason: String,
        kind: io::ErrorKind,
    },

    /// The concurrency gate is closed (manager shutting down)
    #[error("Concurrency gate is closed: manager is shutting down")]
    GateClosed,

    /// A dispatched task could not be scheduled or was lost
    #[error("Scheduling error: {0}")]
    Scheduling(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for construction and configuration
pub type Result<T> = std::result::Result<T, ExecError>;

impl ExecError {
    /// Build a spawn error from the I/O failure returned by the OS
    pub fn spawn(program: impl Into<String>, err: &io::Error) -> Self {
        ExecError::Spawn {
            program: program.into(),
            reason: err.to_string(),
            kind: err.kind(),
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecError::Timeout { .. } | ExecError::ExitFailure { .. } => true,
            ExecError::Spawn { .. } => !self.is_permanent_spawn_failure(),
            ExecError::GateClosed | ExecError::Scheduling(_) | ExecError::Config(_) => false,
        }
    }

    /// Spawn failures no retry can fix: missing executable, no permission
    pub fn is_permanent_spawn_failure(&self) -> bool {
        matches!(
            self,
            ExecError::Spawn {
                kind: io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied,
                ..
            }
        )
    }

    /// Exit code reported in a failure envelope
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::ExitFailure { code, .. } => *code,
            _ => -1,
        }
    }
}

impl From<String> for ExecError {
    fn from(s: String) -> Self {
        ExecError::Config(s)
    }
}

impl From<&str> for ExecError {
    fn from(s: &str) -> Self {
        ExecError::Config(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let timeout_error = ExecError::Timeout {
            timeout_seconds: 5,
            context: "git status".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 5s"));

        let exit_error = ExecError::ExitFailure {
            code: 128,
            stderr: "not a git repository".to_string(),
        };
        assert!(exit_error.to_string().contains("status 128"));
        assert_eq!(exit_error.exit_code(), 128);

        assert!(ExecError::GateClosed.to_string().contains("shutting down"));
    }

    #[test]
    fn test_retry_classification() {
        let missing = ExecError::spawn(
            "git",
            &io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        );
        assert!(missing.is_permanent_spawn_failure());
        assert!(!missing.is_retryable());
        assert_eq!(missing.exit_code(), -1);

        let interrupted = ExecError::spawn(
            "git",
            &io::Error::new(io::ErrorKind::Interrupted, "interrupted"),
        );
        assert!(interrupted.is_retryable());

        assert!(ExecError::Timeout {
            timeout_seconds: 1,
            context: String::new()
        }
        .is_retryable());
        assert!(!ExecError::GateClosed.is_retryable());
    }

    #[test]
    fn test_error_conversion() {
        let error: ExecError = "bad value".into();
        assert!(matches!(error, ExecError::Config(_)));

        let error: ExecError = "bad value".to_string().into();
        assert!(matches!(error, ExecError::Config(_)));
    }
}
