//! Command descriptions: categories, specs, and execution context

use crate::error::ExecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Operation category of an external invocation
///
/// The category takes part in the cache key and selects the default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    Status,
    Diff,
    Log,
    Branch,
    Remote,
    Show,
    Config,
    Other,
}

impl CommandCategory {
    pub const ALL: [CommandCategory; 8] = [
        CommandCategory::Status,
        CommandCategory::Diff,
        CommandCategory::Log,
        CommandCategory::Branch,
        CommandCategory::Remote,
        CommandCategory::Show,
        CommandCategory::Config,
        CommandCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCategory::Status => "status",
            CommandCategory::Diff => "diff",
            CommandCategory::Log => "log",
            CommandCategory::Branch => "branch",
            CommandCategory::Remote => "remote",
            CommandCategory::Show => "show",
            CommandCategory::Config => "config",
            CommandCategory::Other => "other",
        }
    }

    /// Default cache TTL in seconds
    ///
    /// Working-tree queries go stale quickly; history and configuration
    /// change rarely within one session.
    pub fn default_ttl_seconds(&self) -> u64 {
        match self {
            CommandCategory::Status | CommandCategory::Diff => 5,
            CommandCategory::Branch => 10,
            CommandCategory::Log | CommandCategory::Show => 30,
            CommandCategory::Remote | CommandCategory::Config => 60,
            CommandCategory::Other => 5,
        }
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CommandCategory {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ExecError::Config(format!("unknown command category: {}", s)))
    }
}

/// Immutable description of one external invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    category: CommandCategory,
    args: Vec<String>,
    cache_ttl_seconds: u64,
    retry_count: u32,
    timeout_seconds: u64,
}

impl CommandSpec {
    pub const DEFAULT_RETRY_COUNT: u32 = 2;
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

    /// Create a spec with the category's default TTL, retry and timeout
    pub fn new<I, S>(category: CommandCategory, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            args: args.into_iter().map(Into::into).collect(),
            cache_ttl_seconds: category.default_ttl_seconds(),
            retry_count: Self::DEFAULT_RETRY_COUNT,
            timeout_seconds: Self::DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Set the cache TTL; zero disables caching for this spec
    pub fn with_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl_seconds = seconds;
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn category(&self) -> CommandCategory {
        self.category
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn cache_ttl_seconds(&self) -> u64 {
        self.cache_ttl_seconds
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Upper bound on executions made for this spec
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Timeout as a duration; a zero timeout is treated as one second
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn is_cacheable(&self) -> bool {
        self.cache_ttl_seconds > 0
    }
}

/// The context a command runs in
///
/// Two identical specs issued in different contexts must not share a cache
/// entry, so the fingerprint is part of every cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Working directory passed to spawned processes
    pub working_dir: Option<PathBuf>,

    /// Branch or other revision marker the caller is operating on
    pub branch: Option<String>,
}

impl ExecutionContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(working_dir.into()),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Stable string identifying this context
    pub fn fingerprint(&self) -> String {
        let dir = self
            .working_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        match &self.branch {
            Some(branch) => format!("{}@{}", dir, branch),
            None => dir,
        }
    }
}
