//! Configuration for the command manager

use crate::cache::CacheConfig;
use crate::command::ExecutionContext;
use crate::error::{ExecError, Result};
use crate::executor::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a [`CommandManager`](crate::CommandManager)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Executable every spec runs against
    pub program: String,

    /// Maximum number of external processes alive at once
    pub max_concurrency: usize,

    /// Result cache limits
    pub cache: CacheConfig,

    /// Retry and backoff behaviour
    pub retry: RetryPolicy,

    /// Queued items beyond this many are dropped
    pub max_queue_size: usize,

    /// How long the queue worker waits for an item before checking for
    /// shutdown
    pub queue_poll_interval: Duration,

    /// Bound on joining the queue worker and in-flight work at shutdown
    pub shutdown_timeout: Duration,

    /// Working directory and branch; part of every cache key
    pub context: ExecutionContext,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            max_concurrency: 4,
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
            max_queue_size: 1_000,
            queue_poll_interval: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(5),
            context: ExecutionContext::default(),
        }
    }
}

impl ManagerConfig {
    /// Create a new builder for manager configuration
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(ExecError::Config("program must not be empty".to_string()));
        }

        if self.max_concurrency == 0 {
            return Err(ExecError::Config(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.max_queue_size == 0 {
            return Err(ExecError::Config(
                "max_queue_size must be greater than 0".to_string(),
            ));
        }

        if self.queue_poll_interval.is_zero() {
            return Err(ExecError::Config(
                "queue_poll_interval must be greater than 0".to_string(),
            ));
        }

        self.cache.validate()?;
        self.retry.validate()
    }

    /// Defaults overlaid with `HOOKCACHE_*` environment variables
    ///
    /// A `.env` file in the current directory is loaded first when present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Some(program) = env_value::<String>("HOOKCACHE_PROGRAM")? {
            config.program = program;
        }
        if let Some(n) = env_value("HOOKCACHE_MAX_CONCURRENCY")? {
            config.max_concurrency = n;
        }
        if let Some(n) = env_value("HOOKCACHE_CACHE_MAX_ENTRIES")? {
            config.cache.max_entries = n;
        }
        if let Some(n) = env_value("HOOKCACHE_MAX_QUEUE_SIZE")? {
            config.max_queue_size = n;
        }
        if let Some(ms) = env_value("HOOKCACHE_RETRY_BASE_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_value("HOOKCACHE_SHUTDOWN_TIMEOUT_MS")? {
            config.shutdown_timeout = Duration::from_millis(ms);
        }
        if let Some(dir) = env_value::<PathBuf>("HOOKCACHE_WORKDIR")? {
            config.context.working_dir = Some(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Hook-path defaults: few processes, quick shutdown
    pub fn interactive() -> Self {
        Self {
            max_concurrency: 2,
            max_queue_size: 100,
            shutdown_timeout: Duration::from_secs(1),
            retry: RetryPolicy {
                base_delay: Duration::from_millis(50),
                max_delay: Duration::from_millis(500),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Long-running defaults: deeper queue and larger cache
    pub fn background() -> Self {
        Self {
            max_concurrency: 8,
            max_queue_size: 10_000,
            cache: CacheConfig::new(10_000),
            shutdown_timeout: Duration::from_secs(30),
            ..Default::default()
        }
    }
}

fn env_value<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ExecError::Config(format!("invalid value for {}: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Builder for manager configuration with validation
#[derive(Debug, Default)]
pub struct ManagerConfigBuilder {
    program: Option<String>,
    max_concurrency: Option<usize>,
    cache: Option<CacheConfig>,
    retry: Option<RetryPolicy>,
    max_queue_size: Option<usize>,
    queue_poll_interval: Option<Duration>,
    shutdown_timeout: Option<Duration>,
    context: Option<ExecutionContext>,
}

impl ManagerConfigBuilder {
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Shorthand for a cache with the default eviction threshold
    pub fn cache_max_entries(mut self, max_entries: usize) -> Self {
        self.cache = Some(CacheConfig::new(max_entries));
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn max_queue_size(mut self, n: usize) -> Self {
        self.max_queue_size = Some(n);
        self
    }

    pub fn queue_poll_interval(mut self, interval: Duration) -> Self {
        self.queue_poll_interval = Some(interval);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(ExecutionContext {
            working_dir: Some(dir.into()),
            ..context
        });
        self
    }

    /// Build the manager configuration
    pub fn build(self) -> ManagerConfig {
        let defaults = ManagerConfig::default();

        ManagerConfig {
            program: self.program.unwrap_or(defaults.program),
            max_concurrency: self.max_concurrency.unwrap_or(defaults.max_concurrency),
            cache: self.cache.unwrap_or(defaults.cache),
            retry: self.retry.unwrap_or(defaults.retry),
            max_queue_size: self.max_queue_size.unwrap_or(defaults.max_queue_size),
            queue_poll_interval: self
                .queue_poll_interval
                .unwrap_or(defaults.queue_poll_interval),
            shutdown_timeout: self.shutdown_timeout.unwrap_or(defaults.shutdown_timeout),
            context: self.context.unwrap_or(defaults.context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.program, "git");
        assert_eq!(config.max_concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ManagerConfig::default();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = ManagerConfig::default();
        config.program = "  ".into();
        assert!(config.validate().is_err());

        let mut config = ManagerConfig::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = ManagerConfig::default();
        config.retry.multiplier = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ManagerConfig::builder()
            .program("hg")
            .max_concurrency(2)
            .cache_max_entries(50)
            .working_dir("/repo")
            .context(ExecutionContext::new("/other").with_branch("dev"))
            .working_dir("/repo")
            .build();

        assert_eq!(config.program, "hg");
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.context.working_dir, Some(PathBuf::from("/repo")));
        assert_eq!(config.context.branch.as_deref(), Some("dev"));
    }

    #[test]
    fn test_preset_configs() {
        assert!(ManagerConfig::interactive().validate().is_ok());
        assert_eq!(ManagerConfig::interactive().max_concurrency, 2);
        assert!(ManagerConfig::background().validate().is_ok());
        assert_eq!(ManagerConfig::background().cache.max_entries, 10_000);
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("HOOKCACHE_MAX_CONCURRENCY", "7");
        std::env::set_var("HOOKCACHE_RETRY_BASE_DELAY_MS", "25");
        let config = ManagerConfig::from_env().unwrap();
        assert_eq!(config.max_concurrency, 7);
        assert_eq!(config.retry.base_delay, Duration::from_millis(25));

        std::env::set_var("HOOKCACHE_MAX_CONCURRENCY", "seven");
        assert!(matches!(
            ManagerConfig::from_env(),
            Err(ExecError::Config(_))
        ));

        std::env::remove_var("HOOKCACHE_MAX_CONCURRENCY");
        std::env::remove_var("HOOKCACHE_RETRY_BASE_DELAY_MS");
    }
}
