//! Optional YAML settings file layered over environment configuration

use anyhow::{Context, Result};
use hookcache_core::ManagerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fields a settings file may override; all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub program: Option<String>,
    pub max_concurrency: Option<usize>,
    pub cache_max_entries: Option<usize>,
    pub eviction_threshold: Option<f64>,
    pub max_queue_size: Option<usize>,
    pub retry_base_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,
    pub shutdown_timeout_ms: Option<u64>,
    pub working_dir: Option<PathBuf>,
    pub branch: Option<String>,
}

impl Settings {
    /// `<config_dir>/hookcache/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hookcache").join("config.yaml"))
    }

    /// Load settings from `path`, or from the default location if it exists
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file yields empty settings.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {:?}", path))
    }

    /// Overlay these settings on `config`
    pub fn apply(&self, mut config: ManagerConfig) -> ManagerConfig {
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if let Some(n) = self.max_concurrency {
            config.max_concurrency = n;
        }
        if let Some(n) = self.cache_max_entries {
            config.cache.max_entries = n;
        }
        if let Some(threshold) = self.eviction_threshold {
            config.cache.eviction_threshold = threshold;
        }
        if let Some(n) = self.max_queue_size {
            config.max_queue_size = n;
        }
        if let Some(ms) = self.retry_base_delay_ms {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry_max_delay_ms {
            config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.shutdown_timeout_ms {
            config.shutdown_timeout = Duration::from_millis(ms);
        }
        if let Some(dir) = &self.working_dir {
            config.context.working_dir = Some(dir.clone());
        }
        if let Some(branch) = &self.branch {
            config.context.branch = Some(branch.clone());
        }
        config
    }
}
