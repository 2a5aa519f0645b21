//! Batch files: a YAML list of command definitions
//!
//! ```yaml
//! - category: status
//!   args: [status, --porcelain]
//! - category: log
//!   args: [log, -5, --oneline]
//!   ttl_seconds: 60
//!   retries: 0
//! ```

use anyhow::{Context, Result};
use hookcache_core::{CommandCategory, CommandSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One command in a batch file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub category: CommandCategory,
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl BatchEntry {
    pub fn to_spec(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(self.category, self.args.iter().cloned());
        if let Some(ttl) = self.ttl_seconds {
            spec = spec.with_ttl(ttl);
        }
        if let Some(retries) = self.retries {
            spec = spec.with_retries(retries);
        }
        if let Some(timeout) = self.timeout_seconds {
            spec = spec.with_timeout(timeout);
        }
        spec
    }
}

/// Parse batch YAML into specs, preserving order
pub fn parse_batch(yaml: &str) -> Result<Vec<CommandSpec>> {
    let entries: Vec<BatchEntry> = serde_yaml::from_str(yaml).context("Invalid batch file")?;
    Ok(entries.iter().map(BatchEntry::to_spec).collect())
}

pub fn load_batch(path: &Path) -> Result<Vec<CommandSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {:?}", path))?;
    parse_batch(&content).with_context(|| format!("Failed to parse {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_applies_overrides() {
        let specs = parse_batch(
            r#"
- category: status
  args: [status]
- category: remote
  args: [remote, -v]
  ttl_seconds: 0
  retries: 1
  timeout_seconds: 3
"#,
        )
        .unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].category(), CommandCategory::Status);
        assert_eq!(
            specs[0].cache_ttl_seconds(),
            CommandCategory::Status.default_ttl_seconds()
        );
        assert_eq!(specs[1].args(), ["remote", "-v"]);
        assert!(!specs[1].is_cacheable());
        assert_eq!(specs[1].retry_count(), 1);
        assert_eq!(specs[1].timeout_seconds(), 3);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let err = parse_batch("- category: rebase\n  args: [rebase]\n").unwrap_err();
        assert!(err.to_string().contains("Invalid batch file"));
    }
}
