//! Batch files loaded from disk and run through a manager

use hookcache::{load_batch, Settings};
use hookcache_core::{CommandCategory, CommandManager, ManagerConfig};
use std::time::Duration;
use tempfile::TempDir;

fn write_batch(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("batch.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_load_batch_preserves_order() {
    let dir = TempDir::new().unwrap();
    let path = write_batch(
        &dir,
        r#"
- category: log
  args: [log, -1]
- category: branch
  args: [branch, --show-current]
- category: config
  args: [config, user.name]
  ttl_seconds: 120
"#,
    );

    let specs = load_batch(&path).unwrap();
    let categories: Vec<_> = specs.iter().map(|s| s.category()).collect();
    assert_eq!(
        categories,
        vec![
            CommandCategory::Log,
            CommandCategory::Branch,
            CommandCategory::Config
        ]
    );
    assert_eq!(specs[2].cache_ttl_seconds(), 120);
}

#[test]
fn test_missing_batch_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = load_batch(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read batch file"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_batch_runs_in_parallel_with_settings() {
    let dir = TempDir::new().unwrap();
    let settings_path = dir.path().join("config.yaml");
    std::fs::write(
        &settings_path,
        "program: sh\nmax_concurrency: 2\nshutdown_timeout_ms: 2000\n",
    )
    .unwrap();

    let batch = write_batch(
        &dir,
        r#"
- category: other
  args: [-c, "echo one"]
- category: other
  args: [-c, "echo two"]
- category: other
  args: [-c, "exit 3"]
  retries: 0
- category: other
  args: [-c, "echo one"]
"#,
    );

    let settings = Settings::load(Some(settings_path.as_path())).unwrap();
    let mut config = settings.apply(ManagerConfig::default());
    config.context.working_dir = Some(dir.path().to_path_buf());
    assert_eq!(config.shutdown_timeout, Duration::from_secs(2));

    let manager = CommandManager::new(config).unwrap();
    let results = manager.execute_parallel(load_batch(&batch).unwrap()).await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].stdout.trim(), "one");
    assert_eq!(results[1].stdout.trim(), "two");
    assert!(!results[2].success);
    assert_eq!(results[2].exit_code, 3);
    assert_eq!(results[3].stdout.trim(), "one");

    let stats = manager.statistics().await;
    assert_eq!(stats.operations.total_operations, 4);
    assert!(stats.gate.peak <= 2);

    manager.shutdown().await;
}
