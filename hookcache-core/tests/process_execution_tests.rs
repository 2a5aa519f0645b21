//! End-to-end tests spawning real processes
#![cfg(unix)]

use hookcache_core::{
    CommandCategory, CommandManager, CommandSpec, ExecError, ManagerConfig, RetryPolicy,
};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_test::assert_ok;

fn manager(program: &str, dir: &TempDir) -> CommandManager {
    let config = ManagerConfig::builder()
        .program(program)
        .working_dir(dir.path())
        .retry(RetryPolicy {
            base_delay: Duration::from_millis(10),
            ..Default::default()
        })
        .shutdown_timeout(Duration::from_secs(2))
        .build();
    assert_ok!(CommandManager::new(config))
}

#[tokio::test]
async fn test_shell_output_is_cached() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("runs");
    let manager = manager("sh", &dir);

    // Each real run appends to the marker file
    let spec = CommandSpec::new(
        CommandCategory::Status,
        ["-c", "echo run >> runs; wc -l < runs"],
    );

    let first = manager.execute(spec.clone()).await;
    let second = manager.execute(spec).await;

    assert!(first.success, "stderr: {}", first.stderr);
    assert_eq!(first.exit_code, 0);
    assert!(second.cache_hit);
    assert_eq!(second.stdout, first.stdout);

    let contents = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(contents.lines().count(), 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_nonzero_exit_is_reported_with_stderr() {
    let dir = TempDir::new().unwrap();
    let manager = manager("sh", &dir);
    let spec = CommandSpec::new(CommandCategory::Diff, ["-c", "echo broken >&2; exit 4"])
        .with_retries(1);

    let result = manager.execute(spec).await;

    assert!(!result.success);
    assert_eq!(result.exit_code, 4);
    assert_eq!(result.attempts, 2);
    assert!(result.stderr.contains("broken"));
    assert!(matches!(
        result.error(),
        Some(ExecError::ExitFailure { code: 4, .. })
    ));

    manager.shutdown().await;
}

#[tokio::test]
async fn test_true_and_false() {
    let dir = TempDir::new().unwrap();

    let ok = manager("true", &dir);
    let result = ok
        .execute(CommandSpec::new(CommandCategory::Other, Vec::<String>::new()))
        .await;
    assert!(result.success);
    assert!(result.stdout.is_empty());
    ok.shutdown().await;

    let failing = manager("false", &dir);
    let result = failing
        .execute(CommandSpec::new(CommandCategory::Other, Vec::<String>::new()).with_retries(0))
        .await;
    assert!(!result.success);
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.attempts, 1);
    failing.shutdown().await;
}

#[tokio::test]
async fn test_missing_executable_exhausts_retries() {
    let dir = TempDir::new().unwrap();
    let manager = manager("/nonexistent/hookcache-test-binary", &dir);
    let spec = CommandSpec::new(CommandCategory::Status, ["status"]).with_retries(2);

    let result = manager.execute(spec).await;

    assert!(!result.success);
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.attempts, 3);
    assert!(!result.stderr.is_empty());
    assert!(matches!(result.error(), Some(ExecError::Spawn { .. })));

    let stats = manager.statistics().await;
    assert_eq!(stats.operations.errors, 1);
    assert_eq!(stats.retries, 2);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_timeout_kills_slow_process() {
    let dir = TempDir::new().unwrap();
    let manager = manager("sleep", &dir);
    let spec = CommandSpec::new(CommandCategory::Log, ["30"])
        .with_timeout(1)
        .with_retries(0);

    let started = Instant::now();
    let result = manager.execute(spec).await;

    assert!(!result.success);
    assert!(result.is_timeout());
    assert_eq!(result.exit_code, -1);
    assert!(started.elapsed() < Duration::from_secs(5));

    manager.shutdown().await;
}

#[tokio::test]
async fn test_arguments_are_not_shell_expanded() {
    let dir = TempDir::new().unwrap();
    let manager = manager("echo", &dir);
    let spec = CommandSpec::new(CommandCategory::Show, ["$HOME", "*", "a;b"]);

    let result = manager.execute(spec).await;

    assert!(result.success);
    assert_eq!(result.stdout.trim(), "$HOME * a;b");

    manager.shutdown().await;
}
