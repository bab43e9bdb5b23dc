mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{MockProvider, Scripted, test_config};
use takeoff::config::DocClass;
use takeoff::dispatch::Dispatcher;
use takeoff::metrics::RecordingSink;
use takeoff::pool::{TaskStatus, WorkerPool, canonical_identity};

fn pool_with(
    provider: Arc<MockProvider>,
    config: takeoff::config::ExtractorConfig,
    task_timeout: Duration,
) -> WorkerPool {
    let dispatcher = Arc::new(Dispatcher::new(
        config,
        provider,
        Arc::new(RecordingSink::default()),
    ));
    WorkerPool::new(dispatcher, task_timeout)
}

// ---------------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_paths_yield_one_task() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    let mut pool = pool_with(
        Arc::clone(&provider),
        test_config(&dir),
        Duration::from_secs(5),
    );

    assert!(pool.enqueue(
        Path::new("/plans/E-101_missing.txt"),
        "sheet".into(),
        DocClass::Drawing
    ));
    assert!(!pool.enqueue(
        Path::new("/plans/E-101_missing.txt"),
        "sheet".into(),
        DocClass::Drawing
    ));
    // Same path spelled differently still collides.
    assert!(!pool.enqueue(
        Path::new("/plans/./E-101_missing.txt"),
        "sheet".into(),
        DocClass::Drawing
    ));

    let summary = pool.run(4).await;
    assert_eq!(summary.total, 1, "summary counts deduplicated tasks");
    assert_eq!(summary.succeeded, 1);
    assert_eq!(provider.total_calls(), 1);
}

// ---------------------------------------------------------------------------
// Per-task deadline + worker survival
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timed_out_task_resolves_and_the_next_task_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    let config = test_config(&dir);
    let primary = config.tiers.small.clone();
    // First dequeue stalls past the deadline; the second is instant.
    provider.script(&primary, vec![Scripted::Stall(Duration::from_millis(500))]);

    let mut pool = pool_with(
        Arc::clone(&provider),
        config,
        Duration::from_millis(50),
    );
    pool.enqueue(Path::new("/plans/slow.txt"), "slow sheet".into(), DocClass::Drawing);
    pool.enqueue(Path::new("/plans/fast.txt"), "fast sheet".into(), DocClass::Drawing);

    // One worker: the same task that hits the deadline must keep draining.
    let summary = pool.run(1).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.timed_out, 1);
    assert_eq!(summary.succeeded, 1);

    let slow = &summary.results[&canonical_identity(Path::new("/plans/slow.txt"))];
    assert_eq!(slow.status, TaskStatus::Timeout);
    assert!(slow.error.as_deref().unwrap_or_default().starts_with("timeout"));

    let fast = &summary.results[&canonical_identity(Path::new("/plans/fast.txt"))];
    assert_eq!(fast.status, TaskStatus::Success);
}

// ---------------------------------------------------------------------------
// Batch always completes with a per-task breakdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_exhausted_task_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    let config = test_config(&dir);
    let primary = config.tiers.small.clone();
    // Poison every model for the first task only. Each model's script is
    // consumed in turn, so the second task sees defaults and succeeds.
    provider.script(&primary, vec![Scripted::FailProtocol]);
    provider.script("gpt-4.1-mini", vec![Scripted::FailProtocol]);
    provider.script("gpt-4o-mini", vec![Scripted::FailProtocol]);

    let mut pool = pool_with(
        Arc::clone(&provider),
        config,
        Duration::from_secs(5),
    );
    pool.enqueue(Path::new("/plans/doomed.txt"), "doomed".into(), DocClass::Drawing);
    pool.enqueue(Path::new("/plans/fine.txt"), "fine".into(), DocClass::Drawing);

    let summary = pool.run(1).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);

    let doomed = &summary.results[&canonical_identity(Path::new("/plans/doomed.txt"))];
    assert_eq!(doomed.status, TaskStatus::Failed);
    assert!(
        doomed
            .error
            .as_deref()
            .unwrap_or_default()
            .starts_with("fallback_exhausted")
    );
}

#[tokio::test]
async fn results_are_keyed_by_task_identity() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    let mut pool = pool_with(
        Arc::clone(&provider),
        test_config(&dir),
        Duration::from_secs(5),
    );

    let paths = ["/plans/a.txt", "/plans/b.txt", "/plans/c.txt"];
    for path in paths {
        pool.enqueue(Path::new(path), format!("content {path}"), DocClass::Drawing);
    }

    let summary = pool.run(2).await;
    assert_eq!(summary.total, 3);
    for path in paths {
        let result = &summary.results[&canonical_identity(Path::new(path))];
        assert_eq!(result.status, TaskStatus::Success);
        assert!(result.text.is_some());
        assert!(result.model.is_some());
    }
}

// ---------------------------------------------------------------------------
// Cached rerun: zero provider calls the second time through
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rerun_within_ttl_is_served_entirely_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(MockProvider::new());
    let config = test_config(&dir);

    let dispatcher = Arc::new(Dispatcher::new(
        config.clone(),
        Arc::clone(&provider) as Arc<dyn takeoff::protocol::ProviderApi>,
        Arc::new(RecordingSink::default()),
    ));

    let mut pool = WorkerPool::new(Arc::clone(&dispatcher), Duration::from_secs(5));
    pool.enqueue(Path::new("/plans/E-601.txt"), "PANEL LP-1".into(), DocClass::Schedule);
    let first = pool.run(1).await;
    assert_eq!(first.succeeded, 1);
    assert_eq!(provider.total_calls(), 1);
    let first_text = first.results.values().next().unwrap().text.clone();

    // Second run, fresh pool, same dispatcher config and cache dir.
    let mut pool = WorkerPool::new(dispatcher, Duration::from_secs(5));
    pool.enqueue(Path::new("/plans/E-601.txt"), "PANEL LP-1".into(), DocClass::Schedule);
    let second = pool.run(1).await;
    assert_eq!(second.succeeded, 1);
    assert_eq!(second.cache_hits, 1);
    assert_eq!(provider.total_calls(), 1, "second run must not call the provider");
    assert_eq!(
        second.results.values().next().unwrap().text,
        first_text,
        "cached rerun is byte-identical"
    );
}
