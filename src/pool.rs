//! Dedup queue + bounded worker pool.
//!
//! Workers are cooperative tokio tasks, not OS threads; parallelism exists
//! only while awaiting the provider. Each task's whole dispatch is wrapped
//! in one deadline, and a worker that sees a timeout or failure keeps
//! pulling from the queue.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::Mutex;

use crate::config::DocClass;
use crate::dispatch::Dispatcher;
use crate::error::ExtractError;

/// One document's unit of work. Owned by the pool until a worker takes it.
#[derive(Debug)]
pub struct Task {
    pub identity: PathBuf,
    pub content: String,
    pub class: DocClass,
    pub enqueued_at: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Timeout,
    Failed,
}

/// Final record for one task. Never mutated after creation.
#[derive(Debug)]
pub struct TaskResult {
    pub status: TaskStatus,
    pub text: Option<String>,
    pub model: Option<String>,
    pub cache_hit: bool,
    pub queue_wait_ms: u64,
    pub call_ms: u64,
    /// Error classification tag plus message, when the task failed.
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Summary {
    /// Count of deduplicated tasks, not raw enqueue offers.
    pub total: usize,
    pub succeeded: usize,
    pub timed_out: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub results: HashMap<PathBuf, TaskResult>,
}

pub struct WorkerPool {
    dispatcher: Arc<Dispatcher>,
    task_timeout: Duration,
    queue: VecDeque<Task>,
    seen: HashSet<PathBuf>,
}

impl WorkerPool {
    pub fn new(dispatcher: Arc<Dispatcher>, task_timeout: Duration) -> Self {
        Self {
            dispatcher,
            task_timeout,
            queue: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Add one document, deduplicating by canonical path. Returns false if
    /// the path was already queued.
    pub fn enqueue(&mut self, path: &Path, content: String, class: DocClass) -> bool {
        let identity = canonical_identity(path);
        if !self.seen.insert(identity.clone()) {
            tracing::debug!(path = %identity.display(), "duplicate path skipped");
            return false;
        }
        self.queue.push_back(Task {
            identity,
            content,
            class,
            enqueued_at: Instant::now(),
        });
        true
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue with a fixed number of concurrent workers and
    /// aggregate per-task results. A single task's failure or timeout never
    /// aborts the batch.
    pub async fn run(self, worker_count: usize) -> Summary {
        let total = self.queue.len();
        let queue = Arc::new(Mutex::new(self.queue));
        let results: Arc<Mutex<HashMap<PathBuf, TaskResult>>> =
            Arc::new(Mutex::new(HashMap::with_capacity(total)));

        let workers = worker_count.clamp(1, total.max(1));
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                let results = Arc::clone(&results);
                let dispatcher = Arc::clone(&self.dispatcher);
                let task_timeout = self.task_timeout;
                tokio::spawn(async move {
                    loop {
                        let task = {
                            let mut q = queue.lock().await;
                            q.pop_front()
                        };
                        let Some(task) = task else { break };

                        let identity = task.identity.clone();
                        let result =
                            process_task(&dispatcher, task, task_timeout).await;
                        tracing::debug!(
                            worker,
                            path = %identity.display(),
                            status = ?result.status,
                            "task finished"
                        );
                        results.lock().await.insert(identity, result);
                    }
                })
            })
            .collect();

        for (worker, joined) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                // A panicked worker loses only its in-flight task; the rest
                // of the batch has already been drained by its peers.
                tracing::error!(worker, "worker panicked: {e}");
            }
        }

        let results = Arc::try_unwrap(results)
            .map(|m| m.into_inner())
            .unwrap_or_default();
        summarize(total, results)
    }
}

async fn process_task(dispatcher: &Dispatcher, task: Task, deadline: Duration) -> TaskResult {
    let queue_wait_ms = task.enqueued_at.elapsed().as_millis() as u64;
    let identity = task.identity.display().to_string();

    let outcome = tokio::time::timeout(
        deadline,
        dispatcher.extract(&task.content, task.class, &identity),
    )
    .await;

    match outcome {
        Ok(Ok(extraction)) => TaskResult {
            status: TaskStatus::Success,
            text: Some(extraction.text),
            model: Some(extraction.model),
            cache_hit: extraction.cache_hit,
            queue_wait_ms,
            call_ms: extraction.call_ms,
            error: None,
        },
        Ok(Err(e)) => TaskResult {
            status: TaskStatus::Failed,
            text: None,
            model: None,
            cache_hit: false,
            queue_wait_ms,
            call_ms: 0,
            error: Some(format!("{}: {e}", e.classification())),
        },
        Err(_) => {
            let e = ExtractError::Timeout(deadline.as_millis() as u64);
            TaskResult {
                status: TaskStatus::Timeout,
                text: None,
                model: None,
                cache_hit: false,
                queue_wait_ms,
                call_ms: deadline.as_millis() as u64,
                error: Some(format!("{}: {e}", e.classification())),
            }
        }
    }
}

fn summarize(total: usize, results: HashMap<PathBuf, TaskResult>) -> Summary {
    let mut summary = Summary {
        total,
        results,
        ..Summary::default()
    };
    for result in summary.results.values() {
        match result.status {
            TaskStatus::Success => summary.succeeded += 1,
            TaskStatus::Timeout => summary.timed_out += 1,
            TaskStatus::Failed => summary.failed += 1,
        }
        if result.cache_hit {
            summary.cache_hits += 1;
        }
    }
    summary
}

/// Canonical task identity. Prefers the filesystem's answer; for paths that
/// do not exist yet, falls back to a lexical cleanup (absolutize, drop `.`,
/// resolve `..`) so `a/./b` and `a/b` still collide.
pub fn canonical_identity(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}
