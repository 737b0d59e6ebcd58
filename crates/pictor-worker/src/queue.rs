//! Task queue: worker pool, task sources and the stale task reaper.
//!
//! Delivery is at-least-once. The pool drops a delivery whose task id is
//! already being executed locally; anything else that was seen before is
//! turned into a no-op by the orchestrator's status checks.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use pictor_core::error::LogLevel;
use pictor_core::{PipelineResult, WorkerConfig};
use pictor_db::{TaskRepository, TASK_NOTIFY_CHANNEL};

use crate::orchestrator::{ExecutionOutcome, PipelineOrchestrator};

/// Message written to tasks failed by the reaper
pub const STALE_TASK_MESSAGE: &str = "task timed out while in progress";

/// Optional sender notified when a delivered task finishes.
pub type TaskFinishedSender = mpsc::Sender<(Uuid, PipelineResult<ExecutionOutcome>)>;

#[derive(Debug, Clone)]
pub struct TaskQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    /// Interval in seconds between runs of the stale task reaper (0 disables it).
    pub stale_task_reap_interval_secs: u64,
    /// Age in seconds after which an IN_PROGRESS task is considered abandoned.
    pub stale_task_grace_period_secs: i64,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 1000,
            stale_task_reap_interval_secs: 60,
            stale_task_grace_period_secs: 900,
        }
    }
}

impl From<&WorkerConfig> for TaskQueueConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_workers: config.task_queue_max_workers,
            poll_interval_ms: config.task_queue_poll_interval_ms,
            stale_task_reap_interval_secs: config.task_queue_stale_task_reap_interval_secs,
            stale_task_grace_period_secs: config.task_queue_stale_task_grace_period_secs,
        }
    }
}

/// Where the pool gets task ids from
#[async_trait]
pub trait TaskSource: Send {
    /// Next batch of task ids, possibly empty. `None` means the source is
    /// exhausted and the pool should stop.
    async fn next_batch(&mut self) -> Option<Vec<Uuid>>;
}

/// In-process source fed through an mpsc channel
pub struct ChannelSource {
    rx: mpsc::Receiver<Uuid>,
}

impl ChannelSource {
    /// Returns the sender used to enqueue task ids and the source to hand to
    /// the pool. The source closes once every sender is dropped.
    pub fn new(capacity: usize) -> (mpsc::Sender<Uuid>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl TaskSource for ChannelSource {
    async fn next_batch(&mut self) -> Option<Vec<Uuid>> {
        let first = self.rx.recv().await?;
        let mut batch = vec![first];
        while let Ok(next) = self.rx.try_recv() {
            batch.push(next);
        }
        Some(batch)
    }
}

/// Polls the repository for PENDING tasks.
///
/// With a PostgreSQL pool it also LISTENs on the task channel so new tasks
/// are picked up without waiting for the next poll.
pub struct RepositoryPoller {
    tasks: Arc<dyn TaskRepository>,
    poll_interval: Duration,
    batch_size: i64,
    wakeups: Option<mpsc::Receiver<()>>,
    primed: bool,
}

impl RepositoryPoller {
    pub fn new(tasks: Arc<dyn TaskRepository>, poll_interval: Duration, batch_size: usize) -> Self {
        Self {
            tasks,
            poll_interval,
            batch_size: i64::try_from(batch_size.max(1)).unwrap_or(i64::MAX),
            wakeups: None,
            primed: false,
        }
    }

    /// Wake up on `pg_notify` in addition to polling
    pub fn with_listener(mut self, pool: sqlx::PgPool) -> Self {
        let (notify_tx, notify_rx) = mpsc::channel::<()>(16);

        tokio::spawn(async move {
            loop {
                match sqlx::postgres::PgListener::connect_with(&pool).await {
                    Ok(mut listener) => {
                        if let Err(e) = listener.listen(TASK_NOTIFY_CHANNEL).await {
                            tracing::warn!(error = %e, "LISTEN failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            continue;
                        }
                        while listener.recv().await.is_ok() {
                            // Full channel: a wake-up is already pending
                            if notify_tx.try_send(()).is_err() && notify_tx.is_closed() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "PgListener connect failed, will retry");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        self.wakeups = Some(notify_rx);
        self
    }
}

#[async_trait]
impl TaskSource for RepositoryPoller {
    async fn next_batch(&mut self) -> Option<Vec<Uuid>> {
        if self.primed {
            match self.wakeups.as_mut() {
                Some(wakeups) => {
                    tokio::select! {
                        _ = wakeups.recv() => {}
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
        self.primed = true;

        match self.tasks.pending_task_ids(self.batch_size).await {
            Ok(ids) => Some(ids),
            Err(e) => {
                tracing::error!(error = %e, "Failed to poll pending tasks");
                Some(Vec::new())
            }
        }
    }
}

/// Running worker pool
pub struct TaskQueue {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl TaskQueue {
    /// Spawn the pool. It runs until [`TaskQueue::shutdown`] is called or the
    /// source is exhausted.
    pub fn start(
        orchestrator: Arc<PipelineOrchestrator>,
        tasks: Arc<dyn TaskRepository>,
        source: Box<dyn TaskSource>,
        config: TaskQueueConfig,
        task_finished_tx: Option<TaskFinishedSender>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let handle = tokio::spawn(Self::worker_pool(
            orchestrator,
            tasks,
            source,
            config,
            shutdown_rx,
            task_finished_tx,
        ));

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop taking deliveries and wait for in-flight tasks to finish
    pub async fn shutdown(self) {
        tracing::info!("Initiating task queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
        self.join().await;
    }

    /// Wait for the pool to stop on its own (source exhausted)
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Task queue worker pool panicked");
        }
    }

    async fn worker_pool(
        orchestrator: Arc<PipelineOrchestrator>,
        tasks: Arc<dyn TaskRepository>,
        mut source: Box<dyn TaskSource>,
        config: TaskQueueConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
        task_finished_tx: Option<TaskFinishedSender>,
    ) {
        let max_workers = config.max_workers.max(1);
        tracing::info!(
            max_workers,
            poll_interval_ms = config.poll_interval_ms,
            "Task queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(max_workers));
        let in_flight: Arc<Mutex<HashSet<Uuid>>> = Arc::new(Mutex::new(HashSet::new()));

        let (reaper_shutdown_tx, reaper_shutdown_rx) = mpsc::channel::<()>(1);
        if config.stale_task_reap_interval_secs > 0 {
            tokio::spawn(Self::stale_task_reaper(
                tasks,
                Duration::from_secs(config.stale_task_reap_interval_secs),
                config.stale_task_grace_period_secs,
                reaper_shutdown_rx,
            ));
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Task queue worker pool shutting down");
                    break;
                }
                batch = source.next_batch() => {
                    let Some(batch) = batch else {
                        tracing::info!("Task source closed");
                        break;
                    };
                    for task_id in batch {
                        Self::dispatch(
                            task_id,
                            &orchestrator,
                            &semaphore,
                            &in_flight,
                            task_finished_tx.clone(),
                        ).await;
                    }
                }
            }
        }

        let _ = reaper_shutdown_tx.send(()).await;

        // Every permit back means every spawned task has finished
        let workers = u32::try_from(max_workers).unwrap_or(u32::MAX);
        if semaphore.acquire_many(workers).await.is_err() {
            tracing::warn!("Worker semaphore closed before in-flight tasks drained");
        }

        tracing::info!("Task queue worker pool stopped");
    }

    async fn dispatch(
        task_id: Uuid,
        orchestrator: &Arc<PipelineOrchestrator>,
        semaphore: &Arc<Semaphore>,
        in_flight: &Arc<Mutex<HashSet<Uuid>>>,
        task_finished_tx: Option<TaskFinishedSender>,
    ) {
        if !InFlight::insert(in_flight, task_id) {
            tracing::debug!(task_id = %task_id, "Task already running here, dropping delivery");
            return;
        }

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                InFlight::remove(in_flight, task_id);
                tracing::error!(task_id = %task_id, "Worker semaphore closed");
                return;
            }
        };

        let orchestrator = orchestrator.clone();
        let guard = InFlight {
            set: in_flight.clone(),
            task_id,
        };

        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;

            let result = orchestrator.execute(task_id).await;
            match &result {
                Ok(outcome) => {
                    tracing::debug!(task_id = %task_id, outcome = ?outcome, "Task delivery handled")
                }
                Err(e) => match e.log_level() {
                    LogLevel::Error => tracing::error!(
                        task_id = %task_id,
                        error_code = e.error_code(),
                        error = %e,
                        "Task execution failed"
                    ),
                    LogLevel::Warn | LogLevel::Debug => tracing::warn!(
                        task_id = %task_id,
                        error_code = e.error_code(),
                        error = %e,
                        "Task execution failed"
                    ),
                },
            }

            if let Some(tx) = task_finished_tx {
                let _ = tx.send((task_id, result)).await;
            }
        });
    }

    async fn stale_task_reaper(
        tasks: Arc<dyn TaskRepository>,
        reap_interval: Duration,
        grace_period_secs: i64,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut interval = tokio::time::interval(reap_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let cutoff = Utc::now() - chrono::Duration::seconds(grace_period_secs);
                    match tasks.fail_stale_tasks(cutoff, STALE_TASK_MESSAGE).await {
                        Ok(reaped) if !reaped.is_empty() => {
                            tracing::warn!(count = reaped.len(), task_ids = ?reaped, "Reaped stale in-progress tasks");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Stale task reaper failed"),
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    }
}

/// Removes a task id from the in-flight set when the worker finishes,
/// including when it panics.
struct InFlight {
    set: Arc<Mutex<HashSet<Uuid>>>,
    task_id: Uuid,
}

impl InFlight {
    fn insert(set: &Mutex<HashSet<Uuid>>, task_id: Uuid) -> bool {
        match set.lock() {
            Ok(mut ids) => ids.insert(task_id),
            Err(poisoned) => poisoned.into_inner().insert(task_id),
        }
    }

    fn remove(set: &Mutex<HashSet<Uuid>>, task_id: Uuid) {
        match set.lock() {
            Ok(mut ids) => ids.remove(&task_id),
            Err(poisoned) => poisoned.into_inner().remove(&task_id),
        };
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        Self::remove(&self.set, self.task_id);
    }
}
