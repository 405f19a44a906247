//! The job queue and its worker pool.
//!
//! `max_concurrent` long-lived worker tasks pull from a shared priority
//! heap. Pending work is signalled through a [`Notify`]; a second
//! `Notify` fires on every terminal transition so waiters can re-check
//! their jobs without polling.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use amp_core::types::JobId;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::QueueConfig;
use crate::context::JobContext;
use crate::error::QueueError;
use crate::events::JobEvent;
use crate::job::{BatchOutcome, JobFilter, JobSnapshot, JobSpec, JobStatus, QueueStats};

/// Error recorded on a pending job removed by [`JobQueue::cancel`].
pub const CANCELLED_BEFORE_START: &str = "cancelled before start";

type JobTask = Box<dyn FnOnce(JobContext) -> BoxFuture<'static, anyhow::Result<Value>> + Send>;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct JobRecord {
    snapshot: JobSnapshot,
    cancel: CancellationToken,
}

/// Heap entry. Higher priority first, then lower submission sequence.
struct PendingEntry {
    priority: u8,
    seq: u64,
    id: JobId,
    task: JobTask,
}

impl PartialEq for PendingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for PendingEntry {}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub(crate) struct Shared {
    pub(crate) config: QueueConfig,
    jobs: RwLock<HashMap<JobId, JobRecord>>,
    pending: Mutex<BinaryHeap<PendingEntry>>,
    work_ready: Notify,
    settled: Notify,
    events: broadcast::Sender<JobEvent>,
    shutdown: CancellationToken,
    seq: AtomicU64,
}

impl Shared {
    /// Mutate one job under the write lock. `None` if the id is unknown.
    pub(crate) fn with_job<R>(&self, id: &str, f: impl FnOnce(&mut JobSnapshot) -> R) -> Option<R> {
        self.jobs.write().get_mut(id).map(|record| f(&mut record.snapshot))
    }

    /// Like [`with_job`](Self::with_job), but skips jobs that already
    /// finished. Terminal jobs are read-only.
    pub(crate) fn with_live_job<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut JobSnapshot) -> R,
    ) -> Option<R> {
        self.jobs
            .write()
            .get_mut(id)
            .filter(|record| !record.snapshot.is_terminal())
            .map(|record| f(&mut record.snapshot))
    }

    pub(crate) fn publish(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn finish(&self, id: &str, outcome: Result<Value, String>) {
        let event = self.with_job(id, |job| {
            job.completed_at = Some(Utc::now());
            match outcome {
                Ok(value) => {
                    job.status = JobStatus::Completed;
                    job.progress = 1.0;
                    job.result = Some(value);
                    JobEvent::Completed { job_id: id.to_string() }
                }
                Err(error) => {
                    job.status = JobStatus::Failed;
                    job.error = Some(error.clone());
                    JobEvent::Failed {
                        job_id: id.to_string(),
                        error,
                    }
                }
            }
        });

        if let Some(event) = event {
            match &event {
                JobEvent::Failed { error, .. } => {
                    tracing::warn!(job_id = %id, error = %error, "Job failed");
                }
                _ => tracing::info!(job_id = %id, "Job completed"),
            }
            self.publish(event);
        }
        self.settled.notify_waiters();
    }

    fn all_terminal(&self, ids: &[JobId]) -> bool {
        let jobs = self.jobs.read();
        ids.iter()
            .all(|id| jobs.get(id).map_or(true, |r| r.snapshot.is_terminal()))
    }
}

// ---------------------------------------------------------------------------
// JobQueue
// ---------------------------------------------------------------------------

/// Bounded-concurrency background job queue.
///
/// Build with [`JobQueue::start`] inside a Tokio runtime and share the
/// returned `Arc`. Dropping the last handle stops the workers.
pub struct JobQueue {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobQueue {
    /// Create the queue and spawn its worker tasks.
    pub fn start(config: QueueConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let worker_count = config.max_concurrent.max(1);

        let shared = Arc::new(Shared {
            config,
            jobs: RwLock::new(HashMap::new()),
            pending: Mutex::new(BinaryHeap::new()),
            work_ready: Notify::new(),
            settled: Notify::new(),
            events,
            shutdown: CancellationToken::new(),
            seq: AtomicU64::new(0),
        });

        let workers = (0..worker_count)
            .map(|worker| tokio::spawn(worker_loop(Arc::clone(&shared), worker)))
            .collect();

        tracing::info!(max_concurrent = worker_count, "Job queue started");
        Arc::new(Self {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Queue a job and return its id immediately.
    ///
    /// The function's `Ok` value becomes the job result. An `Err` or a
    /// panic marks the job failed with the error text.
    pub fn submit<F, Fut>(&self, spec: JobSpec, job: F) -> Result<JobId, QueueError>
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        if self.shared.shutdown.is_cancelled() {
            return Err(QueueError::ShutDown);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let snapshot = JobSnapshot::pending(id.clone(), spec, Utc::now());
        let (priority, job_type) = (snapshot.priority, snapshot.job_type);

        self.shared.jobs.write().insert(
            id.clone(),
            JobRecord {
                snapshot,
                cancel: self.shared.shutdown.child_token(),
            },
        );

        tracing::info!(job_id = %id, job_type = job_type.as_str(), priority, "Job submitted");
        self.shared.publish(JobEvent::Submitted {
            job_id: id.clone(),
            job_type,
        });

        // The closure runs inside the future so a panic while building
        // it is caught along with panics during polling.
        let task: JobTask = Box::new(move |ctx: JobContext| async move { job(ctx).await }.boxed());
        let seq = self.shared.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.shared.pending.lock().push(PendingEntry {
            priority,
            seq,
            id: id.clone(),
            task,
        });
        self.shared.work_ready.notify_one();
        Ok(id)
    }

    pub fn get_job(&self, id: &str) -> Option<JobSnapshot> {
        self.shared.jobs.read().get(id).map(|r| r.snapshot.clone())
    }

    /// Jobs matching `filter`, highest priority first, then oldest first.
    pub fn list_jobs(&self, filter: &JobFilter) -> Vec<JobSnapshot> {
        let mut jobs: Vec<JobSnapshot> = self
            .shared
            .jobs
            .read()
            .values()
            .filter(|r| filter.matches(&r.snapshot))
            .map(|r| r.snapshot.clone())
            .collect();
        jobs.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        jobs
    }

    pub fn get_stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            max_concurrent: self.shared.config.max_concurrent,
            ..QueueStats::default()
        };
        for record in self.shared.jobs.read().values() {
            stats.record(&record.snapshot);
        }
        stats
    }

    /// Wait up to `timeout` for every job in `ids` to finish, then return
    /// one entry per id: the result of completed jobs, `None` otherwise.
    pub async fn collect_results(&self, ids: &[JobId], timeout: Duration) -> Vec<Option<Value>> {
        self.wait_terminal(ids, timeout).await;

        let jobs = self.shared.jobs.read();
        ids.iter()
            .map(|id| {
                jobs.get(id)
                    .filter(|r| r.snapshot.status == JobStatus::Completed)
                    .and_then(|r| r.snapshot.result.clone())
            })
            .collect()
    }

    /// Wait up to `max_wait` for `ids` and summarize how they ended.
    pub async fn wait_for_all(&self, ids: &[JobId], max_wait: Duration) -> BatchOutcome {
        let started = Instant::now();
        self.wait_terminal(ids, max_wait).await;

        let (mut completed, mut failed) = (0, 0);
        {
            let jobs = self.shared.jobs.read();
            for record in ids.iter().filter_map(|id| jobs.get(id)) {
                match record.snapshot.status {
                    JobStatus::Completed => completed += 1,
                    JobStatus::Failed => failed += 1,
                    _ => {}
                }
            }
        }

        let total = ids.len();
        BatchOutcome {
            completed,
            failed,
            total,
            success_rate: if total == 0 {
                0.0
            } else {
                completed as f64 / total as f64
            },
            duration: started.elapsed(),
        }
    }

    /// Cancel a job.
    ///
    /// A pending job is dropped from the queue and marked failed with
    /// [`CANCELLED_BEFORE_START`]. A running job has its cancel handle
    /// fired and ends however its function decides. Returns `false` for
    /// unknown and already finished jobs.
    pub fn cancel(&self, id: &str) -> bool {
        let (status, token) = match self.shared.jobs.read().get(id) {
            Some(r) => (r.snapshot.status, r.cancel.clone()),
            None => return false,
        };

        match status {
            JobStatus::Pending => {
                let removed = {
                    let mut pending = self.shared.pending.lock();
                    let before = pending.len();
                    pending.retain(|entry| entry.id != id);
                    pending.len() != before
                };
                token.cancel();
                if removed {
                    tracing::info!(job_id = %id, "Pending job cancelled");
                    self.shared.finish(id, Err(CANCELLED_BEFORE_START.to_string()));
                }
                // Otherwise a worker has just claimed it and will see the
                // fired token before running it.
                true
            }
            JobStatus::Running => {
                tracing::info!(job_id = %id, "Cancellation requested for running job");
                token.cancel();
                true
            }
            JobStatus::Completed | JobStatus::Failed => false,
        }
    }

    /// Remove finished jobs, optionally only those from `source`.
    /// Returns how many were removed.
    pub fn clear_finished(&self, source: Option<&str>) -> usize {
        let mut jobs = self.shared.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, r| {
            let matches_source = source.map_or(true, |s| r.snapshot.source.as_deref() == Some(s));
            !(r.snapshot.is_terminal() && matches_source)
        });
        before - jobs.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.shared.events.subscribe()
    }

    /// Stop accepting work, fire every job's cancel handle, and wait for
    /// the workers to exit. Jobs still pending stay pending.
    pub async fn shutdown(&self) {
        self.shared.shutdown.cancel();
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Job worker ended abnormally");
            }
        }
        tracing::info!("Job queue shut down");
    }

    async fn wait_terminal(&self, ids: &[JobId], timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            let settled = self.shared.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();

            if self.shared.all_terminal(ids) {
                return;
            }
            if tokio::time::timeout_at(deadline, settled).await.is_err() {
                return;
            }
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

async fn worker_loop(shared: Arc<Shared>, worker: usize) {
    tracing::debug!(worker, "Job worker started");
    loop {
        let entry = loop {
            let ready = shared.work_ready.notified();
            tokio::pin!(ready);
            ready.as_mut().enable();

            if shared.shutdown.is_cancelled() {
                tracing::debug!(worker, "Job worker stopping");
                return;
            }
            let next = shared.pending.lock().pop();
            if let Some(entry) = next {
                break entry;
            }

            tokio::select! {
                _ = shared.shutdown.cancelled() => {
                    tracing::debug!(worker, "Job worker stopping");
                    return;
                }
                _ = &mut ready => {}
            }
        };

        run_job(&shared, worker, entry).await;
    }
}

async fn run_job(shared: &Arc<Shared>, worker: usize, entry: PendingEntry) {
    let PendingEntry { id, task, .. } = entry;

    let token = {
        let mut jobs = shared.jobs.write();
        let Some(record) = jobs.get_mut(&id) else {
            return;
        };
        if record.cancel.is_cancelled() {
            None
        } else {
            record.snapshot.status = JobStatus::Running;
            record.snapshot.started_at = Some(Utc::now());
            Some(record.cancel.clone())
        }
    };

    let Some(token) = token else {
        shared.finish(&id, Err(CANCELLED_BEFORE_START.to_string()));
        return;
    };

    tracing::info!(job_id = %id, worker, "Job started");
    shared.publish(JobEvent::Started { job_id: id.clone() });

    let ctx = JobContext::new(id.clone(), Arc::clone(shared), token);
    let outcome = match AssertUnwindSafe(task(ctx)).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(panic) => Err(panic_message(panic)),
    };

    shared.finish(&id, outcome);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("job panicked: {detail}"),
        None => "job panicked".to_string(),
    }
}
