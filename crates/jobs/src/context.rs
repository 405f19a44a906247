use std::fmt;
use std::sync::Arc;

use amp_core::types::JobId;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::events::JobEvent;
use crate::job::LogLine;
use crate::queue::Shared;

/// Handle given to a running job for reporting progress and observing
/// cancellation.
#[derive(Clone)]
pub struct JobContext {
    job_id: JobId,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(job_id: JobId, shared: Arc<Shared>, cancel: CancellationToken) -> Self {
        Self {
            job_id,
            shared,
            cancel,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Record progress in `[0.0, 1.0]`. Out-of-range values are clamped
    /// and NaN counts as zero. Nothing is recorded or published once the
    /// job has finished.
    pub fn set_progress(&self, progress: f32) {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };

        let step = self.shared.with_live_job(&self.job_id, |job| {
            job.progress = progress;
            job.current_step.clone()
        });

        if let Some(step) = step {
            self.shared.publish(JobEvent::Progress {
                job_id: self.job_id.clone(),
                progress,
                step,
            });
        }
    }

    /// Set the human-readable current step. The step is also logged.
    pub fn set_step(&self, step: impl Into<String>) {
        let step = step.into();
        let live = self.shared.with_live_job(&self.job_id, |job| {
            job.current_step = Some(step.clone());
        });
        if live.is_some() {
            self.log(step);
        }
    }

    /// Append a timestamped log line, keeping only the most recent ones.
    /// Ignored once the job has finished.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        let capacity = self.shared.config.log_capacity;
        tracing::debug!(job_id = %self.job_id, message = %message, "Job log");

        self.shared.with_live_job(&self.job_id, |job| {
            job.logs.push(LogLine {
                at: Utc::now(),
                message,
            });
            if job.logs.len() > capacity {
                let excess = job.logs.len() - capacity;
                job.logs.drain(..excess);
            }
        });
    }

    /// Token fired by [`JobQueue::cancel`](crate::JobQueue::cancel) or
    /// queue shutdown. Jobs decide how to react.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
