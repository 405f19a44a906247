//! Job data model: specs, statuses, snapshots and aggregate views.

use std::collections::BTreeMap;
use std::time::Duration;

use amp_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lowest accepted priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest accepted priority.
pub const MAX_PRIORITY: u8 = 10;
/// Priority of a job submitted without one.
pub const DEFAULT_PRIORITY: u8 = 5;

// ---------------------------------------------------------------------------
// JobType / JobStatus
// ---------------------------------------------------------------------------

/// What kind of work a job does. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Image,
    Video,
    Text,
    Product,
    Campaign,
    Blog,
    Workflow,
    Batch,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Text => "text",
            Self::Product => "product",
            Self::Campaign => "campaign",
            Self::Blog => "blog",
            Self::Workflow => "workflow",
            Self::Batch => "batch",
        }
    }
}

/// Job lifecycle: `pending -> running -> {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// JobSpec
// ---------------------------------------------------------------------------

/// Submission-time description of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub job_type: JobType,
    pub description: String,
    /// 1 (lowest) to 10 (highest).
    pub priority: u8,
    /// Submitting surface, e.g. a UI tab or the CLI.
    pub source: Option<String>,
    pub metadata: Value,
}

impl JobSpec {
    pub fn new(job_type: JobType, description: impl Into<String>) -> Self {
        Self {
            job_type,
            description: description.into(),
            priority: DEFAULT_PRIORITY,
            source: None,
            metadata: Value::Null,
        }
    }

    /// Set the priority, clamped to `1..=10`.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = clamp_priority(priority);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

pub fn clamp_priority(priority: u8) -> u8 {
    priority.clamp(MIN_PRIORITY, MAX_PRIORITY)
}

// ---------------------------------------------------------------------------
// JobSnapshot
// ---------------------------------------------------------------------------

/// One timestamped job log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    pub at: Timestamp,
    pub message: String,
}

/// Point-in-time copy of a job's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub job_type: JobType,
    pub description: String,
    pub status: JobStatus,
    /// In `[0.0, 1.0]`.
    pub progress: f32,
    pub current_step: Option<String>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub priority: u8,
    pub source: Option<String>,
    pub metadata: Value,
    pub logs: Vec<LogLine>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl JobSnapshot {
    pub(crate) fn pending(id: JobId, spec: JobSpec, now: Timestamp) -> Self {
        Self {
            id,
            job_type: spec.job_type,
            description: spec.description,
            status: JobStatus::Pending,
            progress: 0.0,
            current_step: None,
            result: None,
            error: None,
            priority: clamp_priority(spec.priority),
            source: spec.source,
            metadata: spec.metadata,
            logs: Vec::new(),
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Run time from start to completion, once both are known.
    pub fn duration(&self) -> Option<Duration> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        (completed - started).to_std().ok()
    }
}

// ---------------------------------------------------------------------------
// Filters and aggregates
// ---------------------------------------------------------------------------

/// Criteria for [`JobQueue::list_jobs`](crate::JobQueue::list_jobs).
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    pub source: Option<String>,
    pub job_type: Option<JobType>,
    pub status: Option<JobStatus>,
}

impl JobFilter {
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, job: &JobSnapshot) -> bool {
        self.source
            .as_deref()
            .map_or(true, |s| job.source.as_deref() == Some(s))
            && self.job_type.map_or(true, |t| job.job_type == t)
            && self.status.map_or(true, |s| job.status == s)
    }
}

/// Queue-wide counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub by_type: BTreeMap<JobType, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub max_concurrent: usize,
}

impl QueueStats {
    pub(crate) fn record(&mut self, job: &JobSnapshot) {
        match job.status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
        }
        self.total += 1;
        *self.by_type.entry(job.job_type).or_default() += 1;
        if let Some(source) = &job.source {
            *self.by_source.entry(source.clone()).or_default() += 1;
        }
    }
}

/// Summary of a waited-on batch of jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub completed: usize,
    pub failed: usize,
    /// Number of ids waited on, including unknown and unfinished ones.
    pub total: usize,
    /// `completed / total`, or `0.0` for an empty batch.
    pub success_rate: f64,
    pub duration: Duration,
}
