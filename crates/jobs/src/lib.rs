//! In-process background job queue.
//!
//! Jobs are async closures submitted with a [`JobSpec`]. A fixed pool of
//! worker tasks runs them highest priority first, records progress,
//! logs and results in a lock-guarded job table, and broadcasts
//! lifecycle [`JobEvent`]s. A failing or panicking job is marked
//! `failed` and never takes its worker down.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod job;
pub mod queue;

pub use config::QueueConfig;
pub use context::JobContext;
pub use error::QueueError;
pub use events::JobEvent;
pub use job::{BatchOutcome, JobFilter, JobSnapshot, JobSpec, JobStatus, JobType, LogLine, QueueStats};
pub use queue::JobQueue;
