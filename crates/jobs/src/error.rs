/// Errors returned by queue operations.
///
/// Job failures are not errors here: they are recorded on the job.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue was shut down and accepts no new work.
    #[error("Job queue is shut down")]
    ShutDown,
}
