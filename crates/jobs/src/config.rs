use amp_core::env::env_or;

/// Default number of concurrently running jobs.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default broadcast buffer for job events.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Log lines kept per job; older lines are dropped first.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Job queue configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Worker tasks, and therefore the bound on running jobs.
    pub max_concurrent: usize,
    /// Broadcast channel capacity. Slow subscribers observe `Lagged`.
    pub event_capacity: usize,
    /// Per-job log ring size.
    pub log_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl QueueConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `JOB_QUEUE_MAX_CONCURRENT` | `10`    |
    pub fn from_env() -> Self {
        Self::default().with_max_concurrent(env_or("JOB_QUEUE_MAX_CONCURRENT", DEFAULT_MAX_CONCURRENT))
    }

    /// Set the worker count. Zero is raised to one.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }
}
