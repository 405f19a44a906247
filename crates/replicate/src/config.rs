use std::path::PathBuf;
use std::time::Duration;

use amp_core::backoff::BackoffConfig;
use amp_core::env::{env_non_empty, env_or};

use crate::transport::DEFAULT_REQUEST_TIMEOUT;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// Fixed interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Poll ceiling for media (image/video/audio) predictions. Sized for
/// video-class workloads.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(900);

/// Poll ceiling for text predictions.
pub const DEFAULT_TEXT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the best-effort cancel request.
pub const CANCEL_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Inference client configuration.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    /// API token. Required for any network call.
    pub api_token: Option<String>,
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Sleep between status polls.
    pub poll_interval: Duration,
    /// Wall-clock ceiling for media predictions.
    pub poll_timeout: Duration,
    /// Wall-clock ceiling for text predictions.
    pub text_poll_timeout: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Rate-limit backoff schedule and retry budget.
    pub backoff: BackoffConfig,
    /// Directory for byte-blob outputs persisted as files.
    pub output_dir: PathBuf,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            text_poll_timeout: DEFAULT_TEXT_POLL_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff: BackoffConfig::default(),
            output_dir: std::env::temp_dir(),
        }
    }
}

impl ReplicateConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                                 | Default                        |
    /// |-----------------------------------------|--------------------------------|
    /// | `REPLICATE_API_TOKEN`                   | unset                          |
    /// | `REPLICATE_API_BASE_URL`                | `https://api.replicate.com/v1` |
    /// | `REPLICATE_POLL_INTERVAL_SECS`          | `2`                            |
    /// | `REPLICATE_POLL_TIMEOUT_SECS`           | `900`                          |
    /// | `REPLICATE_TEXT_POLL_TIMEOUT_SECS`      | `120`                          |
    /// | `REPLICATE_MAX_RETRIES`                 | `3`                            |
    /// | `REPLICATE_RATE_LIMIT_BASE_DELAY_SECS`  | `12`                           |
    /// | `AMP_OUTPUT_DIR`                        | system temp dir                |
    ///
    /// Unparseable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_token = env_non_empty("REPLICATE_API_TOKEN");

        let base_url = env_non_empty("REPLICATE_API_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let backoff = BackoffConfig {
            base_delay: Duration::from_secs(env_or(
                "REPLICATE_RATE_LIMIT_BASE_DELAY_SECS",
                defaults.backoff.base_delay.as_secs(),
            )),
            max_retries: env_or("REPLICATE_MAX_RETRIES", defaults.backoff.max_retries),
            ..defaults.backoff
        };

        let output_dir = env_non_empty("AMP_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        Self {
            api_token,
            base_url,
            poll_interval: Duration::from_secs(env_or(
                "REPLICATE_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )),
            poll_timeout: Duration::from_secs(env_or(
                "REPLICATE_POLL_TIMEOUT_SECS",
                defaults.poll_timeout.as_secs(),
            )),
            text_poll_timeout: Duration::from_secs(env_or(
                "REPLICATE_TEXT_POLL_TIMEOUT_SECS",
                defaults.text_poll_timeout.as_secs(),
            )),
            request_timeout: defaults.request_timeout,
            backoff,
            output_dir,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}
