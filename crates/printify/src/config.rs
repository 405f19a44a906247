use std::time::Duration;

use amp_core::env::{env_non_empty, env_or};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.printify.com/v1";

/// Timeout applied to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Printify client configuration.
#[derive(Debug, Clone)]
pub struct PrintifyConfig {
    pub api_token: String,
    /// Base URL without trailing slash.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl PrintifyConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                        | Default                        |
    /// |--------------------------------|--------------------------------|
    /// | `PRINTIFY_API_TOKEN`           | required                       |
    /// | `PRINTIFY_API_BASE_URL`        | `https://api.printify.com/v1`  |
    /// | `PRINTIFY_REQUEST_TIMEOUT_SECS`| `30`                           |
    ///
    /// Returns `None` when no token is set.
    pub fn from_env() -> Option<Self> {
        let api_token = env_non_empty("PRINTIFY_API_TOKEN")?;
        let base_url = env_non_empty("PRINTIFY_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = env_or(
            "PRINTIFY_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        );

        Some(
            Self::new(api_token)
                .with_base_url(base_url)
                .with_request_timeout(Duration::from_secs(timeout_secs)),
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
