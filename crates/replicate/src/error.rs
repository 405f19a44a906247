//! Error taxonomy for the hosted inference client.

use amp_core::text::contains_ignore_case;

use crate::transport::TransportError;

/// Marker the remote API uses in rate-limit responses and error texts.
const THROTTLED_MARKER: &str = "throttled";

/// Errors from resolving, submitting, or polling a prediction.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateError {
    /// A required credential is missing. Not retried automatically.
    #[error("Replicate API token not set; cannot {0}")]
    Configuration(String),

    /// The model reference is not `owner/name` or `owner/name:version`.
    #[error("Invalid model reference '{0}'")]
    InvalidModelRef(String),

    /// Caller-supplied parameters cannot form a valid request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The model name could not be mapped to a version id.
    #[error("Failed to resolve version for {model}: {detail}")]
    Resolution { model: String, detail: String },

    /// The prediction request was rejected.
    #[error("Initial request failed ({status}): {body}")]
    Submission { status: u16, body: String },

    /// A single rate-limited response. Retried by the backoff wrapper.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Retries were exhausted while backing off from rate limits.
    #[error("Rate limit exceeded after {retries} retries: {last}")]
    RateLimitExceeded { retries: u32, last: String },

    /// The remote API broke the polling contract.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The local wall-clock budget ran out.
    #[error("Prediction timed out after {after_secs}s. The API may be overloaded.")]
    Timeout { after_secs: u64 },

    /// The caller cancelled the operation between polls.
    #[error("Prediction cancelled")]
    Cancelled,

    /// The prediction reached a terminal failure state.
    #[error("Prediction failed: {0}")]
    Generation(String),

    /// The prediction succeeded but nothing usable could be extracted.
    #[error("No usable output: {0}")]
    NoOutput(String),

    /// The HTTP request itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ReplicateError {
    /// Whether the rate-limit wrapper should back off and retry.
    ///
    /// Structured [`ReplicateError::RateLimited`] is always retryable.
    /// Any other error whose message mentions "throttled" is too: the
    /// remote API sometimes reports throttling only in free-form error
    /// text. That substring match is a known weakness kept for
    /// compatibility with those responses.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::RateLimitExceeded { .. }
            | Self::Configuration(_)
            | Self::InvalidModelRef(_)
            | Self::InvalidInput(_)
            | Self::Cancelled => false,
            other => is_throttled_text(&other.to_string()),
        }
    }

    /// Remote text to carry into [`ReplicateError::RateLimitExceeded`].
    pub fn rate_limit_text(&self) -> String {
        match self {
            Self::RateLimited(body) => body.clone(),
            other => other.to_string(),
        }
    }

    /// User-facing message, prefixed with an error glyph.
    pub fn user_message(&self) -> String {
        format!("❌ {self}")
    }
}

/// Case-insensitive "throttled" heuristic shared by the transport
/// classifier and the retry wrapper.
pub fn is_throttled_text(text: &str) -> bool {
    contains_ignore_case(text, THROTTLED_MARKER)
}
