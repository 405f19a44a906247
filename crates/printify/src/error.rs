/// Errors from the Printify REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum PrintifyError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, or a
    /// body that did not decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Printify returned a non-2xx status code.
    #[error("Printify API error ({status}): {body}")]
    Api {
        status: u16,
        /// Response body, truncated to 200 characters.
        body: String,
    },

    /// A lookup found nothing matching.
    #[error("Not found: {0}")]
    NotFound(String),
}
