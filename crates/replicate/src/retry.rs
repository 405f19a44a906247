//! Rate-limit retry wrapper.
//!
//! Wraps a whole operation (resolve, submit, poll) rather than a single
//! request, so throttling surfaced anywhere in the run is retried the
//! same way.

use std::future::Future;

use amp_core::backoff::BackoffConfig;
use amp_core::text::truncate_body;

use crate::error::ReplicateError;
use crate::poller::CancelHandle;

/// Run `operation` and retry it while it fails with a rate-limit error.
///
/// `operation` receives the 1-based attempt number. Delays follow
/// `backoff` (12 s, 24 s, 48 s by default). After `backoff.max_retries`
/// retries the last rate-limit text is returned inside
/// [`ReplicateError::RateLimitExceeded`]. Non-rate-limit errors are
/// returned immediately. A fired `cancel` handle interrupts the backoff
/// sleep with [`ReplicateError::Cancelled`].
pub async fn with_rate_limit_retry<T, F, Fut>(
    backoff: &BackoffConfig,
    cancel: Option<&CancelHandle>,
    mut operation: F,
) -> Result<T, ReplicateError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ReplicateError>>,
{
    let mut retries = 0u32;

    loop {
        let attempt = retries + 1;
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() => err,
            Err(err) => return Err(err),
        };

        if retries >= backoff.max_retries {
            tracing::error!(attempt, retries, "Rate limit retries exhausted");
            return Err(ReplicateError::RateLimitExceeded {
                retries,
                last: truncate_body(&err.rate_limit_text()),
            });
        }

        retries += 1;
        let delay = backoff.delay_for_retry(retries);
        tracing::warn!(
            attempt,
            delay_secs = delay.as_secs(),
            error = %err,
            "Rate limited, backing off",
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(ReplicateError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
}
