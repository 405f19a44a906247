//! Long-running prediction polling.
//!
//! A submitted prediction is polled at a fixed interval until it leaves
//! `starting`/`processing`. The wall-clock budget is checked before every
//! sleep. Whenever polling gives up before a terminal status (budget
//! spent, caller cancelled, status request failed) a single best-effort
//! cancel request is sent first, so a rate-limited poll never leaves a
//! prediction running when the caller retries with a fresh one.

use std::time::Duration;

use amp_core::text::truncate_body;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CANCEL_REQUEST_TIMEOUT;
use crate::error::ReplicateError;
use crate::prediction::{Prediction, PredictionStatus, PredictionUrls};
use crate::transport::{ApiRequest, Transport, TransportOutcome};

/// Cooperative cancellation handle. Cloning shares the same signal.
pub type CancelHandle = CancellationToken;

/// Polling cadence and budget for one prediction.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
    /// Per-request HTTP timeout for status calls.
    pub request_timeout: Duration,
}

/// Poll `submitted` until it reaches a terminal status.
///
/// Returns the raw `output` of a `succeeded` prediction. Any other
/// terminal status maps to [`ReplicateError::Generation`].
pub async fn poll_until_terminal(
    transport: &dyn Transport,
    submitted: Prediction,
    config: PollConfig,
    cancel: Option<&CancelHandle>,
) -> Result<Value, ReplicateError> {
    let started = Instant::now();
    let mut prediction = submitted;
    let mut urls = prediction.urls.clone().unwrap_or_default();
    let prediction_id = prediction.id.clone().unwrap_or_default();

    while prediction.status.is_in_flight() {
        if started.elapsed() > config.timeout {
            tracing::warn!(
                prediction_id = %prediction_id,
                timeout_secs = config.timeout.as_secs(),
                "Prediction exceeded poll budget, cancelling",
            );
            send_cancel(transport, urls.cancel.as_deref()).await;
            return Err(ReplicateError::Timeout {
                after_secs: config.timeout.as_secs(),
            });
        }

        let status_url = urls
            .get
            .clone()
            .ok_or_else(|| ReplicateError::Protocol("prediction has no status URL".into()))?;

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::info!(prediction_id = %prediction_id, "Prediction cancelled by caller");
                        send_cancel(transport, urls.cancel.as_deref()).await;
                        return Err(ReplicateError::Cancelled);
                    }
                    _ = tokio::time::sleep(config.interval) => {}
                }
            }
            None => tokio::time::sleep(config.interval).await,
        }

        prediction = match fetch_status(transport, &status_url, config.request_timeout).await {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::warn!(
                    prediction_id = %prediction_id,
                    elapsed_secs = started.elapsed().as_secs(),
                    error = %e,
                    "Status poll failed, abandoning prediction",
                );
                send_cancel(transport, urls.cancel.as_deref()).await;
                return Err(e);
            }
        };
        merge_urls(&mut urls, prediction.urls.take());

        tracing::debug!(
            prediction_id = %prediction_id,
            status = prediction.status.as_str(),
            elapsed_secs = started.elapsed().as_secs(),
            "Polled prediction",
        );
    }

    tracing::info!(
        prediction_id = %prediction_id,
        status = prediction.status.as_str(),
        elapsed_secs = prediction
            .elapsed()
            .unwrap_or_else(|| started.elapsed())
            .as_secs(),
        "Prediction settled",
    );

    match prediction.status {
        PredictionStatus::Succeeded => Ok(prediction.output),
        status => Err(ReplicateError::Generation(
            prediction
                .error_message()
                .unwrap_or_else(|| status.as_str().to_string()),
        )),
    }
}

async fn fetch_status(
    transport: &dyn Transport,
    url: &str,
    timeout: Duration,
) -> Result<Prediction, ReplicateError> {
    let response = transport
        .execute(ApiRequest::get(url).with_timeout(timeout))
        .await?;

    match TransportOutcome::classify_status(response) {
        TransportOutcome::Ok(response) => response.json().map_err(|e| {
            ReplicateError::Protocol(format!("unparseable prediction status: {e}"))
        }),
        TransportOutcome::RateLimited(response) => {
            Err(ReplicateError::RateLimited(truncate_body(&response.body)))
        }
        TransportOutcome::HardFailure(response) => Err(ReplicateError::Protocol(format!(
            "status request failed ({}): {}",
            response.status,
            truncate_body(&response.body)
        ))),
    }
}

/// Later responses may omit `urls`; keep whatever was already known.
fn merge_urls(known: &mut PredictionUrls, fresh: Option<PredictionUrls>) {
    if let Some(fresh) = fresh {
        if fresh.get.is_some() {
            known.get = fresh.get;
        }
        if fresh.cancel.is_some() {
            known.cancel = fresh.cancel;
        }
    }
}

/// Fire one cancel request. Failures are logged and swallowed.
async fn send_cancel(transport: &dyn Transport, cancel_url: Option<&str>) {
    let Some(url) = cancel_url else {
        tracing::debug!("No cancel URL; remote prediction left running");
        return;
    };

    let request = ApiRequest::post(url, None).with_timeout(CANCEL_REQUEST_TIMEOUT);
    match transport.execute(request).await {
        Ok(response) if response.is_success() => {
            tracing::debug!(cancel_url = url, "Remote prediction cancelled");
        }
        Ok(response) => {
            tracing::debug!(cancel_url = url, status = response.status, "Cancel request rejected");
        }
        Err(e) => {
            tracing::debug!(cancel_url = url, error = %e, "Cancel request failed");
        }
    }
}
