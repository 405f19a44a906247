//! Wire types for the prediction resource.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Remote prediction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    /// Missing or unrecognized status. Treated as terminal non-success.
    #[default]
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    /// `starting` and `processing` keep the poller going.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Starting | Self::Processing)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_in_flight()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

/// Polling and cancellation endpoints for a prediction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionUrls {
    #[serde(default)]
    pub get: Option<String>,
    #[serde(default)]
    pub cancel: Option<String>,
}

/// One prediction as returned by submission and status endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: PredictionStatus,
    #[serde(default)]
    pub urls: Option<PredictionUrls>,
    /// Opaque model output: string, list, object, or null.
    #[serde(default)]
    pub output: serde_json::Value,
    /// Usually a string, occasionally a structured object.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    /// RFC 3339 creation time reported by the API.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Prediction {
    pub fn status_url(&self) -> Option<&str> {
        self.urls.as_ref().and_then(|u| u.get.as_deref())
    }

    pub fn cancel_url(&self) -> Option<&str> {
        self.urls.as_ref().and_then(|u| u.cancel.as_deref())
    }

    /// Time since the API created this prediction. `None` when
    /// `created_at` is missing or unparseable.
    pub fn elapsed(&self) -> Option<Duration> {
        let created = DateTime::parse_from_rfc3339(self.created_at.as_deref()?).ok()?;
        (Utc::now() - created.with_timezone(&Utc)).to_std().ok()
    }

    /// Remote error rendered as text, if any.
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}
