//! Job lifecycle events broadcast to subscribers.

use amp_core::types::JobId;
use serde::Serialize;

use crate::job::JobType;

/// A change in a job's lifecycle.
///
/// Serializes with a `type` tag equal to [`JobEvent::msg_type`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    #[serde(rename = "job_submitted")]
    Submitted { job_id: JobId, job_type: JobType },

    #[serde(rename = "job_started")]
    Started { job_id: JobId },

    #[serde(rename = "job_progress")]
    Progress {
        job_id: JobId,
        progress: f32,
        step: Option<String>,
    },

    #[serde(rename = "job_completed")]
    Completed { job_id: JobId },

    #[serde(rename = "job_failed")]
    Failed { job_id: JobId, error: String },
}

impl JobEvent {
    /// Wire message type name.
    pub fn msg_type(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "job_submitted",
            Self::Started { .. } => "job_started",
            Self::Progress { .. } => "job_progress",
            Self::Completed { .. } => "job_completed",
            Self::Failed { .. } => "job_failed",
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            Self::Submitted { job_id, .. }
            | Self::Started { job_id }
            | Self::Progress { job_id, .. }
            | Self::Completed { job_id }
            | Self::Failed { job_id, .. } => job_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_tag_matches_msg_type() {
        let events = [
            JobEvent::Submitted {
                job_id: "a".into(),
                job_type: JobType::Image,
            },
            JobEvent::Started { job_id: "a".into() },
            JobEvent::Progress {
                job_id: "a".into(),
                progress: 0.5,
                step: Some("polling".into()),
            },
            JobEvent::Completed { job_id: "a".into() },
            JobEvent::Failed {
                job_id: "a".into(),
                error: "boom".into(),
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.msg_type());
            assert_eq!(json["job_id"], "a");
        }
    }
}
