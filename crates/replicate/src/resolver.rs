//! Model version resolution with a per-client cache.
//!
//! Pinned references resolve locally. Unpinned references are looked up
//! once via `GET {base}/models/{owner}/{name}` and cached for the
//! lifetime of the resolver. Entries are never invalidated, so a model
//! that publishes a new version keeps resolving to the old one until the
//! client is rebuilt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use amp_core::text::truncate_body;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::ReplicateError;
use crate::model_ref::ModelRef;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Deserialize)]
struct ModelInfo {
    #[serde(default)]
    latest_version: Option<VersionInfo>,
    #[serde(default)]
    default_version: Option<VersionInfo>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(default)]
    id: Option<String>,
}

/// Maps `owner/name` to a version id.
pub struct ModelResolver {
    transport: Arc<dyn Transport>,
    base_url: String,
    has_token: bool,
    request_timeout: Duration,
    cache: RwLock<HashMap<String, String>>,
}

impl ModelResolver {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        has_token: bool,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            has_token,
            request_timeout,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a model reference string to a version id.
    pub async fn resolve(&self, reference: &str) -> Result<String, ReplicateError> {
        let model: ModelRef = reference.parse()?;
        if let Some(version) = model.version_id {
            return Ok(version);
        }

        let slug = model.slug();
        let cached = self.cache.read().get(&slug).cloned();
        if let Some(version_id) = cached {
            return Ok(version_id);
        }

        if !self.has_token {
            return Err(ReplicateError::Configuration(
                "resolve model version".to_string(),
            ));
        }

        let url = format!("{}/models/{}/{}", self.base_url, model.owner, model.name);
        let response = self
            .transport
            .execute(ApiRequest::get(url).with_timeout(self.request_timeout))
            .await?;

        if response.status != 200 {
            return Err(ReplicateError::Resolution {
                model: slug,
                detail: truncate_body(&response.body),
            });
        }

        let info: ModelInfo = response.json().map_err(|e| ReplicateError::Resolution {
            model: slug.clone(),
            detail: format!("unparseable model info: {e}"),
        })?;

        let version_id = info
            .latest_version
            .and_then(|v| v.id)
            .or_else(|| info.default_version.and_then(|v| v.id))
            .ok_or_else(|| ReplicateError::Resolution {
                model: slug.clone(),
                detail: "model did not provide a latest version".to_string(),
            })?;

        tracing::debug!(model = %slug, version_id = %version_id, "Resolved model version");
        self.cache.write().insert(slug, version_id.clone());
        Ok(version_id)
    }

    /// Number of cached `owner/name` entries.
    pub fn cached_versions(&self) -> usize {
        self.cache.read().len()
    }
}
