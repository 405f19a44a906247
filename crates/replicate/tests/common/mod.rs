#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use amp_replicate::transport::TransportError;
use amp_replicate::{ApiRequest, ApiResponse, HttpMethod, ReplicateConfig, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const BASE: &str = "http://mock/v1";
pub const STATUS_URL: &str = "http://mock/v1/predictions/p1";
pub const CANCEL_URL: &str = "http://mock/v1/predictions/p1/cancel";

type Handler = dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync;

/// In-memory [`Transport`] that answers every request with a handler and
/// records what was asked.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    seen: Mutex<Vec<(HttpMethod, String, Option<Value>)>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Number of requests with `method` whose URL ends with `suffix`.
    pub fn count(&self, method: HttpMethod, suffix: &str) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|(m, url, _)| *m == method && url.ends_with(suffix))
            .count()
    }

    pub fn total(&self) -> usize {
        self.seen.lock().len()
    }

    /// Bodies of every `POST` to `suffix`, in order.
    pub fn posted(&self, suffix: &str) -> Vec<Value> {
        self.seen
            .lock()
            .iter()
            .filter(|(m, url, _)| *m == HttpMethod::Post && url.ends_with(suffix))
            .filter_map(|(_, _, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.seen
            .lock()
            .push((request.method, request.url.clone(), request.body.clone()));
        Ok((self.handler)(&request))
    }
}

/// Config pointing at the scripted base URL, with a token set.
pub fn test_config() -> ReplicateConfig {
    ReplicateConfig::default()
        .with_token("r8_test")
        .with_base_url(BASE)
}

/// Prediction body with both polling URLs.
pub fn prediction(status: &str, output: Value) -> ApiResponse {
    ApiResponse::new(
        200,
        json!({
            "id": "p1",
            "status": status,
            "urls": {"get": STATUS_URL, "cancel": CANCEL_URL},
            "output": output,
            "error": null,
        })
        .to_string(),
    )
}

/// Prediction creation response (`201`, still starting).
pub fn created() -> ApiResponse {
    let mut response = prediction("starting", Value::Null);
    response.status = 201;
    response
}

pub fn model_info(version: &str) -> ApiResponse {
    ApiResponse::new(200, json!({"latest_version": {"id": version}}).to_string())
}

pub fn is(request: &ApiRequest, method: HttpMethod, suffix: &str) -> bool {
    request.method == method && request.url.ends_with(suffix)
}

pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}
