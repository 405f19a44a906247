//! HTTP seam for the inference client.
//!
//! [`Transport`] is the only place that touches the network. The
//! production implementation, [`ReqwestTransport`], wraps a pooled
//! [`reqwest::Client`] with the `Authorization: Token ...` header
//! preinstalled. Responses are reduced to a status code and body text
//! and classified into a [`TransportOutcome`] so that retry decisions
//! branch on structured data.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::error::is_throttled_text;

/// Default timeout for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP methods used by the inference API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A single request against the inference API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    /// JSON body, sent only with `POST`.
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn post(url: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Status code and raw body text of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Structured classification of an API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// 2xx without a rate-limit marker.
    Ok(ApiResponse),
    /// HTTP 429, or (for submissions) a body mentioning "throttled".
    RateLimited(ApiResponse),
    /// Any other non-2xx response.
    HardFailure(ApiResponse),
}

impl TransportOutcome {
    /// Classify a submission response.
    ///
    /// The "throttled" body check runs before the status check, so a 2xx
    /// body carrying the marker is still treated as rate limited.
    pub fn classify(response: ApiResponse) -> Self {
        if is_throttled_text(&response.body) {
            Self::RateLimited(response)
        } else {
            Self::classify_status(response)
        }
    }

    /// Classify by HTTP status alone. Used for status polls, whose bodies
    /// carry model output and logs.
    pub fn classify_status(response: ApiResponse) -> Self {
        if response.status == 429 {
            Self::RateLimited(response)
        } else if response.is_success() {
            Self::Ok(response)
        } else {
            Self::HardFailure(response)
        }
    }
}

/// Errors raised before any HTTP response was received.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API token cannot be used as a header value.
    #[error("Invalid API token header value")]
    InvalidToken,

    /// Failure reported by a non-reqwest transport.
    #[error("Transport failure: {0}")]
    Other(String),
}

/// Executes API requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// [`Transport`] backed by a pooled [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport that authenticates every request with
    /// `Authorization: Token <api_token>` when a token is given.
    pub fn new(api_token: Option<&str>) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = api_token {
            let mut value = HeaderValue::from_str(&format!("Token {token}"))
                .map_err(|_| TransportError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (useful for sharing a connection pool).
    /// The client must already carry any authentication headers.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.timeout(request.timeout).send().await?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        Ok(ApiResponse { status, body })
    }
}
