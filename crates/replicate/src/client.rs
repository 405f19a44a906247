//! High-level inference client.
//!
//! [`ReplicateClient::run_model_with`] is the core operation: resolve the
//! model version, submit a prediction, and poll it to completion, with
//! the whole sequence wrapped in the rate-limit retry. The typed helpers
//! (`generate_image`, `generate_text`, ...) build model-specific inputs
//! and normalize the output into a URL or text.

use std::sync::Arc;
use std::time::Duration;

use amp_core::backoff::BackoffConfig;
use amp_core::text::truncate_body;
use serde_json::Value;

use crate::config::ReplicateConfig;
use crate::error::ReplicateError;
use crate::input::{InputValue, ModelInput};
use crate::output::{text_from_output, OutputNormalizer};
use crate::poller::{poll_until_terminal, CancelHandle, PollConfig};
use crate::prediction::Prediction;
use crate::requests::{ImageRequest, SpeechRequest, TextRequest, VideoRequest};
use crate::resolver::ModelResolver;
use crate::retry::with_rate_limit_retry;
use crate::transport::{ApiRequest, ReqwestTransport, Transport, TransportOutcome};

pub const DEFAULT_IMAGE_MODEL: &str = "prunaai/flux-fast";
pub const DEFAULT_TEXT_MODEL: &str = "meta/meta-llama-3-70b-instruct";
pub const FAST_TEXT_MODEL: &str = "meta/meta-llama-3-8b-instruct";
pub const DEFAULT_VIDEO_MODEL: &str = "kwaivgi/kling-v2.5-turbo-pro";
pub const DEFAULT_SPEECH_MODEL: &str = "minimax/speech-02-hd";
pub const DEFAULT_VISION_MODEL: &str = "salesforce/blip";

/// Per-call overrides for [`ReplicateClient::run_model_with`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Poll budget. Defaults to the config's media or text ceiling.
    pub timeout: Option<Duration>,
    /// Rate-limit retries. Defaults to the config's backoff budget.
    pub max_retries: Option<u32>,
    /// Cooperative cancellation, checked between polls and during backoff.
    pub cancel: Option<CancelHandle>,
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn or_timeout(mut self, default: Duration) -> Self {
        self.timeout.get_or_insert(default);
        self
    }
}

/// Client for a Replicate-style hosted inference API.
///
/// Owns its version cache; share one instance via `Arc` rather than
/// building a client per call.
pub struct ReplicateClient {
    config: ReplicateConfig,
    transport: Arc<dyn Transport>,
    resolver: ModelResolver,
    normalizer: OutputNormalizer,
    image_model: String,
}

impl ReplicateClient {
    /// Build a client with the production HTTP transport.
    pub fn new(config: ReplicateConfig) -> Result<Self, ReplicateError> {
        let transport = ReqwestTransport::new(config.api_token.as_deref())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client over an arbitrary transport.
    pub fn with_transport(config: ReplicateConfig, transport: Arc<dyn Transport>) -> Self {
        let resolver = ModelResolver::new(
            Arc::clone(&transport),
            config.base_url.clone(),
            config.api_token.is_some(),
            config.request_timeout,
        );
        let normalizer = OutputNormalizer::new(config.output_dir.clone());
        Self {
            config,
            transport,
            resolver,
            normalizer,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    /// Override the model used by [`generate_image`](Self::generate_image).
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn config(&self) -> &ReplicateConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &OutputNormalizer {
        &self.normalizer
    }

    pub fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    /// Resolve `owner/name[:version]` to a version id.
    pub async fn resolve_version(&self, reference: &str) -> Result<String, ReplicateError> {
        self.resolver.resolve(reference).await
    }

    /// Run a model with default options and return its raw output.
    pub async fn run_model(&self, model: &str, input: &ModelInput) -> Result<Value, ReplicateError> {
        self.run_model_with(model, input, RunOptions::default()).await
    }

    /// Run a model and return its raw output.
    ///
    /// Resolution, submission and polling are retried as a unit when any
    /// of them is rate limited.
    pub async fn run_model_with(
        &self,
        model: &str,
        input: &ModelInput,
        options: RunOptions,
    ) -> Result<Value, ReplicateError> {
        let prepared = Value::Object(input.prepare());
        let prepared = &prepared;

        let backoff = BackoffConfig {
            max_retries: options
                .max_retries
                .unwrap_or(self.config.backoff.max_retries),
            ..self.config.backoff.clone()
        };
        let poll = PollConfig {
            interval: self.config.poll_interval,
            timeout: options.timeout.unwrap_or(self.config.poll_timeout),
            request_timeout: self.config.request_timeout,
        };
        let cancel = options.cancel.as_ref();

        with_rate_limit_retry(&backoff, cancel, |attempt| {
            self.run_once(model, prepared, poll, cancel, attempt)
        })
        .await
    }

    async fn run_once(
        &self,
        model: &str,
        input: &Value,
        poll: PollConfig,
        cancel: Option<&CancelHandle>,
        attempt: u32,
    ) -> Result<Value, ReplicateError> {
        if self.config.api_token.is_none() {
            return Err(ReplicateError::Configuration("run model".to_string()));
        }

        let version = self.resolver.resolve(model).await?;
        let body = serde_json::json!({ "version": version, "input": input });
        let request = ApiRequest::post(format!("{}/predictions", self.config.base_url), Some(body))
            .with_timeout(self.config.request_timeout);

        let response = match TransportOutcome::classify(self.transport.execute(request).await?) {
            TransportOutcome::Ok(response) if matches!(response.status, 200 | 201) => response,
            TransportOutcome::RateLimited(response) => {
                return Err(ReplicateError::RateLimited(truncate_body(&response.body)));
            }
            TransportOutcome::Ok(response) | TransportOutcome::HardFailure(response) => {
                return Err(ReplicateError::Submission {
                    status: response.status,
                    body: truncate_body(&response.body),
                });
            }
        };

        let prediction: Prediction = response.json().map_err(|e| {
            ReplicateError::Protocol(format!("unparseable prediction: {e}"))
        })?;

        tracing::info!(
            model,
            attempt,
            prediction_id = prediction.id.as_deref().unwrap_or_default(),
            status = prediction.status.as_str(),
            "Prediction submitted",
        );

        poll_until_terminal(self.transport.as_ref(), prediction, poll, cancel).await
    }

    // -----------------------------------------------------------------------
    // Typed generation helpers
    // -----------------------------------------------------------------------

    /// Generate an image and return its URL or local file path.
    pub async fn generate_image(
        &self,
        request: &ImageRequest,
        options: RunOptions,
    ) -> Result<String, ReplicateError> {
        let output = self
            .run_model_with(&self.image_model, &request.to_input(), options)
            .await?;
        self.require_url(&output)
    }

    /// Generate text with the full-size model.
    pub async fn generate_text(
        &self,
        request: &TextRequest,
        options: RunOptions,
    ) -> Result<String, ReplicateError> {
        let options = options.or_timeout(self.config.text_poll_timeout);
        let output = self
            .run_model_with(DEFAULT_TEXT_MODEL, &request.to_input(), options)
            .await?;
        Ok(text_from_output(&output))
    }

    /// Generate text with the small model, falling back to the full-size
    /// model on failure.
    pub async fn generate_text_fast(
        &self,
        request: &TextRequest,
        options: RunOptions,
    ) -> Result<String, ReplicateError> {
        let options = options.or_timeout(self.config.text_poll_timeout);
        let output = self
            .run_with_fallback(FAST_TEXT_MODEL, DEFAULT_TEXT_MODEL, &request.to_input(), options)
            .await?;
        Ok(text_from_output(&output))
    }

    /// Generate a short video from a prompt and/or a starting image.
    pub async fn generate_video(
        &self,
        request: &VideoRequest,
        options: RunOptions,
    ) -> Result<String, ReplicateError> {
        if !request.has_source() {
            return Err(ReplicateError::InvalidInput(
                "video generation needs a prompt or an image".to_string(),
            ));
        }
        let output = self
            .run_model_with(DEFAULT_VIDEO_MODEL, &request.to_input(), options)
            .await?;
        self.require_url(&output)
    }

    /// Synthesize speech and return the audio URL.
    pub async fn generate_speech(
        &self,
        request: &SpeechRequest,
        options: RunOptions,
    ) -> Result<String, ReplicateError> {
        if request.text.trim().is_empty() {
            return Err(ReplicateError::InvalidInput("speech text is empty".to_string()));
        }
        let output = self
            .run_model_with(DEFAULT_SPEECH_MODEL, &request.to_input(), options)
            .await?;
        self.require_url(&output)
    }

    /// Ask a question about an image. Falls back to plain captioning when
    /// question answering fails.
    pub async fn analyze_image(
        &self,
        image: impl Into<InputValue>,
        question: &str,
        options: RunOptions,
    ) -> Result<String, ReplicateError> {
        let image = image.into();
        let vqa = ModelInput::new()
            .with("image", image.clone())
            .with("task", "visual_question_answering")
            .with("question", question);

        let output = match self
            .run_model_with(DEFAULT_VISION_MODEL, &vqa, options.clone())
            .await
        {
            Ok(output) => output,
            Err(e) if falls_back(&e) => {
                tracing::debug!(error = %e, "Visual question answering failed, trying captioning");
                let caption = ModelInput::new()
                    .with("image", image)
                    .with("task", "image_captioning");
                self.run_model_with(DEFAULT_VISION_MODEL, &caption, options)
                    .await?
            }
            Err(e) => return Err(e),
        };
        Ok(text_from_output(&output))
    }

    async fn run_with_fallback(
        &self,
        primary: &str,
        fallback: &str,
        input: &ModelInput,
        options: RunOptions,
    ) -> Result<Value, ReplicateError> {
        match self.run_model_with(primary, input, options.clone()).await {
            Ok(output) => Ok(output),
            Err(e) if falls_back(&e) => {
                tracing::warn!(model = primary, fallback, error = %e, "Primary model failed, using fallback");
                self.run_model_with(fallback, input, options).await
            }
            Err(e) => Err(e),
        }
    }

    fn require_url(&self, output: &Value) -> Result<String, ReplicateError> {
        let url = self.normalizer.first_url_from_value(output);
        if url.is_empty() {
            return Err(ReplicateError::NoOutput(format!(
                "raw output was {}",
                truncate_body(&output.to_string())
            )));
        }
        Ok(url)
    }
}

/// Errors a second model cannot fix.
fn falls_back(err: &ReplicateError) -> bool {
    !matches!(
        err,
        ReplicateError::Cancelled
            | ReplicateError::Configuration(_)
            | ReplicateError::InvalidInput(_)
            | ReplicateError::InvalidModelRef(_)
    )
}
