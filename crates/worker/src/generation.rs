//! One-shot generations run through the background job queue.
//!
//! A [`GenerationRequest`] is validated, submitted as a queue job whose
//! function drives the inference client, and then followed through the
//! queue's event stream until the job settles.

use std::sync::Arc;
use std::time::Duration;

use amp_core::error::CoreError;
use amp_jobs::job::DEFAULT_PRIORITY;
use amp_jobs::{JobContext, JobEvent, JobQueue, JobSpec, JobStatus, JobType};
use amp_replicate::model_ref::ModelRef;
use amp_replicate::output::text_from_output;
use amp_replicate::requests::{ImageRequest, SpeechRequest, TextRequest, VideoRequest};
use amp_replicate::{ModelInput, ReplicateClient, ReplicateError, RunOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// `source` recorded on jobs submitted by this crate.
pub const JOB_SOURCE: &str = "cli";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Image,
    Video,
    Text,
    Speech,
}

impl GenerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Text => "text",
            Self::Speech => "speech",
        }
    }

    /// Queue tag for this kind. Speech has no tag of its own and runs as
    /// a workflow job.
    pub fn job_type(self) -> JobType {
        match self {
            Self::Image => JobType::Image,
            Self::Video => JobType::Video,
            Self::Text => JobType::Text,
            Self::Speech => JobType::Workflow,
        }
    }

    fn input(self, prompt: &str) -> ModelInput {
        match self {
            Self::Image => ImageRequest::new(prompt).to_input(),
            Self::Video => VideoRequest::from_prompt(prompt).to_input(),
            Self::Text => TextRequest::new(prompt).to_input(),
            Self::Speech => SpeechRequest::new(prompt).to_input(),
        }
    }
}

/// What a finished generation produced.
///
/// Serializes as `{"url": ...}` or `{"text": ...}`, which is the job
/// result shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationOutput {
    Url(String),
    Text(String),
}

impl GenerationOutput {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(s) | Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub prompt: String,
    /// `owner/name[:version]`. `None` uses the stock model for `kind`.
    pub model: Option<String>,
    /// Poll budget override.
    pub timeout: Option<Duration>,
    pub priority: u8,
}

impl GenerationRequest {
    pub fn new(kind: GenerationKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            model: None,
            timeout: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation("prompt must not be empty".to_string()));
        }
        if let Some(model) = &self.model {
            model
                .parse::<ModelRef>()
                .map_err(|e| CoreError::Validation(e.to_string()))?;
        }
        Ok(())
    }

    fn run_options(&self) -> RunOptions {
        match self.timeout {
            Some(timeout) => RunOptions::default().with_timeout(timeout),
            None => RunOptions::default(),
        }
    }

    fn job_spec(&self) -> JobSpec {
        JobSpec::new(
            self.kind.job_type(),
            format!("{} generation", self.kind.as_str()),
        )
        .with_priority(self.priority)
        .with_source(JOB_SOURCE)
        .with_metadata(json!({
            "kind": self.kind,
            "model": self.model,
        }))
    }
}

/// Run one generation directly against the client.
pub async fn generate(
    client: &ReplicateClient,
    request: &GenerationRequest,
    mut options: RunOptions,
) -> Result<GenerationOutput, ReplicateError> {
    let prompt = request.prompt.as_str();
    let Some(model) = &request.model else {
        return match request.kind {
            GenerationKind::Image => client
                .generate_image(&ImageRequest::new(prompt), options)
                .await
                .map(GenerationOutput::Url),
            GenerationKind::Video => client
                .generate_video(&VideoRequest::from_prompt(prompt), options)
                .await
                .map(GenerationOutput::Url),
            GenerationKind::Text => client
                .generate_text(&TextRequest::new(prompt), options)
                .await
                .map(GenerationOutput::Text),
            GenerationKind::Speech => client
                .generate_speech(&SpeechRequest::new(prompt), options)
                .await
                .map(GenerationOutput::Url),
        };
    };

    if request.kind == GenerationKind::Text && options.timeout.is_none() {
        options = options.with_timeout(client.config().text_poll_timeout);
    }
    let output = client
        .run_model_with(model, &request.kind.input(prompt), options)
        .await?;

    if request.kind == GenerationKind::Text {
        return Ok(GenerationOutput::Text(text_from_output(&output)));
    }
    let url = client.normalizer().first_url_from_value(&output);
    if url.is_empty() {
        return Err(ReplicateError::NoOutput(format!(
            "{model} returned no usable URL"
        )));
    }
    Ok(GenerationOutput::Url(url))
}

/// Submit `request` as a queue job and wait for it to settle.
///
/// Progress is logged as it arrives. Cancelling `interrupt` cancels the
/// job, which then ends through the client's cooperative cancel path.
pub async fn run_in_queue(
    client: Arc<ReplicateClient>,
    queue: &JobQueue,
    request: GenerationRequest,
    interrupt: CancellationToken,
) -> anyhow::Result<GenerationOutput> {
    request.validate()?;

    let mut events = queue.subscribe();
    let spec = request.job_spec();
    let id = queue.submit(spec, move |ctx| generation_job(ctx, client, request))?;

    let mut interrupted = false;
    loop {
        let event = tokio::select! {
            _ = interrupt.cancelled(), if !interrupted => {
                interrupted = true;
                tracing::warn!(job_id = %id, "Interrupted, cancelling job");
                queue.cancel(&id);
                continue;
            }
            event = events.recv() => event,
        };

        match event {
            Ok(JobEvent::Progress {
                job_id,
                progress,
                step,
            }) if job_id == id => {
                tracing::info!(
                    job_id = %id,
                    progress,
                    step = step.as_deref().unwrap_or(""),
                    "Generation progress",
                );
            }
            Ok(event) if event.job_id() == id && event.is_terminal() => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Missed job events");
                if queue.get_job(&id).is_some_and(|job| job.is_terminal()) {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }

    finished_output(queue, &id)
}

async fn generation_job(
    ctx: JobContext,
    client: Arc<ReplicateClient>,
    request: GenerationRequest,
) -> anyhow::Result<Value> {
    ctx.set_step(format!("running {} model", request.kind.as_str()));
    ctx.set_progress(0.1);

    let options = request.run_options().with_cancel(ctx.cancel_handle());
    let output = generate(&client, &request, options)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    ctx.set_step("done");
    Ok(serde_json::to_value(output)?)
}

fn finished_output(queue: &JobQueue, id: &str) -> anyhow::Result<GenerationOutput> {
    let job = queue.get_job(id).ok_or_else(|| CoreError::NotFound {
        entity: "job",
        id: id.to_string(),
    })?;

    match job.status {
        JobStatus::Completed => {
            let result = job.result.unwrap_or_default();
            Ok(serde_json::from_value(result)?)
        }
        JobStatus::Failed => Err(anyhow::anyhow!(job
            .error
            .unwrap_or_else(|| "job failed".to_string()))),
        status => anyhow::bail!("job {id} is still {}", status.as_str()),
    }
}
