//! Typed request builders for the stock generation models.
//!
//! Each request carries the parameters its model understands and renders
//! them into a [`ModelInput`] with the model's own field names.

use crate::input::{InputValue, ModelInput};

/// Text-to-image request for the Flux Fast family.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: String,
    pub output_format: String,
    /// 1-100, applies to jpg/webp only.
    pub output_quality: u32,
    pub guidance: f64,
    pub num_inference_steps: u32,
    /// `None` lets the model pick a random seed.
    pub seed: Option<i64>,
    pub speed_mode: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: 1024,
            height: 1024,
            aspect_ratio: "1:1".into(),
            output_format: "png".into(),
            output_quality: 90,
            guidance: 3.5,
            num_inference_steps: 28,
            seed: None,
            speed_mode: "Extra Juiced 🔥 (more speed)".into(),
        }
    }

    pub fn to_input(&self) -> ModelInput {
        // Flux Fast takes the longest side as a single `image_size`.
        ModelInput::new()
            .with("prompt", self.prompt.as_str())
            .with("guidance", self.guidance)
            .with("image_size", self.width.max(self.height))
            .with("aspect_ratio", self.aspect_ratio.as_str())
            .with("output_format", self.output_format.as_str())
            .with("output_quality", self.output_quality)
            .with("num_inference_steps", self.num_inference_steps)
            .with("speed_mode", self.speed_mode.as_str())
            .with_opt("seed", self.seed)
    }
}

/// Text-generation request for instruction-tuned LLMs.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

impl TextRequest {
    /// Defaults for the full-size model.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: 800,
            temperature: 0.7,
            top_p: Some(0.9),
            frequency_penalty: Some(0.0),
            presence_penalty: Some(0.0),
        }
    }

    /// Defaults for the small, fast model: fewer tokens and no sampling
    /// penalties.
    pub fn fast(prompt: impl Into<String>) -> Self {
        Self {
            max_tokens: 400,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            ..Self::new(prompt)
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// These models have no dedicated system field, so the system prompt
    /// is folded into the main prompt.
    pub fn rendered_prompt(&self) -> String {
        match self.system_prompt.as_deref() {
            Some(system) if !system.is_empty() => {
                format!("System: {system}\n\nUser: {}", self.prompt)
            }
            _ => self.prompt.clone(),
        }
    }

    pub fn to_input(&self) -> ModelInput {
        ModelInput::new()
            .with("prompt", self.rendered_prompt())
            .with("max_new_tokens", self.max_tokens)
            .with("temperature", self.temperature)
            .with_opt("top_p", self.top_p)
            .with_opt("frequency_penalty", self.frequency_penalty)
            .with_opt("presence_penalty", self.presence_penalty)
    }
}

/// Text- or image-to-video request.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: Option<String>,
    /// Starting frame: a URL, a data URI, or an in-memory file.
    pub image: Option<InputValue>,
    pub aspect_ratio: String,
    /// 1 (subtle) to 5.
    pub motion_level: u32,
}

impl Default for VideoRequest {
    fn default() -> Self {
        Self {
            prompt: None,
            image: None,
            aspect_ratio: "16:9".into(),
            motion_level: 4,
        }
    }
}

impl VideoRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: impl Into<InputValue>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// A video needs a prompt or a starting image.
    pub fn has_source(&self) -> bool {
        self.prompt.as_deref().is_some_and(|p| !p.trim().is_empty()) || self.image.is_some()
    }

    pub fn to_input(&self) -> ModelInput {
        ModelInput::new()
            .with_opt("prompt", self.prompt.as_deref())
            .with_opt("start_image", self.image.clone())
            .with("aspect_ratio", self.aspect_ratio.as_str())
            .with("motion_level", self.motion_level)
    }
}

/// Text-to-speech request.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    pub speed: f64,
    pub pitch: i32,
    pub volume: f64,
    pub emotion: String,
    pub sample_rate: u32,
    pub audio_format: String,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: "English_Trustworth_Man".into(),
            speed: 1.0,
            pitch: 0,
            volume: 1.0,
            emotion: "neutral".into(),
            sample_rate: 44_100,
            audio_format: "mp3".into(),
        }
    }

    pub fn to_input(&self) -> ModelInput {
        ModelInput::new()
            .with("text", self.text.as_str())
            .with("voice_id", self.voice_id.as_str())
            .with("speed", self.speed)
            .with("pitch", self.pitch)
            .with("vol", self.volume)
            .with("emotion", self.emotion.as_str())
            .with("audio_sample_rate", self.sample_rate)
            .with("format", self.audio_format.as_str())
    }
}
