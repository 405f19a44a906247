use std::time::Duration;

use amp_jobs::job::{DEFAULT_PRIORITY, MAX_PRIORITY, MIN_PRIORITY};
use clap::{Args, Parser, Subcommand};

use crate::generation::{GenerationKind, GenerationRequest};

#[derive(Parser, Debug)]
#[command(
    name = "amp-worker",
    version,
    about = "Run hosted-model generations through the background job queue"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate one asset and print its URL (or the text)
    Generate(GenerateArgs),

    /// Resolve a model reference to a version id
    Resolve {
        /// `owner/name` or `owner/name:version`
        reference: String,
    },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// What to generate
    #[arg(value_enum)]
    pub kind: GenerationKind,

    /// Prompt, or the text to speak. Multiple words are joined by spaces
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    /// Model to run instead of the stock one (`owner/name[:version]`)
    #[arg(long)]
    pub model: Option<String>,

    /// Poll budget in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Queue priority, 1 (lowest) to 10
    #[arg(
        long,
        default_value_t = DEFAULT_PRIORITY,
        value_parser = clap::value_parser!(u8).range(MIN_PRIORITY as i64..=MAX_PRIORITY as i64)
    )]
    pub priority: u8,
}

impl GenerateArgs {
    pub fn into_request(self) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.kind, self.prompt.join(" "));
        request.model = self.model;
        request.timeout = self.timeout.map(Duration::from_secs);
        request.priority = self.priority;
        request
    }
}
