//! Client for a Replicate-style hosted inference API.
//!
//! Submits predictions, polls them to a terminal state within a time
//! budget, retries rate-limited calls with exponential backoff, and
//! normalizes the many shapes a model output can take into a single
//! URL or local file path.
//!
//! The HTTP layer sits behind the [`transport::Transport`] trait so the
//! polling and retry logic can be exercised without a network.

pub mod client;
pub mod config;
pub mod error;
pub mod input;
pub mod model_ref;
pub mod output;
pub mod poller;
pub mod prediction;
pub mod requests;
pub mod resolver;
pub mod retry;
pub mod transport;

pub use client::{ReplicateClient, RunOptions};
pub use config::ReplicateConfig;
pub use error::ReplicateError;
pub use input::{InputValue, ModelInput};
pub use output::{ModelOutput, OutputItem, OutputNormalizer};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, Transport, TransportOutcome};
