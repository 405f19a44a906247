//! REST client for the Printify print-on-demand API.
//!
//! Covers the catalog lookups, product creation and publishing, mockup
//! retrieval and image uploads used when turning generated artwork into
//! store products.

pub mod api;
pub mod config;
pub mod error;
pub mod types;

pub use api::PrintifyApi;
pub use config::PrintifyConfig;
pub use error::PrintifyError;
