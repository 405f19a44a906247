//! `amp-worker` library crate.
//!
//! Command-line parsing and the generation runner. The binary
//! entrypoint lives in `main.rs`.

pub mod cli;
pub mod generation;
