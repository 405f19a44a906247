//! Shared types and pure helpers for the amp workspace.
//!
//! Apart from reading environment variables, nothing in here performs
//! I/O. The client and queue crates build on these pieces: error types,
//! MIME sniffing and data URIs, backoff arithmetic, and content
//! hashing.

pub mod backoff;
pub mod env;
pub mod error;
pub mod hashing;
pub mod media;
pub mod text;
pub mod types;
