//! Output normalization.
//!
//! Hosted models return a string, a list of strings, file objects with a
//! `url`, raw bytes, or a stream of any of those. Raw output is first
//! classified into the closed [`ModelOutput`] type, and
//! [`OutputNormalizer::first_url`] then extracts one canonical URL or
//! local path from it. It never fails. An empty string means "no usable
//! output", and callers turn that into a domain error.

use std::io::Write;
use std::path::{Path, PathBuf};

use amp_core::hashing::short_digest;
use serde_json::Value;

/// Suffix for persisted byte-blob outputs.
const BLOB_SUFFIX: &str = ".png";

/// Hex characters of the content digest used in blob file names.
const BLOB_DIGEST_LEN: usize = 16;

/// One element of a model output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    /// A bare string, assumed to be a URL (or already a local path).
    Url(String),
    /// Raw binary content.
    Bytes(Vec<u8>),
    /// A file object exposing a `url`.
    FileRef { url: String },
    /// Anything else.
    Unrecognized(Value),
}

impl OutputItem {
    /// Classify a single JSON value.
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Url(s.clone()),
            Value::Object(map) => match map.get("url") {
                Some(Value::String(url)) => Self::FileRef { url: url.clone() },
                _ => Self::Unrecognized(value.clone()),
            },
            other => Self::Unrecognized(other.clone()),
        }
    }
}

/// A classified model output.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Single(OutputItem),
    List(Vec<OutputItem>),
}

impl ModelOutput {
    /// Classify raw JSON output. Arrays become lists, everything else a
    /// single item.
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items.iter().map(OutputItem::classify).collect()),
            other => Self::Single(OutputItem::classify(other)),
        }
    }

    /// Materialize a streamed output into a list.
    pub fn from_stream<I>(items: I) -> Self
    where
        I: IntoIterator<Item = OutputItem>,
    {
        Self::List(items.into_iter().collect())
    }

    pub fn from_bytes(blob: Vec<u8>) -> Self {
        Self::Single(OutputItem::Bytes(blob))
    }

    /// The item that determines the normalized URL: the first list
    /// element, or the single item.
    fn primary(&self) -> Option<&OutputItem> {
        match self {
            Self::Single(item) => Some(item),
            Self::List(items) => items.first(),
        }
    }
}

impl From<&Value> for ModelOutput {
    fn from(value: &Value) -> Self {
        Self::classify(value)
    }
}

/// Extracts a canonical URL or local file path from model outputs.
#[derive(Debug, Clone)]
pub struct OutputNormalizer {
    blob_dir: PathBuf,
}

impl OutputNormalizer {
    /// Byte-blob outputs are written under `blob_dir`.
    pub fn new(blob_dir: impl Into<PathBuf>) -> Self {
        Self {
            blob_dir: blob_dir.into(),
        }
    }

    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    /// First usable URL or local path, or `""` when there is none.
    ///
    /// Only the first list element is inspected. Later elements are
    /// ignored even when the first is unusable.
    pub fn first_url(&self, output: &ModelOutput) -> String {
        match output.primary() {
            Some(OutputItem::Url(url)) => url.clone(),
            Some(OutputItem::FileRef { url }) => url.clone(),
            Some(OutputItem::Bytes(blob)) => self.persist_or_empty(blob),
            Some(OutputItem::Unrecognized(_)) | None => String::new(),
        }
    }

    /// Convenience for raw JSON output.
    pub fn first_url_from_value(&self, output: &Value) -> String {
        self.first_url(&ModelOutput::classify(output))
    }

    /// Every URL-bearing item, in order. Bytes and unrecognized items
    /// are skipped.
    pub fn all_urls(&self, output: &ModelOutput) -> Vec<String> {
        let items: &[OutputItem] = match output {
            ModelOutput::Single(item) => std::slice::from_ref(item),
            ModelOutput::List(items) => items,
        };
        items
            .iter()
            .filter_map(|item| match item {
                OutputItem::Url(url) | OutputItem::FileRef { url } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn persist_or_empty(&self, blob: &[u8]) -> String {
        match persist_blob(&self.blob_dir, blob) {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(e) => {
                tracing::warn!(
                    dir = %self.blob_dir.display(),
                    error = %e,
                    "Failed to persist byte output",
                );
                String::new()
            }
        }
    }
}

/// Write `blob` to `<dir>/amp-<digest>-<random>.png` and keep the file.
///
/// The content digest plus the random suffix keeps concurrent jobs from
/// colliding, even when they produce identical bytes.
pub fn persist_blob(dir: &Path, blob: &[u8]) -> std::io::Result<PathBuf> {
    let prefix = format!("amp-{}-", short_digest(blob, BLOB_DIGEST_LEN));
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(BLOB_SUFFIX)
        .tempfile_in(dir)?;
    file.write_all(blob)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Join a text model's output into one string.
///
/// Text models usually stream tokens as a list of strings. String items
/// are concatenated verbatim, other items are rendered as JSON, and
/// `null` yields an empty string.
pub fn text_from_output(output: &Value) -> String {
    match output {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        other => other.to_string(),
    }
}
