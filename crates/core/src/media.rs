//! MIME sniffing and inline data URIs.
//!
//! The hosted inference API only accepts remote URLs or inline data for
//! file inputs. [`FileInput`] captures an in-memory file and
//! [`FileInput::to_data_uri`] produces the `data:<mime>;base64,<payload>`
//! form the API expects.

use std::io::{Read, Seek, SeekFrom};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Fallback MIME type for unknown or missing extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension → MIME type table (lowercase extensions).
const MIME_TABLE: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("mp4", "video/mp4"),
    ("mov", "video/mp4"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
];

/// Sniff a MIME type from a file name's extension.
///
/// Matching is case-insensitive. Unknown extensions map to
/// [`OCTET_STREAM`].
pub fn mime_from_file_name(file_name: &str) -> &'static str {
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return OCTET_STREAM,
    };
    MIME_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}

/// Encode raw bytes as a `data:` URI with the given MIME type.
pub fn data_uri(mime: &str, content: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(content))
}

/// An in-memory file destined for a model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    /// Original file name, used only for MIME sniffing.
    pub file_name: String,
    /// Full file content.
    pub content: Vec<u8>,
}

impl FileInput {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }

    /// Read the full content of a seekable reader, then rewind it so the
    /// caller can reuse the handle.
    pub fn from_reader<R: Read + Seek>(
        file_name: impl Into<String>,
        reader: &mut R,
    ) -> std::io::Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self::new(file_name, content))
    }

    /// MIME type sniffed from the file name.
    pub fn mime_type(&self) -> &'static str {
        mime_from_file_name(&self.file_name)
    }

    /// Render as `data:<mime>;base64,<payload>`.
    pub fn to_data_uri(&self) -> String {
        data_uri(self.mime_type(), &self.content)
    }
}
