//! Content digests for naming persisted model outputs.

use sha2::{Digest, Sha256};

/// The first `hex_len` lowercase hex characters of the SHA-256 digest of
/// `data`. Capped at the full 64 characters.
pub fn short_digest(data: &[u8], hex_len: usize) -> String {
    let mut hex = format!("{:x}", Sha256::digest(data));
    hex.truncate(hex_len.min(64));
    hex
}
