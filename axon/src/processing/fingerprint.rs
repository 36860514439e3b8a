use sha2::{Digest, Sha256};

use crate::models::ContentFingerprint;

/// Fingerprint of a file's raw bytes, used to skip re-uploads.
pub fn fingerprint(bytes: &[u8]) -> ContentFingerprint {
    ContentFingerprint::from_hex(sha256_hex(bytes))
}

/// Hash of a single chunk's text.
pub fn chunk_hash(text: &str) -> String {
    sha256_hex(text.as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    format!("{digest:x}")
}
