//! # SHA-256 Hashing
//!
//! Content addressing uses SHA-256 over canonical bytes; the hex digest is
//! the authority suffix of `hash://sha256:{hex}` URIs.

use sha2::{Digest, Sha256};

/// SHA-256 hash output (256-bit).
pub type Hash = [u8; 32];

/// Stateful SHA-256 hasher for multi-part input.
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with SHA-256 (one-shot).
pub fn sha256_hash(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Hex digest of SHA-256 over data.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_hash(data))
}
