//! # Error Types
//!
//! The closed set of protocol error kinds. Every backend, combinator, and
//! server surface reports failures as one of these; the wire form is always
//! `"<kind>: <message>"` and parses back into the same kind on the far
//! side of a transport.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors that can occur in any node operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NodeError {
    /// No validator registered for the write's program key.
    #[error("no-schema: {0}")]
    NoSchema(String),

    /// The registered validator rejected the write (or panicked).
    #[error("validation: {0}")]
    Validation(String),

    /// Write to an immutable URI that already holds a record.
    #[error("immutable-exists: {0}")]
    ImmutableExists(String),

    /// Content-addressed write whose value does not hash to the URI.
    #[error("hash-mismatch: {0}")]
    HashMismatch(String),

    /// No record at the URI.
    #[error("not-found: {0}")]
    NotFound(String),

    /// Bulk read over the per-request cap.
    #[error("batch-too-large: {0}")]
    BatchTooLarge(String),

    /// Remote operation exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Connection dropped with the request in flight.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// Storage or transport I/O failure.
    #[error("backend: {0}")]
    Backend(String),

    /// Session, signature, or token problem at the wallet.
    #[error("auth: {0}")]
    Auth(String),

    /// Ciphertext cannot be opened with the current keys.
    #[error("decrypt: {0}")]
    Decrypt(String),
}

/// The kind tag of a [`NodeError`], as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoSchema,
    Validation,
    ImmutableExists,
    HashMismatch,
    NotFound,
    BatchTooLarge,
    Timeout,
    Disconnected,
    Backend,
    Auth,
    Decrypt,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoSchema => "no-schema",
            ErrorKind::Validation => "validation",
            ErrorKind::ImmutableExists => "immutable-exists",
            ErrorKind::HashMismatch => "hash-mismatch",
            ErrorKind::NotFound => "not-found",
            ErrorKind::BatchTooLarge => "batch-too-large",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Disconnected => "disconnected",
            ErrorKind::Backend => "backend",
            ErrorKind::Auth => "auth",
            ErrorKind::Decrypt => "decrypt",
        }
    }
}

impl NodeError {
    /// The kind tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::NoSchema(_) => ErrorKind::NoSchema,
            NodeError::Validation(_) => ErrorKind::Validation,
            NodeError::ImmutableExists(_) => ErrorKind::ImmutableExists,
            NodeError::HashMismatch(_) => ErrorKind::HashMismatch,
            NodeError::NotFound(_) => ErrorKind::NotFound,
            NodeError::BatchTooLarge(_) => ErrorKind::BatchTooLarge,
            NodeError::Timeout(_) => ErrorKind::Timeout,
            NodeError::Disconnected(_) => ErrorKind::Disconnected,
            NodeError::Backend(_) => ErrorKind::Backend,
            NodeError::Auth(_) => ErrorKind::Auth,
            NodeError::Decrypt(_) => ErrorKind::Decrypt,
        }
    }

    /// The message after the kind tag.
    pub fn message(&self) -> &str {
        match self {
            NodeError::NoSchema(m)
            | NodeError::Validation(m)
            | NodeError::ImmutableExists(m)
            | NodeError::HashMismatch(m)
            | NodeError::NotFound(m)
            | NodeError::BatchTooLarge(m)
            | NodeError::Timeout(m)
            | NodeError::Disconnected(m)
            | NodeError::Backend(m)
            | NodeError::Auth(m)
            | NodeError::Decrypt(m) => m,
        }
    }

    /// Rebuild an error from its wire form `"<kind>: <message>"`.
    ///
    /// Unknown kinds collapse to `backend` so remote peers can never smuggle
    /// a kind outside the closed set.
    pub fn parse_wire(s: &str) -> NodeError {
        let (kind, message) = match s.split_once(": ") {
            Some((kind, message)) => (kind, message.to_string()),
            None => return NodeError::Backend(s.to_string()),
        };
        match kind {
            "no-schema" => NodeError::NoSchema(message),
            "validation" => NodeError::Validation(message),
            "immutable-exists" => NodeError::ImmutableExists(message),
            "hash-mismatch" => NodeError::HashMismatch(message),
            "not-found" => NodeError::NotFound(message),
            "batch-too-large" => NodeError::BatchTooLarge(message),
            "timeout" => NodeError::Timeout(message),
            "disconnected" => NodeError::Disconnected(message),
            "backend" => NodeError::Backend(message),
            "auth" => NodeError::Auth(message),
            "decrypt" => NodeError::Decrypt(message),
            _ => NodeError::Backend(s.to_string()),
        }
    }
}

impl Serialize for NodeError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeError::parse_wire(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        let err = NodeError::ImmutableExists("once://open/42 already holds a record".into());
        let wire = err.to_string();
        assert_eq!(wire, "immutable-exists: once://open/42 already holds a record");
        assert_eq!(NodeError::parse_wire(&wire), err);
    }

    #[test]
    fn test_unknown_kind_collapses_to_backend() {
        let err = NodeError::parse_wire("surprise: something");
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_every_kind_round_trips() {
        let errors = vec![
            NodeError::NoSchema("m".into()),
            NodeError::Validation("m".into()),
            NodeError::ImmutableExists("m".into()),
            NodeError::HashMismatch("m".into()),
            NodeError::NotFound("m".into()),
            NodeError::BatchTooLarge("m".into()),
            NodeError::Timeout("m".into()),
            NodeError::Disconnected("m".into()),
            NodeError::Backend("m".into()),
            NodeError::Auth("m".into()),
            NodeError::Decrypt("m".into()),
        ];
        for err in errors {
            assert_eq!(NodeError::parse_wire(&err.to_string()), err);
        }
    }
}
