//! # Validator Contract
//!
//! A validator judges one write: the URI, the value, and a read-only view
//! of the store it is about to land in. Distinct rejection kinds
//! (`immutable-exists`, `hash-mismatch`) come from the validator itself so
//! callers can tell them apart from plain `validation` failures.

use async_trait::async_trait;
use shared_types::{Node, NodeError, Record, Uri, Value};

/// Read-only view of a node, handed to validators.
///
/// Exposes only `read`; existence and immutability checks are expressible,
/// writes are not.
#[derive(Clone, Copy)]
pub struct ReadHandle<'a> {
    node: &'a dyn Node,
}

impl<'a> ReadHandle<'a> {
    pub fn new(node: &'a dyn Node) -> Self {
        Self { node }
    }

    /// Read the record at a URI; `not-found` when absent.
    pub async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        self.node.read(uri).await
    }

    /// Whether a record currently exists at a URI.
    ///
    /// `not-found` maps to `false`; any other error propagates so a
    /// flaky backend cannot masquerade as an absent record.
    pub async fn exists(&self, uri: &Uri) -> Result<bool, NodeError> {
        match self.node.read(uri).await {
            Ok(_) => Ok(true),
            Err(NodeError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// A program-key validator.
///
/// Returning `Ok(())` accepts the write. Rejections use the protocol error
/// kinds; anything that is not `immutable-exists` or `hash-mismatch`
/// should be a `validation` error.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        uri: &Uri,
        value: &Value,
        read: ReadHandle<'_>,
    ) -> Result<(), NodeError>;
}
