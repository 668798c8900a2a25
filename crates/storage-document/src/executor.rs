//! # Document Executor Contract
//!
//! The seam a real document database plugs into: one collection of
//! `{uri, data, ts}` documents keyed by URI, with upsert, point lookup,
//! anchored-regex URI search, and single-document delete. The in-memory
//! executor implements the same contract with the `regex` crate so the
//! store is testable without a database.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from the document layer.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Driver-level failure.
    #[error("document store error: {0}")]
    Store(String),

    /// The URI regex did not compile.
    #[error("bad uri filter: {0}")]
    BadFilter(String),
}

/// One document as the executor sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub uri: String,
    /// Record data, JSON-encoded.
    pub data: String,
    pub ts: u64,
}

/// Minimal collection surface the store needs.
#[async_trait]
pub trait DocumentExecutor: Send + Sync {
    /// Insert or replace the document with this URI.
    async fn upsert(&self, doc: Document) -> Result<(), ExecutorError>;

    /// Fetch the document with this URI.
    async fn find_one(&self, uri: &str) -> Result<Option<Document>, ExecutorError>;

    /// All documents whose URI matches an anchored regex, as `(uri, ts)`.
    async fn find_uris(&self, uri_regex: &str) -> Result<Vec<(String, u64)>, ExecutorError>;

    /// Delete the document with this URI; whether one existed.
    async fn delete_one(&self, uri: &str) -> Result<bool, ExecutorError>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<(), ExecutorError>;
}

/// In-memory executor for tests.
#[derive(Default)]
pub struct MemoryDocumentExecutor {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl MemoryDocumentExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentExecutor for MemoryDocumentExecutor {
    async fn upsert(&self, doc: Document) -> Result<(), ExecutorError> {
        self.documents.write().insert(doc.uri.clone(), doc);
        Ok(())
    }

    async fn find_one(&self, uri: &str) -> Result<Option<Document>, ExecutorError> {
        Ok(self.documents.read().get(uri).cloned())
    }

    async fn find_uris(&self, uri_regex: &str) -> Result<Vec<(String, u64)>, ExecutorError> {
        let matcher =
            regex::Regex::new(uri_regex).map_err(|e| ExecutorError::BadFilter(e.to_string()))?;
        Ok(self
            .documents
            .read()
            .values()
            .filter(|doc| matcher.is_match(&doc.uri))
            .map(|doc| (doc.uri.clone(), doc.ts))
            .collect())
    }

    async fn delete_one(&self, uri: &str) -> Result<bool, ExecutorError> {
        Ok(self.documents.write().remove(uri).is_some())
    }

    async fn ping(&self) -> Result<(), ExecutorError> {
        Ok(())
    }
}
