//! # First-Match Sequence
//!
//! The read-side combinator: `read` queries peers in order and returns the
//! first `ok`; `list` returns the first non-empty page. Writes are not
//! defined here; pair with a write combinator via
//! [`crate::ReadWritePair`].

use async_trait::async_trait;
use shared_types::{
    Health, ListOptions, ListPage, Node, NodeError, ProgramKey, Receipt, Record, Uri, WriteRequest,
};
use std::sync::Arc;

/// Sequential first-match read combinator.
pub struct FirstMatch {
    peers: Vec<Arc<dyn Node>>,
}

impl FirstMatch {
    /// Compose peers. Panics on an empty peer list; that is a wiring error.
    pub fn new(peers: Vec<Arc<dyn Node>>) -> Self {
        assert!(!peers.is_empty(), "first-match requires at least one peer");
        Self { peers }
    }
}

#[async_trait]
impl Node for FirstMatch {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        Err(NodeError::Backend(format!(
            "first-match sequence does not accept writes ({})",
            request.uri
        )))
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        let mut last_message = String::new();
        for peer in &self.peers {
            match peer.read(uri).await {
                Ok(record) => return Ok(record),
                Err(err) => last_message = err.message().to_string(),
            }
        }
        // All peers failed: not-found carrying the latest peer's message.
        Err(NodeError::NotFound(last_message))
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        let mut last_error = None;
        let mut empty_page = None;
        for peer in &self.peers {
            match peer.list(uri, opts.clone()).await {
                Ok(page) if !page.items.is_empty() => return Ok(page),
                Ok(page) => empty_page = Some(page),
                Err(err) => last_error = Some(err),
            }
        }
        match (empty_page, last_error) {
            (Some(page), _) => Ok(page),
            (None, Some(err)) => Err(err),
            (None, None) => unreachable!("at least one peer"),
        }
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        Err(NodeError::Backend(format!(
            "first-match sequence does not accept deletes ({})",
            uri
        )))
    }

    async fn health(&self) -> Health {
        self.peers[0].health().await
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        // Reads consult every peer, so the known programs are the union.
        let mut keys: Vec<ProgramKey> = Vec::new();
        for peer in &self.peers {
            for key in peer.list_programs().await? {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn close(&self) -> Result<(), NodeError> {
        for peer in &self.peers {
            peer.close().await?;
        }
        Ok(())
    }
}
