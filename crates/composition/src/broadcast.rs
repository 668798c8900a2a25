//! # Parallel Broadcast
//!
//! The write-side combinator: `receive` and `delete` fan out to every
//! peer concurrently and the overall result is accepted only when every
//! peer accepts. The first failing peer (in construction order) has its
//! error reported verbatim. Reads are served from the first peer.

use async_trait::async_trait;
use futures::future::join_all;
use shared_types::{
    Health, ListOptions, ListPage, Node, NodeError, ProgramKey, Receipt, Record, Uri, WriteRequest,
};
use std::sync::Arc;

/// Fan-out write combinator over two or more peers (one peer is legal and
/// degenerates to pass-through).
pub struct Broadcast {
    peers: Vec<Arc<dyn Node>>,
}

impl Broadcast {
    /// Compose peers. Panics on an empty peer list; that is a wiring error.
    pub fn new(peers: Vec<Arc<dyn Node>>) -> Self {
        assert!(!peers.is_empty(), "broadcast requires at least one peer");
        Self { peers }
    }

    fn first(&self) -> &dyn Node {
        self.peers[0].as_ref()
    }
}

#[async_trait]
impl Node for Broadcast {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        let results = join_all(
            self.peers
                .iter()
                .map(|peer| peer.receive(request.clone())),
        )
        .await;

        // Unanimity: surface the first failing peer verbatim, including a
        // partially-failed envelope receipt.
        let mut accepted = None;
        for result in results {
            let receipt = result?;
            if let Some(err) = receipt.first_error() {
                return Err(err.clone());
            }
            accepted.get_or_insert(receipt);
        }
        Ok(accepted.expect("at least one peer"))
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        self.first().read(uri).await
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        self.first().list(uri, opts).await
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        let results = join_all(self.peers.iter().map(|peer| peer.delete(uri))).await;
        for result in results {
            result?;
        }
        Ok(())
    }

    async fn health(&self) -> Health {
        self.first().health().await
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        self.first().list_programs().await
    }

    async fn close(&self) -> Result<(), NodeError> {
        for peer in &self.peers {
            peer.close().await?;
        }
        Ok(())
    }
}
