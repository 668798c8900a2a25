//! # Read/Write Pair
//!
//! Binds a write-side node and a read-side node into one node, the usual
//! way broadcast and first-match are deployed together:
//!
//! ```ignore
//! let replicated = ReadWritePair::new(
//!     Arc::new(Broadcast::new(vec![a.clone(), b.clone()])),
//!     Arc::new(FirstMatch::new(vec![a, b])),
//! );
//! ```

use async_trait::async_trait;
use shared_types::{
    Health, HealthStatus, ListOptions, ListPage, Node, NodeError, ProgramKey, ReadMultiResult,
    Receipt, Record, Uri, WriteRequest,
};
use std::sync::Arc;

/// One node from a write side and a read side.
pub struct ReadWritePair {
    write: Arc<dyn Node>,
    read: Arc<dyn Node>,
}

impl ReadWritePair {
    pub fn new(write: Arc<dyn Node>, read: Arc<dyn Node>) -> Self {
        Self { write, read }
    }
}

#[async_trait]
impl Node for ReadWritePair {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        self.write.receive(request).await
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        self.read.read(uri).await
    }

    async fn read_multi(&self, uris: &[Uri]) -> Result<ReadMultiResult, NodeError> {
        self.read.read_multi(uris).await
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        self.read.list(uri, opts).await
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        self.write.delete(uri).await
    }

    async fn health(&self) -> Health {
        // The pair is only as healthy as its worse side.
        let write = self.write.health().await;
        let read = self.read.health().await;
        match (write.status, read.status) {
            (HealthStatus::Healthy, HealthStatus::Healthy) => Health::healthy(),
            (HealthStatus::Unhealthy, _) => write,
            (_, HealthStatus::Unhealthy) => read,
            (HealthStatus::Degraded, _) => write,
            (_, HealthStatus::Degraded) => read,
        }
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        self.read.list_programs().await
    }

    async fn close(&self) -> Result<(), NodeError> {
        self.write.close().await?;
        self.read.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Broadcast, FirstMatch};
    use shared_types::Value;
    use storage_memory::MemoryStore;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    fn json(v: serde_json::Value) -> Value {
        Value::from_json(v)
    }

    #[tokio::test]
    async fn test_replicated_store() {
        let a = Arc::new(MemoryStore::new());
        let b = Arc::new(MemoryStore::new());
        let store = ReadWritePair::new(
            Arc::new(Broadcast::new(vec![a.clone(), b.clone()])),
            Arc::new(FirstMatch::new(vec![a.clone(), b.clone()])),
        );

        let target = uri("users://alice/profile");
        store
            .receive(WriteRequest::new(target.clone(), json(serde_json::json!(1))))
            .await
            .unwrap();
        assert_eq!(
            store.read(&target).await.unwrap().data,
            json(serde_json::json!(1))
        );

        // Reads survive the first replica losing the record.
        a.delete(&target).await.unwrap();
        assert_eq!(
            store.read(&target).await.unwrap().data,
            json(serde_json::json!(1))
        );
    }

    #[tokio::test]
    async fn test_delete_routes_to_write_side() {
        let a = Arc::new(MemoryStore::new());
        let b = Arc::new(MemoryStore::new());
        let store = ReadWritePair::new(
            Arc::new(Broadcast::new(vec![a.clone(), b.clone()])),
            Arc::new(FirstMatch::new(vec![a.clone(), b.clone()])),
        );

        let target = uri("users://alice/profile");
        store
            .receive(WriteRequest::new(target.clone(), json(serde_json::json!(1))))
            .await
            .unwrap();
        store.delete(&target).await.unwrap();
        assert!(store.read(&target).await.is_err());
        assert!(a.read(&target).await.is_err());
        assert!(b.read(&target).await.is_err());
    }
}
