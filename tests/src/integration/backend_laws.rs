//! The universal law suite, run against every backend and composition.

use crate::laws;
use composition::{Broadcast, FirstMatch, ReadWritePair, Validated};
use schema_registry::SchemaRegistry;
use std::sync::Arc;
use storage_document::{DocumentStore, MemoryDocumentExecutor};
use storage_kv::{FileKv, IndexedKvStore, KvStore, MemoryKv};
use storage_memory::MemoryStore;
use storage_relational::{MemorySqlExecutor, RelationalStore};

#[tokio::test]
async fn memory_store_obeys_laws() {
    laws::assert_backend_laws(&MemoryStore::new()).await;
}

#[tokio::test]
async fn kv_store_over_memory_obeys_laws() {
    laws::assert_backend_laws(&KvStore::new(MemoryKv::new(), "laws")).await;
}

#[tokio::test]
async fn kv_store_over_file_obeys_laws() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileKv::open(dir.path().join("laws.json")).unwrap();
    laws::assert_backend_laws(&KvStore::new(backend, "laws")).await;
}

#[tokio::test]
async fn indexed_kv_store_obeys_laws() {
    let store = IndexedKvStore::open(MemoryKv::new(), "laws").unwrap();
    laws::assert_backend_laws(&store).await;
}

#[tokio::test]
async fn relational_store_obeys_laws() {
    let store = RelationalStore::new(MemorySqlExecutor::new());
    store.init().await.unwrap();
    laws::assert_backend_laws(&store).await;
}

#[tokio::test]
async fn document_store_obeys_laws() {
    laws::assert_backend_laws(&DocumentStore::new(MemoryDocumentExecutor::new())).await;
}

#[tokio::test]
async fn replicated_pair_obeys_laws() {
    let a = Arc::new(MemoryStore::new());
    let b = Arc::new(MemoryStore::new());
    let pair = ReadWritePair::new(
        Arc::new(Broadcast::new(vec![a.clone(), b.clone()])),
        Arc::new(FirstMatch::new(vec![a, b])),
    );
    laws::assert_backend_laws(&pair).await;
}

#[tokio::test]
async fn mixed_replica_pair_obeys_laws() {
    // One memory replica, one relational replica.
    let relational = RelationalStore::new(MemorySqlExecutor::new());
    relational.init().await.unwrap();
    let a: Arc<dyn shared_types::Node> = Arc::new(MemoryStore::new());
    let b: Arc<dyn shared_types::Node> = Arc::new(relational);
    let pair = ReadWritePair::new(
        Arc::new(Broadcast::new(vec![a.clone(), b.clone()])),
        Arc::new(FirstMatch::new(vec![a, b])),
    );
    laws::assert_backend_laws(&pair).await;
}

#[tokio::test]
async fn validated_store_obeys_validated_laws() {
    let store = Validated::new(SchemaRegistry::open(), Arc::new(MemoryStore::new()));
    laws::assert_validated_laws(&store).await;
}

#[tokio::test]
async fn validated_broadcast_obeys_validated_laws() {
    let peers: Vec<Arc<dyn shared_types::Node>> =
        vec![Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new())];
    let store = Validated::new(SchemaRegistry::open(), Arc::new(Broadcast::new(peers)));
    laws::assert_validated_laws(&store).await;
}
