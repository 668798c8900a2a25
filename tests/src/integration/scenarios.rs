//! The concrete protocol scenarios, with their literal inputs.

use composition::Validated;
use schema_registry::SchemaRegistry;
use shared_types::{
    canonical, ListItemKind, ListOptions, Node, NodeError, Uri, Value, WriteRequest,
};
use std::sync::Arc;
use storage_memory::MemoryStore;

fn uri(s: &str) -> Uri {
    Uri::parse(s).unwrap()
}

fn json(v: serde_json::Value) -> Value {
    Value::from_json(v)
}

fn validated() -> Validated {
    Validated::new(SchemaRegistry::standard(), Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn scenario_1_mutable_happy_path() {
    let node = MemoryStore::new();
    let receipt = node
        .receive(WriteRequest::new(
            uri("users://alice/profile"),
            json(serde_json::json!({"name": "Alice"})),
        ))
        .await
        .unwrap();
    assert!(receipt.accepted());

    assert_eq!(
        node.read(&uri("users://alice/profile")).await.unwrap().data,
        json(serde_json::json!({"name": "Alice"}))
    );

    let page = node
        .list(&uri("users://alice"), ListOptions::default())
        .await
        .unwrap();
    assert!(page.items.iter().any(|item| {
        item.uri.as_str() == "users://alice/profile" && item.kind == ListItemKind::Leaf
    }));
}

#[tokio::test]
async fn scenario_2_immutable_rejection() {
    let node = validated();
    node.receive(WriteRequest::new(
        uri("once://open/42"),
        json(serde_json::json!({"v": 1})),
    ))
    .await
    .unwrap();

    let err = node
        .receive(WriteRequest::new(
            uri("once://open/42"),
            json(serde_json::json!({"v": 2})),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::ImmutableExists(_)));

    assert_eq!(
        node.read(&uri("once://open/42")).await.unwrap().data,
        json(serde_json::json!({"v": 1}))
    );
}

#[tokio::test]
async fn scenario_3_content_hash() {
    let node = validated();
    let value = json(serde_json::json!({"x": 1}));

    let err = node
        .receive(WriteRequest::new(
            uri(&format!("hash://sha256:{}", "00".repeat(32))),
            value.clone(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::HashMismatch(_)));

    let good = uri(&format!(
        "hash://sha256:{}",
        canonical::content_hash_hex(&value)
    ));
    node.receive(WriteRequest::new(good.clone(), value.clone()))
        .await
        .unwrap();
    // Idempotent under a repeat.
    node.receive(WriteRequest::new(good.clone(), value.clone()))
        .await
        .unwrap();
    assert_eq!(node.read(&good).await.unwrap().data, value);
}

#[tokio::test]
async fn scenario_4_envelope_unpack() {
    let node = MemoryStore::new();
    let receipt = node
        .receive(WriteRequest::new(
            uri("msg://batch/1"),
            json(serde_json::json!({
                "outputs": [
                    ["users://alice", {"n": "A"}],
                    ["users://bob", {"n": "B"}]
                ]
            })),
        ))
        .await
        .unwrap();
    assert!(receipt.accepted());

    // Three URIs readable: the content-hash envelope and both outputs.
    assert!(node.read(&receipt.resolved_uri).await.is_ok());
    assert_eq!(
        node.read(&uri("users://alice")).await.unwrap().data,
        json(serde_json::json!({"n": "A"}))
    );
    assert_eq!(
        node.read(&uri("users://bob")).await.unwrap().data,
        json(serde_json::json!({"n": "B"}))
    );
}

/// A key/value backend that refuses writes to selected keys.
struct DenyingKv {
    inner: storage_kv::MemoryKv,
    deny_substring: String,
}

impl storage_kv::KeyValueBackend for DenyingKv {
    fn get(&self, key: &str) -> Result<Option<String>, storage_kv::KvError> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), storage_kv::KvError> {
        if key.contains(&self.deny_substring) {
            return Err(storage_kv::KvError::Corrupt(format!(
                "write to {} refused",
                key
            )));
        }
        self.inner.put(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, storage_kv::KvError> {
        self.inner.remove(key)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, storage_kv::KvError> {
        self.inner.scan_prefix(prefix)
    }
}

#[tokio::test]
async fn envelope_partial_failure_lists_outcomes() {
    let node = storage_kv::KvStore::new(
        DenyingKv {
            inner: storage_kv::MemoryKv::new(),
            deny_substring: "bob".into(),
        },
        "app",
    );
    let receipt = node
        .receive(WriteRequest::new(
            uri("msg://batch/2"),
            json(serde_json::json!({
                "outputs": [
                    ["users://alice", {"n": "A"}],
                    ["users://bob", {"n": "B"}]
                ]
            })),
        ))
        .await
        .unwrap();

    // The envelope itself stored, the first output landed, the second is
    // reported failed; the overall result is a partial failure.
    assert!(!receipt.accepted());
    assert_eq!(receipt.children.len(), 2);
    assert!(receipt.children[0].result.is_ok());
    assert!(matches!(
        receipt.children[1].result,
        Err(NodeError::Backend(_))
    ));
    assert!(node.read(&receipt.resolved_uri).await.is_ok());
    assert!(node.read(&uri("users://alice")).await.is_ok());
    assert!(node.read(&uri("users://bob")).await.is_err());
}
