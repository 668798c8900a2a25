//! Composition laws: broadcast unanimity and first-match ordering.

use async_trait::async_trait;
use composition::{Broadcast, FirstMatch};
use shared_types::{
    Health, ListOptions, ListPage, Node, NodeError, ProgramKey, Receipt, Record, Uri, Value,
    WriteRequest,
};
use std::sync::Arc;
use storage_memory::MemoryStore;

/// A peer that fails every operation with a fixed error.
struct FailingNode {
    error: NodeError,
}

impl FailingNode {
    fn new(error: NodeError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl Node for FailingNode {
    async fn receive(&self, _request: WriteRequest) -> Result<Receipt, NodeError> {
        Err(self.error.clone())
    }

    async fn read(&self, _uri: &Uri) -> Result<Record, NodeError> {
        Err(self.error.clone())
    }

    async fn list(&self, _uri: &Uri, _opts: ListOptions) -> Result<ListPage, NodeError> {
        Err(self.error.clone())
    }

    async fn delete(&self, _uri: &Uri) -> Result<(), NodeError> {
        Err(self.error.clone())
    }

    async fn health(&self) -> Health {
        Health::unhealthy("always failing")
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        Err(self.error.clone())
    }
}

fn uri(s: &str) -> Uri {
    Uri::parse(s).unwrap()
}

fn json(v: serde_json::Value) -> Value {
    Value::from_json(v)
}

#[tokio::test]
async fn broadcast_accepts_only_on_unanimity() {
    let healthy = Arc::new(MemoryStore::new());
    let failing = Arc::new(FailingNode::new(NodeError::ImmutableExists(
        "peer refused".into(),
    )));
    let broadcast = Broadcast::new(vec![healthy.clone(), failing]);

    let err = broadcast
        .receive(WriteRequest::new(uri("users://alice"), json(serde_json::json!(1))))
        .await
        .unwrap_err();
    // The failing peer's kind is reported verbatim.
    assert!(matches!(err, NodeError::ImmutableExists(_)));
    assert_eq!(err.message(), "peer refused");
}

#[tokio::test]
async fn broadcast_all_accept() {
    let a = Arc::new(MemoryStore::new());
    let b = Arc::new(MemoryStore::new());
    let broadcast = Broadcast::new(vec![a.clone(), b.clone()]);

    let receipt = broadcast
        .receive(WriteRequest::new(uri("users://alice"), json(serde_json::json!(1))))
        .await
        .unwrap();
    assert!(receipt.accepted());
    assert!(a.read(&uri("users://alice")).await.is_ok());
    assert!(b.read(&uri("users://alice")).await.is_ok());
}

#[tokio::test]
async fn broadcast_delete_reports_failing_peer() {
    let healthy = Arc::new(MemoryStore::new());
    healthy
        .receive(WriteRequest::new(uri("users://alice"), json(serde_json::json!(1))))
        .await
        .unwrap();
    let failing = Arc::new(FailingNode::new(NodeError::Backend("disk gone".into())));
    let broadcast = Broadcast::new(vec![healthy, failing]);

    let err = broadcast.delete(&uri("users://alice")).await.unwrap_err();
    assert!(matches!(err, NodeError::Backend(_)));
}

#[tokio::test]
async fn first_match_returns_first_ok() {
    let a = Arc::new(MemoryStore::new());
    let b = Arc::new(MemoryStore::new());
    a.receive(WriteRequest::new(uri("users://alice"), json(serde_json::json!("a"))))
        .await
        .unwrap();
    b.receive(WriteRequest::new(uri("users://alice"), json(serde_json::json!("b"))))
        .await
        .unwrap();

    let reads = FirstMatch::new(vec![a, b]);
    assert_eq!(
        reads.read(&uri("users://alice")).await.unwrap().data,
        json(serde_json::json!("a"))
    );
}

#[tokio::test]
async fn first_match_skips_failing_peers() {
    let failing = Arc::new(FailingNode::new(NodeError::Backend("down".into())));
    let healthy = Arc::new(MemoryStore::new());
    healthy
        .receive(WriteRequest::new(uri("users://alice"), json(serde_json::json!(1))))
        .await
        .unwrap();

    let reads = FirstMatch::new(vec![failing as Arc<dyn Node>, healthy]);
    assert!(reads.read(&uri("users://alice")).await.is_ok());
}

#[tokio::test]
async fn first_match_all_fail_is_not_found_with_last_message() {
    let first = Arc::new(FailingNode::new(NodeError::Backend("first down".into())));
    let last = Arc::new(FailingNode::new(NodeError::Backend("last down".into())));
    let reads = FirstMatch::new(vec![first as Arc<dyn Node>, last]);

    let err = reads.read(&uri("users://alice")).await.unwrap_err();
    assert!(matches!(err, NodeError::NotFound(_)));
    assert_eq!(err.message(), "last down");
}

#[tokio::test]
async fn combinators_are_nodes_themselves() {
    // A broadcast of first-matches is just another node.
    let a = Arc::new(MemoryStore::new());
    let b = Arc::new(MemoryStore::new());
    let inner = Arc::new(FirstMatch::new(vec![a.clone() as Arc<dyn Node>, b]));
    let outer = Broadcast::new(vec![a, inner.clone() as Arc<dyn Node>]);

    assert!(outer.read(&uri("users://nobody")).await.is_err());
    assert_eq!(outer.health().await, Health::healthy());
}
