//! # Validated Client
//!
//! Wraps a node with the schema pre-step: on `receive`, the write's
//! program key selects a validator from the registry and only accepted
//! writes reach the wrapped node. No registered validator means the write
//! fails `no-schema` — never a silent accept.
//!
//! Validators run with a read handle onto the wrapped node, so existence
//! and immutability checks see exactly the store the write would land in.
//! A panicking validator is contained and reported as a `validation`
//! failure.

use async_trait::async_trait;
use futures::FutureExt;
use schema_registry::{ReadHandle, SchemaRegistry};
use shared_types::{
    Health, ListOptions, ListPage, Node, NodeError, ProgramKey, Receipt, Record, Uri, Value,
    WriteRequest,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Schema-enforcing wrapper around a node.
pub struct Validated {
    registry: SchemaRegistry,
    inner: Arc<dyn Node>,
}

impl Validated {
    pub fn new(registry: SchemaRegistry, inner: Arc<dyn Node>) -> Self {
        Self { registry, inner }
    }

    async fn validate(&self, uri: &Uri, value: &Value) -> Result<(), NodeError> {
        let program = uri.program_key();
        let validator = self.registry.get(&program).ok_or_else(|| {
            NodeError::NoSchema(format!("no validator registered for {}", program))
        })?;

        let outcome = AssertUnwindSafe(validator.validate(uri, value, ReadHandle::new(self.inner.as_ref())))
            .catch_unwind()
            .await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(NodeError::Validation(format!(
                "validator for {} panicked",
                program
            ))),
        }
    }
}

#[async_trait]
impl Node for Validated {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        self.validate(&request.uri, &request.value).await?;
        self.inner.receive(request).await
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        self.inner.read(uri).await
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        self.inner.list(uri, opts).await
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        self.inner.delete(uri).await
    }

    async fn health(&self) -> Health {
        self.inner.health().await
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        // The schema is what this node knows how to accept.
        Ok(self.registry.program_keys())
    }

    async fn close(&self) -> Result<(), NodeError> {
        self.inner.close().await
    }
}
