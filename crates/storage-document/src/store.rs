//! # Document Store
//!
//! One collection, one document per URI, upsert on write. Listing builds
//! an anchored regex from the escaped URI prefix and collapses the
//! matches in the application, identically to the relational store.

use crate::executor::{Document, DocumentExecutor, ExecutorError};
use async_trait::async_trait;
use shared_types::{
    collapse_prefix, envelope, Envelope, Health, ListOptions, ListPage, MonotonicClock, Node,
    NodeError, ProgramKey, Receipt, Record, Uri, Value, WriteRequest,
};

/// Document node over an injected executor.
pub struct DocumentStore<E: DocumentExecutor> {
    executor: E,
    clock: MonotonicClock,
}

impl<E: DocumentExecutor> DocumentStore<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            clock: MonotonicClock::new(),
        }
    }

    async fn put(&self, uri: &Uri, value: Value) -> Result<(), NodeError> {
        let record = Record::new(self.clock.now_millis(), value);
        self.executor
            .upsert(Document {
                uri: uri.as_str().to_string(),
                data: serde_json::to_string(&record.data).expect("values serialize"),
                ts: record.ts,
            })
            .await
            .map_err(into_node_error)
    }
}

fn into_node_error(err: ExecutorError) -> NodeError {
    NodeError::Backend(err.to_string())
}

#[async_trait]
impl<E: DocumentExecutor> Node for DocumentStore<E> {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        if let Some(env) = Envelope::detect(&request.value) {
            let resolved = Envelope::resolved_uri(&request.value);
            self.put(&resolved, request.value.clone()).await?;
            let children = envelope::receive_outputs(self, &env.outputs).await;
            return Ok(Receipt {
                resolved_uri: resolved,
                children,
            });
        }
        self.put(&request.uri, request.value).await?;
        Ok(Receipt::single(request.uri))
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        let doc = self
            .executor
            .find_one(uri.as_str())
            .await
            .map_err(into_node_error)?
            .ok_or_else(|| NodeError::NotFound(uri.to_string()))?;
        let value: Value = serde_json::from_str(&doc.data)
            .map_err(|e| NodeError::Backend(format!("corrupt document: {}", e)))?;
        Ok(Record::new(doc.ts, value))
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        let prefix = format!("{}/", uri.as_str().trim_end_matches('/'));
        let stored = self
            .executor
            .find_uris(&format!("^{}", regex::escape(&prefix)))
            .await
            .map_err(into_node_error)?;
        Ok(collapse_prefix(uri, stored, &opts))
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        if self
            .executor
            .delete_one(uri.as_str())
            .await
            .map_err(into_node_error)?
        {
            Ok(())
        } else {
            Err(NodeError::NotFound(uri.to_string()))
        }
    }

    async fn health(&self) -> Health {
        match self.executor.ping().await {
            Ok(()) => Health::healthy(),
            Err(err) => Health::unhealthy(err.to_string()),
        }
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        let all = self
            .executor
            .find_uris("^")
            .await
            .map_err(into_node_error)?;
        let mut keys: Vec<ProgramKey> = Vec::new();
        for (uri, _) in all {
            if let Ok(parsed) = Uri::parse(&uri) {
                let program = parsed.program_key();
                if !keys.contains(&program) {
                    keys.push(program);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
