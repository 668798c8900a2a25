//! # In-Memory Storage Backend
//!
//! An ordered URI → record map behind a read/write lock. The reference
//! backend: every other backend must be observationally equivalent to this
//! one under the shared law suite, and compositions use it as the cheap
//! peer in tests.

#![warn(clippy::all)]

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    collapse_prefix, envelope, Envelope, Health, ListOptions, ListPage, MonotonicClock, Node,
    NodeError, ProgramKey, Receipt, Record, Uri, Value, WriteRequest,
};
use std::collections::BTreeMap;

/// In-memory node. Cheap to create, nothing persists.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Record>>,
    clock: MonotonicClock,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn put(&self, uri: &Uri, value: Value) {
        let record = Record::new(self.clock.now_millis(), value);
        self.records.write().insert(uri.as_str().to_string(), record);
    }
}

#[async_trait]
impl Node for MemoryStore {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        if let Some(env) = Envelope::detect(&request.value) {
            let resolved = Envelope::resolved_uri(&request.value);
            self.put(&resolved, request.value.clone());
            let children = envelope::receive_outputs(self, &env.outputs).await;
            return Ok(Receipt {
                resolved_uri: resolved,
                children,
            });
        }
        self.put(&request.uri, request.value);
        Ok(Receipt::single(request.uri))
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        self.records
            .read()
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| NodeError::NotFound(uri.to_string()))
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        let prefix = format!("{}/", uri.as_str().trim_end_matches('/'));
        let stored: Vec<(String, u64)> = self
            .records
            .read()
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, record)| (key.clone(), record.ts))
            .collect();
        Ok(collapse_prefix(uri, stored, &opts))
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        match self.records.write().remove(uri.as_str()) {
            Some(_) => Ok(()),
            None => Err(NodeError::NotFound(uri.to_string())),
        }
    }

    async fn health(&self) -> Health {
        Health::healthy()
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        let records = self.records.read();
        let mut keys: Vec<ProgramKey> = Vec::new();
        for uri in records.keys() {
            if let Ok(parsed) = Uri::parse(uri) {
                let key = parsed.program_key();
                if keys.last() != Some(&key) && !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}
