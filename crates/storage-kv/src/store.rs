//! # Namespaced Key/Value Store
//!
//! A node over any [`KeyValueBackend`]: every key is prefixed with the
//! store's namespace and records are serialized as JSON at the boundary,
//! so several stores (or non-store tenants) can share one backend without
//! colliding.

use crate::backend::{KeyValueBackend, KvError};
use async_trait::async_trait;
use shared_types::{
    collapse_prefix, envelope, Envelope, Health, ListOptions, ListPage, MonotonicClock, Node,
    NodeError, ProgramKey, Receipt, Record, Uri, Value, WriteRequest,
};

/// Key/value node with a namespace prefix and a JSON record codec.
pub struct KvStore<B: KeyValueBackend> {
    backend: B,
    namespace: String,
    clock: MonotonicClock,
}

impl<B: KeyValueBackend> KvStore<B> {
    pub fn new(backend: B, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            clock: MonotonicClock::new(),
        }
    }

    fn key_for(&self, uri: &Uri) -> String {
        format!("{}:{}", self.namespace, uri)
    }

    fn decode(&self, raw: &str) -> Result<Record, NodeError> {
        serde_json::from_str(raw)
            .map_err(|e| NodeError::Backend(format!("corrupt record: {}", e)))
    }

    fn put(&self, uri: &Uri, value: Value) -> Result<(), NodeError> {
        let record = Record::new(self.clock.now_millis(), value);
        let encoded = serde_json::to_string(&record).expect("records serialize");
        self.backend
            .put(&self.key_for(uri), &encoded)
            .map_err(into_node_error)
    }
}

fn into_node_error(err: KvError) -> NodeError {
    NodeError::Backend(err.to_string())
}

// Allow sharing one backend across stores by reference.
impl<B: KeyValueBackend> KeyValueBackend for &B {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        (*self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        (*self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, KvError> {
        (*self).remove(key)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        (*self).scan_prefix(prefix)
    }
}

#[async_trait]
impl<B: KeyValueBackend> Node for KvStore<B> {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        if let Some(env) = Envelope::detect(&request.value) {
            let resolved = Envelope::resolved_uri(&request.value);
            self.put(&resolved, request.value.clone())?;
            let children = envelope::receive_outputs(self, &env.outputs).await;
            return Ok(Receipt {
                resolved_uri: resolved,
                children,
            });
        }
        self.put(&request.uri, request.value)?;
        Ok(Receipt::single(request.uri))
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        match self.backend.get(&self.key_for(uri)).map_err(into_node_error)? {
            Some(raw) => self.decode(&raw),
            None => Err(NodeError::NotFound(uri.to_string())),
        }
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        let uri_prefix = format!("{}/", uri.as_str().trim_end_matches('/'));
        let key_prefix = format!("{}:{}", self.namespace, uri_prefix);
        let mut stored = Vec::new();
        for key in self
            .backend
            .scan_prefix(&key_prefix)
            .map_err(into_node_error)?
        {
            let stored_uri = &key[self.namespace.len() + 1..];
            let ts = match self.backend.get(&key).map_err(into_node_error)? {
                Some(raw) => self.decode(&raw)?.ts,
                None => continue,
            };
            stored.push((stored_uri.to_string(), ts));
        }
        Ok(collapse_prefix(uri, stored, &opts))
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        if self
            .backend
            .remove(&self.key_for(uri))
            .map_err(into_node_error)?
        {
            Ok(())
        } else {
            Err(NodeError::NotFound(uri.to_string()))
        }
    }

    async fn health(&self) -> Health {
        // A backend that cannot scan is not serving reads either.
        match self.backend.scan_prefix(&format!("{}:", self.namespace)) {
            Ok(_) => Health::healthy(),
            Err(err) => Health::unhealthy(err.to_string()),
        }
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        let prefix = format!("{}:", self.namespace);
        let mut keys: Vec<ProgramKey> = Vec::new();
        for key in self.backend.scan_prefix(&prefix).map_err(into_node_error)? {
            if let Ok(parsed) = Uri::parse(&key[prefix.len()..]) {
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
