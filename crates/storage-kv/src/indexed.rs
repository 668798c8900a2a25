//! # Indexed Key/Value Store
//!
//! A versioned variant of the key/value store that keeps a by-ts index
//! next to the records. ts-sorted listings walk the index instead of
//! decoding every record, and the persisted layout carries a version
//! marker so a future layout change can migrate on open.
//!
//! Key layout inside the namespace:
//!
//! ```text
//! {ns}:meta              → {"version": 1}
//! {ns}:rec:{uri}         → record JSON
//! {ns}:ts:{ts:016}:{uri} → ""
//! ```

use crate::backend::{KeyValueBackend, KvError};
use async_trait::async_trait;
use shared_types::{
    collapse_prefix, envelope, Envelope, Health, ListOptions, ListPage, MonotonicClock, Node,
    NodeError, ProgramKey, Receipt, Record, SortBy, Uri, Value, WriteRequest,
};

/// Current persisted layout version.
pub const LAYOUT_VERSION: u64 = 1;

/// Key/value node with a by-ts index and a versioned layout.
pub struct IndexedKvStore<B: KeyValueBackend> {
    backend: B,
    namespace: String,
    clock: MonotonicClock,
}

impl<B: KeyValueBackend> IndexedKvStore<B> {
    /// Open the store, writing or checking the layout version marker.
    pub fn open(backend: B, namespace: impl Into<String>) -> Result<Self, NodeError> {
        let namespace = namespace.into();
        let meta_key = format!("{}:meta", namespace);
        match backend.get(&meta_key).map_err(into_node_error)? {
            Some(raw) => {
                let meta: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|e| NodeError::Backend(format!("corrupt meta record: {}", e)))?;
                let version = meta.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
                if version != LAYOUT_VERSION {
                    return Err(NodeError::Backend(format!(
                        "unsupported layout version {} (expected {})",
                        version, LAYOUT_VERSION
                    )));
                }
            }
            None => {
                let meta = serde_json::json!({ "version": LAYOUT_VERSION }).to_string();
                backend.put(&meta_key, &meta).map_err(into_node_error)?;
            }
        }
        Ok(Self {
            backend,
            namespace,
            clock: MonotonicClock::new(),
        })
    }

    fn record_key(&self, uri: &Uri) -> String {
        format!("{}:rec:{}", self.namespace, uri)
    }

    fn ts_key(&self, ts: u64, uri: &str) -> String {
        format!("{}:ts:{:016}:{}", self.namespace, ts, uri)
    }

    fn decode(&self, raw: &str) -> Result<Record, NodeError> {
        serde_json::from_str(raw)
            .map_err(|e| NodeError::Backend(format!("corrupt record: {}", e)))
    }

    fn put(&self, uri: &Uri, value: Value) -> Result<(), NodeError> {
        let key = self.record_key(uri);
        // Drop the stale index entry of an overwrite.
        if let Some(raw) = self.backend.get(&key).map_err(into_node_error)? {
            let old = self.decode(&raw)?;
            self.backend
                .remove(&self.ts_key(old.ts, uri.as_str()))
                .map_err(into_node_error)?;
        }
        let record = Record::new(self.clock.now_millis(), value);
        let encoded = serde_json::to_string(&record).expect("records serialize");
        self.backend.put(&key, &encoded).map_err(into_node_error)?;
        self.backend
            .put(&self.ts_key(record.ts, uri.as_str()), "")
            .map_err(into_node_error)?;
        Ok(())
    }

    /// Enumerate `(uri, ts)` pairs under a URI prefix via the ts index.
    fn scan_by_ts(&self, uri_prefix: &str) -> Result<Vec<(String, u64)>, NodeError> {
        let index_prefix = format!("{}:ts:", self.namespace);
        let mut pairs = Vec::new();
        for key in self
            .backend
            .scan_prefix(&index_prefix)
            .map_err(into_node_error)?
        {
            let rest = &key[index_prefix.len()..];
            let Some((ts_part, stored_uri)) = rest.split_once(':') else {
                continue;
            };
            if !stored_uri.starts_with(uri_prefix) {
                continue;
            }
            let ts = ts_part
                .parse::<u64>()
                .map_err(|_| NodeError::Backend(format!("corrupt index key {}", key)))?;
            pairs.push((stored_uri.to_string(), ts));
        }
        Ok(pairs)
    }
}

fn into_node_error(err: KvError) -> NodeError {
    NodeError::Backend(err.to_string())
}

#[async_trait]
impl<B: KeyValueBackend> Node for IndexedKvStore<B> {
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
        match self
            .backend
            .get(&self.record_key(uri))
            .map_err(into_node_error)?
        {
            Some(raw) => self.decode(&raw),
            None => Err(NodeError::NotFound(uri.to_string())),
        }
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        let uri_prefix = format!("{}/", uri.as_str().trim_end_matches('/'));
        let stored = if opts.sort_by == SortBy::Ts {
            self.scan_by_ts(&uri_prefix)?
        } else {
            let key_prefix = format!("{}:rec:{}", self.namespace, uri_prefix);
            let mut pairs = Vec::new();
            for key in self
                .backend
                .scan_prefix(&key_prefix)
                .map_err(into_node_error)?
            {
                let stored_uri = key[self.namespace.len() + 5..].to_string();
                let ts = match self.backend.get(&key).map_err(into_node_error)? {
                    Some(raw) => self.decode(&raw)?.ts,
                    None => continue,
                };
                pairs.push((stored_uri, ts));
            }
            pairs
        };
        Ok(collapse_prefix(uri, stored, &opts))
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        let key = self.record_key(uri);
        match self.backend.get(&key).map_err(into_node_error)? {
            Some(raw) => {
                let record = self.decode(&raw)?;
                self.backend.remove(&key).map_err(into_node_error)?;
                self.backend
                    .remove(&self.ts_key(record.ts, uri.as_str()))
                    .map_err(into_node_error)?;
                Ok(())
            }
            None => Err(NodeError::NotFound(uri.to_string())),
        }
    }

    async fn health(&self) -> Health {
        match self.backend.get(&format!("{}:meta", self.namespace)) {
            Ok(Some(_)) => Health::healthy(),
            Ok(None) => Health::degraded("meta record missing"),
            Err(err) => Health::unhealthy(err.to_string()),
        }
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        let prefix = format!("{}:rec:", self.namespace);
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
