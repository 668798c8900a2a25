//! # Relational Store
//!
//! One table, one row per URI, upsert on write, `LIKE 'prefix%'` scans on
//! list. Directory collapsing happens in the application: the scan yields
//! `(uri, ts)` pairs and the shared collapsing produces the page.

use crate::executor::{ExecutorError, SqlExecutor, SqlParam};
use crate::statements;
use async_trait::async_trait;
use shared_types::{
    collapse_prefix, envelope, Envelope, Health, ListOptions, ListPage, MonotonicClock, Node,
    NodeError, ProgramKey, Receipt, Record, Uri, Value, WriteRequest,
};

/// Relational node over an injected executor.
pub struct RelationalStore<E: SqlExecutor> {
    executor: E,
    clock: MonotonicClock,
}

impl<E: SqlExecutor> RelationalStore<E> {
    /// Wrap an executor. Call [`RelationalStore::init`] once per database
    /// before serving traffic.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            clock: MonotonicClock::new(),
        }
    }

    /// Create the table and index if they do not exist.
    pub async fn init(&self) -> Result<(), NodeError> {
        self.executor
            .execute(statements::CREATE_TABLE, &[])
            .await
            .map_err(into_node_error)?;
        self.executor
            .execute(statements::CREATE_URI_INDEX, &[])
            .await
            .map_err(into_node_error)?;
        Ok(())
    }

    async fn put(&self, uri: &Uri, value: Value) -> Result<(), NodeError> {
        let record = Record::new(self.clock.now_millis(), value);
        let data = serde_json::to_string(&record.data).expect("values serialize");
        self.executor
            .execute(
                statements::UPSERT,
                &[
                    SqlParam::Text(uri.as_str().to_string()),
                    SqlParam::Text(data),
                    SqlParam::BigInt(record.ts as i64),
                ],
            )
            .await
            .map_err(into_node_error)?;
        Ok(())
    }

    async fn scan(&self, uri_prefix: &str) -> Result<Vec<(String, u64)>, NodeError> {
        let pattern = format!("{}%", escape_like(uri_prefix));
        let rows = self
            .executor
            .query(statements::SCAN_PREFIX, &[SqlParam::Text(pattern)])
            .await
            .map_err(into_node_error)?;
        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows {
            let uri = row
                .first()
                .and_then(|v| v.as_text())
                .ok_or_else(|| NodeError::Backend("scan row missing uri".into()))?;
            let ts = row
                .get(1)
                .and_then(|v| v.as_big_int())
                .ok_or_else(|| NodeError::Backend("scan row missing ts".into()))?;
            pairs.push((uri.to_string(), ts as u64));
        }
        Ok(pairs)
    }
}

fn into_node_error(err: ExecutorError) -> NodeError {
    NodeError::Backend(err.to_string())
}

/// Escape `\`, `%`, and `_` so a URI prefix matches literally in LIKE.
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl<E: SqlExecutor> Node for RelationalStore<E> {
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
        let rows = self
            .executor
            .query(
                statements::SELECT_ONE,
                &[SqlParam::Text(uri.as_str().to_string())],
            )
            .await
            .map_err(into_node_error)?;
        let row = rows
            .first()
            .ok_or_else(|| NodeError::NotFound(uri.to_string()))?;
        let data = row
            .first()
            .and_then(|v| v.as_text())
            .ok_or_else(|| NodeError::Backend("row missing data column".into()))?;
        let ts = row
            .get(1)
            .and_then(|v| v.as_big_int())
            .ok_or_else(|| NodeError::Backend("row missing ts column".into()))?;
        let value: Value = serde_json::from_str(data)
            .map_err(|e| NodeError::Backend(format!("corrupt data column: {}", e)))?;
        Ok(Record::new(ts as u64, value))
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        let prefix = format!("{}/", uri.as_str().trim_end_matches('/'));
        let stored = self.scan(&prefix).await?;
        Ok(collapse_prefix(uri, stored, &opts))
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        let affected = self
            .executor
            .execute(
                statements::DELETE,
                &[SqlParam::Text(uri.as_str().to_string())],
            )
            .await
            .map_err(into_node_error)?;
        if affected == 0 {
            return Err(NodeError::NotFound(uri.to_string()));
        }
        Ok(())
    }

    async fn health(&self) -> Health {
        match self.executor.query(statements::PING, &[]).await {
            Ok(_) => Health::healthy(),
            Err(err) => Health::unhealthy(err.to_string()),
        }
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        let rows = self
            .executor
            .query(statements::SELECT_URIS, &[])
            .await
            .map_err(into_node_error)?;
        let mut keys: Vec<ProgramKey> = Vec::new();
        for row in rows {
            let Some(uri) = row.first().and_then(|v| v.as_text()) else {
                continue;
            };
            if let Ok(parsed) = Uri::parse(uri) {
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
