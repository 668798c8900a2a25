//! # SQL Executor Contract
//!
//! The narrow seam a real driver plugs into. The store issues only the
//! fixed statements in [`crate::statements`], each as a single
//! transaction; a driver adapter binds the positional parameters and maps
//! rows back. The in-memory executor interprets exactly those statements
//! so the store is testable without a database.

use crate::statements;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from the SQL layer.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Driver-level failure (connection, constraint, syntax).
    #[error("sql error: {0}")]
    Sql(String),

    /// The executor does not recognize a statement.
    ///
    /// Only the in-memory executor produces this; it means the store and
    /// the statement set have drifted apart.
    #[error("unsupported statement: {0}")]
    Unsupported(String),
}

/// A positional statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    BigInt(i64),
}

impl SqlParam {
    fn as_text(&self) -> Result<&str, ExecutorError> {
        match self {
            SqlParam::Text(s) => Ok(s),
            other => Err(ExecutorError::Sql(format!("expected text, got {:?}", other))),
        }
    }

    fn as_big_int(&self) -> Result<i64, ExecutorError> {
        match self {
            SqlParam::BigInt(n) => Ok(*n),
            other => Err(ExecutorError::Sql(format!("expected bigint, got {:?}", other))),
        }
    }
}

/// A value in a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    BigInt(i64),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_big_int(&self) -> Option<i64> {
        match self {
            SqlValue::BigInt(n) => Some(*n),
            _ => None,
        }
    }
}

/// One result row, positional.
pub type SqlRow = Vec<SqlValue>;

/// Minimal query surface the store needs from a database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a statement that returns no rows; yields the affected count.
    async fn execute(&self, statement: &str, params: &[SqlParam]) -> Result<u64, ExecutorError>;

    /// Run a statement that returns rows.
    async fn query(&self, statement: &str, params: &[SqlParam])
        -> Result<Vec<SqlRow>, ExecutorError>;
}

#[derive(Clone)]
struct StoredRow {
    data: String,
    ts: i64,
    created_at: i64,
    updated_at: i64,
}

/// In-memory executor interpreting the store's statement set.
#[derive(Default)]
pub struct MemorySqlExecutor {
    rows: RwLock<BTreeMap<String, StoredRow>>,
}

impl MemorySqlExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows (test helper).
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }
}

/// Undo the LIKE escaping applied by the store and strip the trailing `%`.
fn like_prefix(pattern: &str) -> Result<String, ExecutorError> {
    let body = pattern
        .strip_suffix('%')
        .ok_or_else(|| ExecutorError::Sql(format!("expected prefix pattern, got {:?}", pattern)))?;
    let mut prefix = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => prefix.push(escaped),
                None => return Err(ExecutorError::Sql("dangling escape in pattern".into())),
            }
        } else {
            prefix.push(c);
        }
    }
    Ok(prefix)
}

#[async_trait]
impl SqlExecutor for MemorySqlExecutor {
    async fn execute(&self, statement: &str, params: &[SqlParam]) -> Result<u64, ExecutorError> {
        match statement {
            statements::CREATE_TABLE | statements::CREATE_URI_INDEX => Ok(0),
            statements::UPSERT => {
                let uri = params[0].as_text()?.to_string();
                let data = params[1].as_text()?.to_string();
                let ts = params[2].as_big_int()?;
                let mut rows = self.rows.write();
                match rows.get_mut(&uri) {
                    Some(row) => {
                        row.data = data;
                        row.ts = ts;
                        row.updated_at = ts;
                    }
                    None => {
                        rows.insert(
                            uri,
                            StoredRow {
                                data,
                                ts,
                                created_at: ts,
                                updated_at: ts,
                            },
                        );
                    }
                }
                Ok(1)
            }
            statements::DELETE => {
                let uri = params[0].as_text()?;
                Ok(self.rows.write().remove(uri).is_some() as u64)
            }
            other => Err(ExecutorError::Unsupported(other.to_string())),
        }
    }

    async fn query(&self, statement: &str, params: &[SqlParam])
        -> Result<Vec<SqlRow>, ExecutorError> {
        match statement {
            statements::SELECT_ONE => {
                let uri = params[0].as_text()?;
                Ok(self
                    .rows
                    .read()
                    .get(uri)
                    .map(|row| {
                        vec![
                            SqlValue::Text(row.data.clone()),
                            SqlValue::BigInt(row.ts),
                        ]
                    })
                    .into_iter()
                    .collect())
            }
            statements::SCAN_PREFIX => {
                let prefix = like_prefix(params[0].as_text()?)?;
                Ok(self
                    .rows
                    .read()
                    .range(prefix.clone()..)
                    .take_while(|(uri, _)| uri.starts_with(&prefix))
                    .map(|(uri, row)| vec![SqlValue::Text(uri.clone()), SqlValue::BigInt(row.ts)])
                    .collect())
            }
            statements::SELECT_URIS => Ok(self
                .rows
                .read()
                .keys()
                .map(|uri| vec![SqlValue::Text(uri.clone())])
                .collect()),
            statements::PING => Ok(vec![vec![SqlValue::BigInt(1)]]),
            other => Err(ExecutorError::Unsupported(other.to_string())),
        }
    }
}
