//! # Node Operation Contract
//!
//! Every storage backend, every composition combinator, and both server
//! surfaces implement [`Node`]. Combinators are nodes over other nodes, so
//! compositions nest freely and tests treat all of them uniformly.

use crate::errors::NodeError;
use crate::list::{ListOptions, ListPage};
use crate::record::Record;
use crate::uri::{ProgramKey, Uri};
use crate::value::Value;
use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Maximum URIs accepted by one `read_multi` call.
pub const READ_MULTI_MAX: usize = 50;

/// A single write: full URI plus value (which may be a message envelope).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub uri: Uri,
    pub value: Value,
}

impl WriteRequest {
    pub fn new(uri: Uri, value: Value) -> Self {
        Self { uri, value }
    }
}

/// Outcome of one envelope output.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildOutcome {
    pub uri: Uri,
    pub result: Result<(), NodeError>,
}

impl ChildOutcome {
    pub fn ok(uri: Uri) -> Self {
        Self {
            uri,
            result: Ok(()),
        }
    }

    pub fn failed(uri: Uri, error: NodeError) -> Self {
        Self {
            uri,
            result: Err(error),
        }
    }
}

impl Serialize for ChildOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChildOutcome", 3)?;
        state.serialize_field("uri", &self.uri)?;
        state.serialize_field("ok", &self.result.is_ok())?;
        match &self.result {
            Ok(()) => state.skip_field("error")?,
            Err(err) => state.serialize_field("error", &err.to_string())?,
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ChildOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OutcomeVisitor;

        impl<'de> Visitor<'de> for OutcomeVisitor {
            type Value = ChildOutcome;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a child outcome object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut uri: Option<Uri> = None;
                let mut ok: Option<bool> = None;
                let mut error: Option<String> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "uri" => uri = Some(map.next_value()?),
                        "ok" => ok = Some(map.next_value()?),
                        "error" => error = map.next_value()?,
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                let uri = uri.ok_or_else(|| serde::de::Error::missing_field("uri"))?;
                let result = match (ok.unwrap_or(false), error) {
                    (true, _) => Ok(()),
                    (false, Some(wire)) => Err(NodeError::parse_wire(&wire)),
                    (false, None) => Err(NodeError::Backend("unspecified failure".into())),
                };
                Ok(ChildOutcome { uri, result })
            }
        }

        deserializer.deserialize_map(OutcomeVisitor)
    }
}

/// Result of an accepted `receive`.
///
/// Plain writes carry the written URI and no children. Envelope writes
/// carry the envelope's content-hash URI plus one outcome per output; the
/// write is fully accepted only when every child succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub resolved_uri: Uri,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildOutcome>,
}

impl Receipt {
    /// Receipt of a plain single-record write.
    pub fn single(resolved_uri: Uri) -> Self {
        Self {
            resolved_uri,
            children: Vec::new(),
        }
    }

    /// Whether the write, including every envelope output, was accepted.
    pub fn accepted(&self) -> bool {
        self.children.iter().all(|c| c.result.is_ok())
    }

    /// The first failing child's error, if any.
    pub fn first_error(&self) -> Option<&NodeError> {
        self.children.iter().find_map(|c| c.result.as_ref().err())
    }

    /// Collapse into a plain result, surfacing the first child failure.
    pub fn into_result(self) -> Result<Receipt, NodeError> {
        match self.first_error() {
            Some(err) => Err(err.clone()),
            None => Ok(self),
        }
    }
}

/// Per-URI outcome of a `read_multi`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub uri: Uri,
    pub result: Result<Record, NodeError>,
}

impl Serialize for ReadOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ReadOutcome", 3)?;
        state.serialize_field("uri", &self.uri)?;
        state.serialize_field("ok", &self.result.is_ok())?;
        match &self.result {
            Ok(record) => state.serialize_field("record", record)?,
            Err(err) => state.serialize_field("error", &err.to_string())?,
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ReadOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OutcomeVisitor;

        impl<'de> Visitor<'de> for OutcomeVisitor {
            type Value = ReadOutcome;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a read outcome object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut uri: Option<Uri> = None;
                let mut record: Option<Record> = None;
                let mut error: Option<String> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "uri" => uri = Some(map.next_value()?),
                        "record" => record = map.next_value()?,
                        "error" => error = map.next_value()?,
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                let uri = uri.ok_or_else(|| serde::de::Error::missing_field("uri"))?;
                let result = match (record, error) {
                    (Some(record), _) => Ok(record),
                    (None, Some(wire)) => Err(NodeError::parse_wire(&wire)),
                    (None, None) => Err(NodeError::NotFound(uri.to_string())),
                };
                Ok(ReadOutcome { uri, result })
            }
        }

        deserializer.deserialize_map(OutcomeVisitor)
    }
}

/// Aggregate counts of a `read_multi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Result of a `read_multi`: per-URI outcomes plus the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadMultiResult {
    pub results: Vec<ReadOutcome>,
    pub summary: ReadSummary,
}

impl ReadMultiResult {
    /// Assemble from per-URI outcomes, computing the summary.
    pub fn from_outcomes(results: Vec<ReadOutcome>) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.result.is_ok()).count();
        Self {
            results,
            summary: ReadSummary {
                total,
                succeeded,
                failed: total - succeeded,
            },
        }
    }
}

/// Node health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health report of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl Health {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            info: None,
        }
    }

    pub fn degraded(info: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            info: Some(info.into()),
        }
    }

    pub fn unhealthy(info: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            info: Some(info.into()),
        }
    }
}

/// The uniform operation set.
///
/// Writes to the same URI within one node are linearizable; the last
/// accepted `receive` determines what `read` returns. Every operation may
/// suspend (storage I/O, network I/O, validator reads).
#[async_trait]
pub trait Node: Send + Sync {
    /// Store a value (or unpack a message envelope) at a URI.
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError>;

    /// Read the record at a URI; `not-found` when absent.
    async fn read(&self, uri: &Uri) -> Result<Record, NodeError>;

    /// Read up to [`READ_MULTI_MAX`] URIs with per-URI outcomes.
    async fn read_multi(&self, uris: &[Uri]) -> Result<ReadMultiResult, NodeError> {
        if uris.len() > READ_MULTI_MAX {
            return Err(NodeError::BatchTooLarge(format!(
                "{} uris exceeds the limit of {}",
                uris.len(),
                READ_MULTI_MAX
            )));
        }
        let mut results = Vec::with_capacity(uris.len());
        for uri in uris {
            results.push(ReadOutcome {
                uri: uri.clone(),
                result: self.read(uri).await,
            });
        }
        Ok(ReadMultiResult::from_outcomes(results))
    }

    /// List immediate children of a path prefix.
    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError>;

    /// Remove the record at a URI; `not-found` when absent.
    async fn delete(&self, uri: &Uri) -> Result<(), NodeError>;

    /// Health of this node.
    async fn health(&self) -> Health;

    /// Program keys known to this node.
    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError>;

    /// Release resources. Safe to call more than once.
    async fn close(&self) -> Result<(), NodeError> {
        Ok(())
    }
}
