//! # Message Envelope
//!
//! A value whose `outputs` field is an array of `[uri, data]` pairs is a
//! message envelope. Backends store the envelope itself at its
//! content-hash URI and then receive every output individually, so a
//! reader of any output URI sees the record no matter how it was written.
//!
//! Detection is structural: every entry of `outputs` must be a two-element
//! array whose first element parses as a URI. Anything else is an ordinary
//! value and is stored as-is.

use crate::canonical::content_uri;
use crate::node::{ChildOutcome, Node, WriteRequest};
use crate::uri::Uri;
use crate::value::Value;

/// A detected multi-output envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Opaque provenance carried by the envelope, stored but not interpreted.
    pub inputs: Option<Value>,
    /// The `(uri, data)` outputs to receive individually.
    pub outputs: Vec<(Uri, Value)>,
}

impl Envelope {
    /// Structurally detect the envelope shape.
    pub fn detect(value: &Value) -> Option<Envelope> {
        let map = value.as_object()?;
        let outputs = map.get("outputs")?.as_array()?;
        let mut parsed = Vec::with_capacity(outputs.len());
        for entry in outputs {
            let pair = entry.as_array()?;
            if pair.len() != 2 {
                return None;
            }
            let uri = Uri::parse(pair[0].as_str()?).ok()?;
            parsed.push((uri, pair[1].clone()));
        }
        Some(Envelope {
            inputs: map.get("inputs").cloned(),
            outputs: parsed,
        })
    }

    /// The content-hash URI the raw envelope value is stored under.
    pub fn resolved_uri(raw: &Value) -> Uri {
        content_uri(raw)
    }
}

/// Receive every envelope output through `node`, collecting per-child
/// outcomes. A nested envelope that is only partially accepted surfaces as
/// that child's first failure.
pub async fn receive_outputs<N: Node + ?Sized>(
    node: &N,
    outputs: &[(Uri, Value)],
) -> Vec<ChildOutcome> {
    let mut children = Vec::with_capacity(outputs.len());
    for (uri, value) in outputs {
        let outcome = match node
            .receive(WriteRequest::new(uri.clone(), value.clone()))
            .await
        {
            Ok(receipt) => match receipt.first_error() {
                Some(err) => ChildOutcome::failed(uri.clone(), err.clone()),
                None => ChildOutcome::ok(uri.clone()),
            },
            Err(err) => ChildOutcome::failed(uri.clone(), err),
        };
        children.push(outcome);
    }
    children
}
