//! # Document Storage Backend
//!
//! A node over one collection of `{uri, data, ts}` documents reached
//! through the narrow [`DocumentExecutor`] seam. Real driver glue lives
//! outside the core; the executor contract is upsert, point lookup,
//! anchored-regex URI search, and single-document delete.

#![warn(clippy::all)]

pub mod executor;
pub mod store;

pub use executor::{Document, DocumentExecutor, ExecutorError, MemoryDocumentExecutor};
pub use store::DocumentStore;
