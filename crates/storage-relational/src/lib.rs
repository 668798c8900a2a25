//! # Relational Storage Backend
//!
//! A node over a single `records` table reached through the narrow
//! [`SqlExecutor`] seam. Real driver glue lives outside the core: an
//! adapter implements [`SqlExecutor`] for its pool and binds the fixed
//! statement set in [`statements`]; each node operation is one statement,
//! one transaction.

#![warn(clippy::all)]

pub mod executor;
pub mod statements;
pub mod store;

pub use executor::{ExecutorError, MemorySqlExecutor, SqlExecutor, SqlParam, SqlRow, SqlValue};
pub use store::RelationalStore;
