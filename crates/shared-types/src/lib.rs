//! # Shared Types Crate
//!
//! This crate contains the protocol types shared across every backend,
//! combinator, and server surface: the URI and record model, the polymorphic
//! value tree, the closed error-kind set, the `Node` operation contract, the
//! message envelope, and the canonical serializer.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate protocol types are defined
//!   here.
//! - **One Canonical Serializer**: Hashing, signing, and encryption all use
//!   the byte output of [`canonical::canonical_bytes`]; no other
//!   serialization is ever hashed or signed.
//! - **Closed Error Set**: Every failure surfaces as one of the
//!   [`NodeError`] kinds; no layer invents new kinds or swallows one.

pub mod canonical;
pub mod envelope;
pub mod errors;
pub mod list;
pub mod node;
pub mod record;
pub mod uri;
pub mod value;

pub use envelope::Envelope;
pub use errors::{ErrorKind, NodeError};
pub use list::{collapse_prefix, ListItem, ListItemKind, ListOptions, ListPage, PageInfo, SortBy, SortOrder};
pub use node::{
    ChildOutcome, Health, HealthStatus, Node, ReadMultiResult, ReadOutcome, ReadSummary, Receipt,
    WriteRequest, READ_MULTI_MAX,
};
pub use record::{MonotonicClock, Record};
pub use uri::{ProgramKey, Uri, UriError};
pub use value::Value;
