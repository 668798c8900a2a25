//! # Composition Combinators
//!
//! Broadcast, first-match, the validated wrapper, and the read/write
//! pair. Each is itself a [`shared_types::Node`], so compositions nest:
//! a validated broadcast over two replicas is
//! `Validated::new(schema, Arc::new(Broadcast::new(peers)))` and behaves
//! like any other node under tests and servers.

#![warn(clippy::all)]

pub mod broadcast;
pub mod first_match;
pub mod pair;
pub mod validated;

pub use broadcast::Broadcast;
pub use first_match::FirstMatch;
pub use pair::ReadWritePair;
pub use validated::Validated;
