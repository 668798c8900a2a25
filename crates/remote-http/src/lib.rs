//! # Remote HTTP Backend
//!
//! A node whose storage is a gateway on the far side of HTTP: each
//! operation maps to exactly one call against the gateway routes, with
//! the error envelope decoded back into the protocol kinds. Validation
//! is the server's responsibility; this client forwards values unchanged
//! (envelopes included).

#![warn(clippy::all)]

mod client;

pub use client::{HttpClientConfig, RemoteHttpStore};
