//! # Remote WebSocket Backend
//!
//! A node over exactly one socket. Requests multiplex through a
//! pending-request table keyed by correlation id: the connection task
//! owns the socket, writes are serialized through a channel, and a single
//! reader dispatches responses back to their callers.
//!
//! Failure semantics:
//!
//! - A request that outlives its deadline resolves `timeout` and its
//!   table entry is removed, so a late response is discarded.
//! - When the socket drops, every in-flight request fails `disconnected`;
//!   nothing is replayed.
//! - Reconnection (optional) retries with capped exponential backoff.

#![warn(clippy::all)]

mod client;

pub use client::{ReconnectPolicy, RemoteWsStore, WsClientConfig, DEFAULT_TIMEOUT};
