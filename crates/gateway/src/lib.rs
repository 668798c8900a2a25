//! # Gateway - HTTP and WebSocket Server Surfaces
//!
//! A thin shell over the node interface. The HTTP surface parses URIs out
//! of path segments, calls the node, and maps error kinds to status
//! codes; the WebSocket surface multiplexes `{id, op, payload}` frames
//! over one socket with the client's ids echoed on every reply. Neither
//! surface suppresses an error kind: the caller always receives either
//! `{ok: true, …}` or `{ok: false, error: "<kind>: <message>"}`.
//!
//! Routes (under the configurable prefix, default `/api/v1`):
//!
//! - `GET    /health`
//! - `GET    /schema`
//! - `POST   /write/{scheme}/{authority}/{path…}`
//! - `GET    /read/{scheme}/{authority}/{path…}`
//! - `GET    /list/{scheme}/{authority}[/{path…}]`
//! - `DELETE /delete/{scheme}/{authority}/{path…}`
//! - `POST   /read-multi`
//! - `GET    /ws` (upgrade)

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod ws;

pub use config::{CorsConfig, GatewayConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_PREFIX};
pub use error::{status_for, ApiError};
pub use http::{AppState, RECORD_TS_HEADER};
pub use server::{create_cors_layer, GatewayError, GatewayServer};
