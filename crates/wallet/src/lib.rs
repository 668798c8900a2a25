//! # Wallet
//!
//! The privileged component between application code and storage. It
//! holds per-user key material, signs outgoing writes, resolves the
//! symbolic `:key` placeholder to the authenticated principal, optionally
//! envelope-encrypts payloads, and decrypts on read.
//!
//! ## Responsibilities
//!
//! - **Credential lifecycle**: per `(app_key, username)` an Argon2
//!   password hash, an Ed25519 signing keypair (the principal identity),
//!   and an X25519 keypair, persisted under a reserved program key.
//! - **Session authorization**: login and signup requests must be signed
//!   by an ephemeral session keypair whose public key the application
//!   owner pre-approved at
//!   `mutable://accounts/{app_key}/sessions/{session_pub}`.
//! - **JWT sessions**: HS256 tokens carrying
//!   `{app_key, username, principal_pub}` with expiry.
//! - **Proxy writes/reads**: `:key` resolution, auth-wrapped signed
//!   records, optional self-addressed encryption, batched decrypting
//!   reads.
//!
//! The wallet distinguishes `auth` (session/signature/token problems)
//! from `decrypt` (ciphertext cannot be opened) from `backend` errors
//! propagated from storage.

#![warn(clippy::all)]

pub mod config;
pub mod credentials;
pub mod http;
pub mod identity;
pub mod server;
pub mod session;
pub mod wallet;

pub use config::WalletConfig;
pub use credentials::{CredentialRecord, CredentialStore};
pub use identity::{IdentityProfile, IdentityVerifier, StaticIdentityVerifier};
pub use server::{WalletServer, WalletServerError};
pub use session::{Claims, SessionKeys};
pub use wallet::{
    AuthRequest, AuthResponse, ProxyReadResponse, ProxyWriteRequest, ProxyWriteResponse, Wallet,
};
