//! # Shared Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Content addressing |
//! | `signatures` | Ed25519 | Principal identity, signed writes |
//! | `encryption` | X25519 + XChaCha20-Poly1305 | Envelope encryption |
//! | `passwords` | Argon2id | Wallet credential hashing |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency at signing time
//! - **XChaCha20**: 192-bit nonce, constant-time, random nonces are safe
//! - **Argon2id**: Memory-hard, salted, PHC-string encoded
//!
//! All hashing and signing operates on the canonical byte form defined by
//! `shared-types`; nothing else is ever hashed or signed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encryption;
pub mod errors;
pub mod hashing;
pub mod passwords;
pub mod signatures;

// Re-exports
pub use encryption::{EncryptionKeyPair, EncryptionPublicKey, SealedPayload};
pub use errors::CryptoError;
pub use hashing::{sha256_hash, sha256_hex, Sha256Hasher};
pub use passwords::{hash_password, verify_password};
pub use signatures::{SigningKeyPair, SigningPublicKey, SigningSignature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
