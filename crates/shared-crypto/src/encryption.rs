//! # Envelope Encryption
//!
//! X25519 Diffie-Hellman to a recipient's public key, then
//! XChaCha20-Poly1305 over the plaintext. The AEAD key is the SHA-256 of
//! the raw shared secret. With the 192-bit nonce, random nonces are safe.
//!
//! The default recipient is the sender itself, which makes a record
//! self-addressed: only the principal's own keys can open it.

use crate::hashing::sha256_hash;
use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// XChaCha20 nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// X25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptionPublicKey([u8; 32]);

impl EncryptionPublicKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from lowercase hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes: [u8; 32] = hex::decode(s)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// A sealed ciphertext with its nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedPayload {
    /// 24-byte XChaCha20 nonce.
    pub nonce: [u8; NONCE_LEN],
    /// AEAD ciphertext with tag.
    pub ciphertext: Vec<u8>,
}

/// X25519 keypair.
pub struct EncryptionKeyPair {
    secret: StaticSecret,
}

impl EncryptionKeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let pair = Self::from_seed(seed);
        seed.zeroize();
        pair
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            secret: StaticSecret::from(seed),
        }
    }

    /// Get public key.
    pub fn public_key(&self) -> EncryptionPublicKey {
        EncryptionPublicKey(PublicKey::from(&self.secret).to_bytes())
    }

    /// Get secret seed (for persistence in the credential store).
    pub fn to_seed(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Seal plaintext for a recipient.
    pub fn seal(
        &self,
        recipient: &EncryptionPublicKey,
        plaintext: &[u8],
    ) -> Result<SealedPayload, CryptoError> {
        let cipher = self.cipher_for(recipient);
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(SealedPayload { nonce, ciphertext })
    }

    /// Open a payload sealed between this keypair and `peer`.
    ///
    /// Diffie-Hellman is symmetric, so the same call opens payloads this
    /// key sealed for `peer` and payloads `peer` sealed for this key.
    pub fn open(
        &self,
        peer: &EncryptionPublicKey,
        sealed: &SealedPayload,
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = self.cipher_for(peer);
        cipher
            .decrypt(XNonce::from_slice(&sealed.nonce), sealed.ciphertext.as_ref())
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }

    fn cipher_for(&self, peer: &EncryptionPublicKey) -> XChaCha20Poly1305 {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer.as_bytes()));
        let mut key = sha256_hash(shared.as_bytes());
        let cipher = XChaCha20Poly1305::new(key.as_ref().into());
        key.zeroize();
        cipher
    }
}
