//! # Ed25519 Signatures
//!
//! Principal identity and signed writes. The payload bytes for a record
//! signature are `shared_types::canonical::signing_bytes(uri, value)`; this
//! module only ever sees bytes.
//!
//! Public keys render as lowercase hex; that hex form is what appears in
//! `auth` entries and substitutes for the `:key` placeholder.

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use shared_types::{canonical, Uri, Value};
use zeroize::Zeroize;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigningPublicKey([u8; 32]);

impl SigningPublicKey {
    /// Create from bytes, validating the curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Parse from lowercase hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes: [u8; 32] = hex::decode(s)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering; the principal identity string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over raw bytes.
    pub fn verify(&self, message: &[u8], signature: &SigningSignature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Verify a record signature over the canonical `(uri, value)` bytes.
    pub fn verify_record(
        &self,
        uri: &Uri,
        value: &Value,
        signature: &SigningSignature,
    ) -> Result<(), CryptoError> {
        self.verify(&canonical::signing_bytes(uri, value), signature)
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigningSignature([u8; 64]);

impl SigningSignature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from lowercase hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes: [u8; 64] = hex::decode(s)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Ed25519 keypair.
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Get public key.
    pub fn public_key(&self) -> SigningPublicKey {
        SigningPublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign raw bytes (deterministic, no RNG needed).
    pub fn sign(&self, message: &[u8]) -> SigningSignature {
        SigningSignature(self.signing_key.sign(message).to_bytes())
    }

    /// Sign the canonical `(uri, value)` bytes of a record.
    pub fn sign_record(&self, uri: &Uri, value: &Value) -> SigningSignature {
        self.sign(&canonical::signing_bytes(uri, value))
    }

    /// Get secret seed (for persistence in the credential store).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Drop for SigningKeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = SigningKeyPair::generate();
        let signature = keypair.sign(b"hello");
        assert!(keypair.public_key().verify(b"hello", &signature).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = SigningKeyPair::generate();
        let signature = keypair.sign(b"message1");
        assert!(keypair.public_key().verify(b"message2", &signature).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = SigningKeyPair::generate();
        let keypair2 = SigningKeyPair::generate();
        let signature = keypair1.sign(b"test");
        assert!(keypair2.public_key().verify(b"test", &signature).is_err());
    }

    #[test]
    fn test_record_signature_binds_uri_and_value() {
        let keypair = SigningKeyPair::generate();
        let uri = Uri::parse("users://alice/p").unwrap();
        let other_uri = Uri::parse("users://mallory/p").unwrap();
        let value = Value::from_json(serde_json::json!({"n": 1}));

        let signature = keypair.sign_record(&uri, &value);
        assert!(keypair
            .public_key()
            .verify_record(&uri, &value, &signature)
            .is_ok());
        assert!(keypair
            .public_key()
            .verify_record(&other_uri, &value, &signature)
            .is_err());
    }

    #[test]
    fn test_hex_round_trip() {
        let keypair = SigningKeyPair::generate();
        let public = keypair.public_key();
        let parsed = SigningPublicKey::from_hex(&public.to_hex()).unwrap();
        assert_eq!(parsed, public);

        let signature = keypair.sign(b"x");
        let parsed = SigningSignature::from_hex(&signature.to_hex()).unwrap();
        assert_eq!(parsed, signature);
    }

    #[test]
    fn test_seed_round_trip() {
        let original = SigningKeyPair::generate();
        let restored = SigningKeyPair::from_seed(original.to_seed());
        assert_eq!(original.public_key(), restored.public_key());
    }
}
