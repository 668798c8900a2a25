//! # Credential Store
//!
//! Persists one blob per `(app_key, username)` under the reserved
//! `wallet://credentials` program key, directly against the wallet's
//! backing store. The blob carries the Argon2 password hash (when the
//! account uses one), both long-term key seeds, and the bound third-party
//! identity (when the account uses one) — everything the wallet needs to
//! re-derive the principal.

use serde::{Deserialize, Serialize};
use shared_crypto::{EncryptionKeyPair, SigningKeyPair};
use shared_types::{Node, NodeError, Uri, Value, WriteRequest};
use std::sync::Arc;

/// Reserved program key of credential records.
pub const CREDENTIALS_PROGRAM: &str = "wallet://credentials";

/// Reserved program key of password-reset tokens.
pub const RESETS_PROGRAM: &str = "wallet://resets";

/// One persisted credential blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Argon2 PHC string; absent for identity-only accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_phc: Option<String>,
    /// Ed25519 seed, hex.
    pub signing_seed: String,
    /// X25519 seed, hex.
    pub encryption_seed: String,
    /// Email of the bound third-party identity, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_email: Option<String>,
}

impl CredentialRecord {
    /// Mint a record with fresh keypairs.
    pub fn generate(password_phc: Option<String>, identity_email: Option<String>) -> Self {
        Self {
            password_phc,
            signing_seed: hex::encode(SigningKeyPair::generate().to_seed()),
            encryption_seed: hex::encode(EncryptionKeyPair::generate().to_seed()),
            identity_email,
        }
    }

    /// Rebuild the signing keypair from the stored seed.
    pub fn signing_keys(&self) -> Result<SigningKeyPair, NodeError> {
        Ok(SigningKeyPair::from_seed(decode_seed(&self.signing_seed)?))
    }

    /// Rebuild the encryption keypair from the stored seed.
    pub fn encryption_keys(&self) -> Result<EncryptionKeyPair, NodeError> {
        Ok(EncryptionKeyPair::from_seed(decode_seed(
            &self.encryption_seed,
        )?))
    }
}

fn decode_seed(hex_seed: &str) -> Result<[u8; 32], NodeError> {
    hex::decode(hex_seed)
        .ok()
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .ok_or_else(|| NodeError::Backend("corrupt key seed in credential record".into()))
}

/// Typed access to credential and reset-token records.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn Node>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn Node>) -> Self {
        Self { store }
    }

    fn credential_uri(app_key: &str, username: &str) -> Uri {
        Uri::parse(&format!("{}/{}/{}", CREDENTIALS_PROGRAM, app_key, username))
            .expect("credential uris are well-formed")
    }

    fn reset_uri(app_key: &str, username: &str) -> Uri {
        Uri::parse(&format!("{}/{}/{}", RESETS_PROGRAM, app_key, username))
            .expect("reset uris are well-formed")
    }

    /// Load the credential for a user; `auth` when absent.
    pub async fn load(&self, app_key: &str, username: &str) -> Result<CredentialRecord, NodeError> {
        let uri = Self::credential_uri(app_key, username);
        let record = match self.store.read(&uri).await {
            Ok(record) => record,
            Err(NodeError::NotFound(_)) => {
                return Err(NodeError::Auth(format!(
                    "unknown account {}/{}",
                    app_key, username
                )))
            }
            Err(err) => return Err(err),
        };
        serde_json::from_value(record.data.to_json())
            .map_err(|e| NodeError::Backend(format!("corrupt credential record: {}", e)))
    }

    /// Whether a credential exists for a user.
    pub async fn exists(&self, app_key: &str, username: &str) -> Result<bool, NodeError> {
        match self.store.read(&Self::credential_uri(app_key, username)).await {
            Ok(_) => Ok(true),
            Err(NodeError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Persist a credential.
    pub async fn save(
        &self,
        app_key: &str,
        username: &str,
        record: &CredentialRecord,
    ) -> Result<(), NodeError> {
        let value = Value::from_json(serde_json::to_value(record).expect("credentials serialize"));
        self.store
            .receive(WriteRequest::new(
                Self::credential_uri(app_key, username),
                value,
            ))
            .await?
            .into_result()?;
        Ok(())
    }

    /// Remove a credential.
    pub async fn delete(&self, app_key: &str, username: &str) -> Result<(), NodeError> {
        self.store
            .delete(&Self::credential_uri(app_key, username))
            .await
    }

    /// Persist a password-reset token with its expiry.
    pub async fn save_reset_token(
        &self,
        app_key: &str,
        username: &str,
        token: &str,
        expires_at: u64,
    ) -> Result<(), NodeError> {
        let value = Value::from_json(serde_json::json!({
            "token": token,
            "expiresAt": expires_at,
        }));
        self.store
            .receive(WriteRequest::new(Self::reset_uri(app_key, username), value))
            .await?
            .into_result()?;
        Ok(())
    }

    /// Load a pending reset token as `(token, expires_at)`.
    pub async fn load_reset_token(
        &self,
        app_key: &str,
        username: &str,
    ) -> Result<Option<(String, u64)>, NodeError> {
        match self.store.read(&Self::reset_uri(app_key, username)).await {
            Ok(record) => {
                let token = record
                    .data
                    .get("token")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let expires_at = record
                    .data
                    .get("expiresAt")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                Ok(token.map(|token| (token, expires_at)))
            }
            Err(NodeError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Remove a consumed or expired reset token.
    pub async fn clear_reset_token(&self, app_key: &str, username: &str) -> Result<(), NodeError> {
        match self.store.delete(&Self::reset_uri(app_key, username)).await {
            Ok(()) | Err(NodeError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_memory::MemoryStore;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        let record = CredentialRecord::generate(Some("phc".into()), None);
        store.save("app", "alice", &record).await.unwrap();

        let loaded = store.load("app", "alice").await.unwrap();
        assert_eq!(loaded.signing_seed, record.signing_seed);
        assert_eq!(
            loaded.signing_keys().unwrap().public_key(),
            record.signing_keys().unwrap().public_key()
        );
    }

    #[tokio::test]
    async fn test_missing_account_is_auth_error() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        let err = store.load("app", "nobody").await.unwrap_err();
        assert!(matches!(err, NodeError::Auth(_)));
    }

    #[tokio::test]
    async fn test_reset_token_lifecycle() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load_reset_token("app", "alice").await.unwrap().is_none());

        store
            .save_reset_token("app", "alice", "tok", 12345)
            .await
            .unwrap();
        assert_eq!(
            store.load_reset_token("app", "alice").await.unwrap(),
            Some(("tok".to_string(), 12345))
        );

        store.clear_reset_token("app", "alice").await.unwrap();
        assert!(store.load_reset_token("app", "alice").await.unwrap().is_none());
        // Clearing twice is fine.
        store.clear_reset_token("app", "alice").await.unwrap();
    }
}
