//! # Wallet Core
//!
//! Credential lifecycle, session-authorized signup/login, and the
//! signing/encrypting proxy. All storage goes through the injected node;
//! the wallet never sees the `:key` placeholder reach storage and never
//! lets an error kind escape the closed set.

use crate::config::WalletConfig;
use crate::credentials::{CredentialRecord, CredentialStore};
use crate::identity::IdentityVerifier;
use crate::session::{self, Claims};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use shared_crypto::{EncryptionKeyPair, SealedPayload, SigningKeyPair};
use shared_types::{
    canonical, Node, NodeError, Record, Uri, Value, WriteRequest, READ_MULTI_MAX,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// The `:key` placeholder resolved at the wallet boundary.
pub const KEY_PLACEHOLDER: &str = ":key";

/// A signup or login request body.
///
/// The raw body also travels as a [`Value`] so the session signature can
/// be verified over exactly what the client signed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// `password` or `identity`.
    #[serde(rename = "type")]
    pub kind: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    pub session_pub: String,
    #[serde(default)]
    pub session_signature: Option<String>,
}

/// Successful signup/login response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub principal_pub: String,
    pub encryption_pub: String,
    pub expires_at: u64,
}

/// Proxy write request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyWriteRequest {
    pub uri: String,
    pub data: Value,
    #[serde(default)]
    pub encrypt: bool,
}

/// Proxy write response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyWriteResponse {
    pub success: bool,
    pub uri: String,
    pub resolved_uri: String,
    pub record: Record,
}

/// Proxy read response (also the per-URI shape of the batched read).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyReadResponse {
    pub success: bool,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decrypted: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batched proxy read response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyReadMultiResponse {
    pub success: bool,
    pub results: Vec<ProxyReadResponse>,
    pub summary: ReadSummary,
}

/// Aggregate counts of a batched proxy read.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Server key material advertised at `/server-keys`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerKeys {
    pub signing_pub: String,
    pub encryption_pub: String,
}

/// Keys returned by the bearer `/auth/public-keys` endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeys {
    pub principal_pub: String,
    pub encryption_pub: String,
}

/// Password-reset issuance response.
///
/// Token delivery is an external collaborator; the embedded wallet
/// returns the token in-band.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTokenResponse {
    pub success: bool,
    pub reset_token: String,
    pub expires_at: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The wallet.
pub struct Wallet {
    store: Arc<dyn Node>,
    credentials: CredentialStore,
    config: WalletConfig,
    verifier: Option<Arc<dyn IdentityVerifier>>,
    server_signing: SigningKeyPair,
    server_encryption: EncryptionKeyPair,
}

impl Wallet {
    pub fn new(store: Arc<dyn Node>, config: WalletConfig) -> Self {
        Self {
            credentials: CredentialStore::new(Arc::clone(&store)),
            store,
            config,
            verifier: None,
            server_signing: SigningKeyPair::generate(),
            server_encryption: EncryptionKeyPair::generate(),
        }
    }

    /// Attach a third-party identity verifier.
    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// The wallet's own advertised keys.
    pub fn server_keys(&self) -> ServerKeys {
        ServerKeys {
            signing_pub: self.server_signing.public_key().to_hex(),
            encryption_pub: self.server_encryption.public_key().to_hex(),
        }
    }

    /// Verify a bearer token into claims.
    pub fn verify_bearer(&self, token: &str) -> Result<Claims, NodeError> {
        session::verify_token(&self.config.jwt_secret, token)
    }

    /// Check that the request is signed by a currently-approved session.
    async fn check_session(&self, app_key: &str, body: &Value) -> Result<(), NodeError> {
        let session_pub = body
            .get("sessionPub")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Auth("missing sessionPub".into()))?;
        let signature = body
            .get("sessionSignature")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::Auth("missing sessionSignature".into()))?;

        let approval_uri = Uri::parse(&format!(
            "mutable://accounts/{}/sessions/{}",
            app_key, session_pub
        ))
        .map_err(|e| NodeError::Auth(format!("bad session key: {}", e)))?;

        let approved = match self.store.read(&approval_uri).await {
            Ok(record) => matches!(
                &record.data,
                Value::Number(n) if n.as_u64() == Some(1)
            ) || matches!(record.data, Value::Bool(true)),
            Err(NodeError::NotFound(_)) => false,
            Err(err) => return Err(err),
        };
        if !approved {
            return Err(NodeError::Auth(format!(
                "session {} is not approved for {}",
                session_pub, app_key
            )));
        }

        session::verify_session_signature(app_key, body, session_pub, signature)
    }

    async fn verify_identity(&self, id_token: &str) -> Result<String, NodeError> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| NodeError::Auth("identity login is not configured".into()))?;
        Ok(verifier.verify(id_token).await?.email)
    }

    fn issue(&self, app_key: &str, username: &str, record: &CredentialRecord)
        -> Result<AuthResponse, NodeError> {
        let principal = record.signing_keys()?.public_key().to_hex();
        let encryption = record.encryption_keys()?.public_key().to_hex();
        let (token, claims) = session::issue_token(
            &self.config.jwt_secret,
            self.config.session_ttl,
            app_key,
            username,
            &principal,
        )?;
        Ok(AuthResponse {
            success: true,
            token,
            principal_pub: principal,
            encryption_pub: encryption,
            expires_at: claims.exp,
        })
    }

    /// Create an account. The request must be signed by an approved
    /// session; the username must be free.
    pub async fn signup(&self, app_key: &str, body: Value) -> Result<AuthResponse, NodeError> {
        self.check_session(app_key, &body).await?;
        let request: AuthRequest = parse_auth_request(&body)?;

        if self.credentials.exists(app_key, &request.username).await? {
            return Err(NodeError::Auth(format!(
                "username {} is already registered",
                request.username
            )));
        }

        let record = match request.kind.as_str() {
            "password" => {
                let password = request
                    .password
                    .as_deref()
                    .ok_or_else(|| NodeError::Auth("password signup without password".into()))?;
                let phc = shared_crypto::hash_password(password)
                    .map_err(|e| NodeError::Backend(e.to_string()))?;
                CredentialRecord::generate(Some(phc), None)
            }
            "identity" => {
                let id_token = request
                    .id_token
                    .as_deref()
                    .ok_or_else(|| NodeError::Auth("identity signup without idToken".into()))?;
                let email = self.verify_identity(id_token).await?;
                CredentialRecord::generate(None, Some(email))
            }
            other => {
                return Err(NodeError::Auth(format!("unknown signup type {:?}", other)));
            }
        };

        self.credentials
            .save(app_key, &request.username, &record)
            .await?;
        tracing::info!(app_key, username = %request.username, "account created");
        self.issue(app_key, &request.username, &record)
    }

    /// Authenticate and issue a session token.
    pub async fn login(&self, app_key: &str, body: Value) -> Result<AuthResponse, NodeError> {
        self.check_session(app_key, &body).await?;
        let request: AuthRequest = parse_auth_request(&body)?;
        let record = self.credentials.load(app_key, &request.username).await?;

        match request.kind.as_str() {
            "password" => {
                let password = request
                    .password
                    .as_deref()
                    .ok_or_else(|| NodeError::Auth("password login without password".into()))?;
                let phc = record
                    .password_phc
                    .as_deref()
                    .ok_or_else(|| NodeError::Auth("account has no password".into()))?;
                let valid = shared_crypto::verify_password(password, phc)
                    .map_err(|e| NodeError::Backend(e.to_string()))?;
                if !valid {
                    return Err(NodeError::Auth("wrong password".into()));
                }
            }
            "identity" => {
                let id_token = request
                    .id_token
                    .as_deref()
                    .ok_or_else(|| NodeError::Auth("identity login without idToken".into()))?;
                let email = self.verify_identity(id_token).await?;
                if record.identity_email.as_deref() != Some(email.as_str()) {
                    return Err(NodeError::Auth("identity does not match account".into()));
                }
            }
            other => {
                return Err(NodeError::Auth(format!("unknown login type {:?}", other)));
            }
        }

        self.issue(app_key, &request.username, &record)
    }

    /// Change the password, gated on the current one.
    pub async fn change_password(
        &self,
        app_key: &str,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), NodeError> {
        let mut record = self.credentials.load(app_key, username).await?;
        let phc = record
            .password_phc
            .as_deref()
            .ok_or_else(|| NodeError::Auth("account has no password".into()))?;
        let valid = shared_crypto::verify_password(old_password, phc)
            .map_err(|e| NodeError::Backend(e.to_string()))?;
        if !valid {
            return Err(NodeError::Auth("wrong password".into()));
        }
        record.password_phc = Some(
            shared_crypto::hash_password(new_password)
                .map_err(|e| NodeError::Backend(e.to_string()))?,
        );
        self.credentials.save(app_key, username, &record).await
    }

    /// Issue a password-reset token.
    pub async fn request_password_reset(
        &self,
        app_key: &str,
        username: &str,
    ) -> Result<ResetTokenResponse, NodeError> {
        // Ensure the account exists (auth error otherwise).
        self.credentials.load(app_key, username).await?;

        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let expires_at = now_secs() + self.config.reset_ttl.as_secs();
        self.credentials
            .save_reset_token(app_key, username, &token, expires_at)
            .await?;
        Ok(ResetTokenResponse {
            success: true,
            reset_token: token,
            expires_at,
        })
    }

    /// Consume a reset token and set the new password.
    pub async fn reset_password(
        &self,
        app_key: &str,
        username: &str,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), NodeError> {
        let Some((stored, expires_at)) =
            self.credentials.load_reset_token(app_key, username).await?
        else {
            return Err(NodeError::Auth("no reset pending".into()));
        };
        if stored != reset_token {
            return Err(NodeError::Auth("reset token mismatch".into()));
        }
        if expires_at < now_secs() {
            self.credentials.clear_reset_token(app_key, username).await?;
            return Err(NodeError::Auth("reset token expired".into()));
        }

        let mut record = self.credentials.load(app_key, username).await?;
        record.password_phc = Some(
            shared_crypto::hash_password(new_password)
                .map_err(|e| NodeError::Backend(e.to_string()))?,
        );
        self.credentials.save(app_key, username, &record).await?;
        self.credentials.clear_reset_token(app_key, username).await
    }

    /// The authenticated principal's public keys.
    pub async fn public_keys(&self, claims: &Claims) -> Result<PublicKeys, NodeError> {
        let record = self
            .credentials
            .load(&claims.app_key, &claims.username)
            .await?;
        Ok(PublicKeys {
            principal_pub: record.signing_keys()?.public_key().to_hex(),
            encryption_pub: record.encryption_keys()?.public_key().to_hex(),
        })
    }

    /// Substitute `:key` with the principal's public key hex. One pass:
    /// every occurrence is replaced, nothing is re-scanned.
    pub fn resolve_key(uri: &str, principal_pub: &str) -> String {
        uri.replace(KEY_PLACEHOLDER, principal_pub)
    }

    /// Sign (and optionally encrypt) a value, then store it.
    pub async fn proxy_write(
        &self,
        claims: &Claims,
        request: ProxyWriteRequest,
    ) -> Result<ProxyWriteResponse, NodeError> {
        let record = self
            .credentials
            .load(&claims.app_key, &claims.username)
            .await?;
        let signing = record.signing_keys()?;
        let encryption = record.encryption_keys()?;
        let principal = signing.public_key().to_hex();

        let resolved = Self::resolve_key(&request.uri, &principal);
        let resolved_uri =
            Uri::parse(&resolved).map_err(|e| NodeError::Validation(e.to_string()))?;

        // The payload that is signed is the payload that is stored: the
        // ciphertext when encrypting, the raw value otherwise.
        let payload = if request.encrypt {
            let sealed = encryption
                .seal(
                    &encryption.public_key(),
                    &canonical::canonical_bytes(&request.data),
                )
                .map_err(|e| NodeError::Backend(e.to_string()))?;
            sealed_to_value(&sealed)
        } else {
            request.data.clone()
        };

        let signature = signing.sign_record(&resolved_uri, &payload);
        let value = Value::from_json(serde_json::json!({
            "auth": [{ "pubkey": principal, "signature": signature.to_hex() }],
            "payload": payload,
        }));

        self.store
            .receive(WriteRequest::new(resolved_uri.clone(), value))
            .await?
            .into_result()?;
        let stored = self.store.read(&resolved_uri).await?;

        Ok(ProxyWriteResponse {
            success: true,
            uri: request.uri,
            resolved_uri: resolved,
            record: stored,
        })
    }

    /// Read one URI, decrypting a self-addressed payload when present.
    pub async fn proxy_read(
        &self,
        claims: &Claims,
        uri: &str,
    ) -> Result<ProxyReadResponse, NodeError> {
        let record = self
            .credentials
            .load(&claims.app_key, &claims.username)
            .await?;
        let encryption = record.encryption_keys()?;
        let principal = record.signing_keys()?.public_key().to_hex();

        let resolved = Self::resolve_key(uri, &principal);
        let resolved_uri =
            Uri::parse(&resolved).map_err(|e| NodeError::Validation(e.to_string()))?;
        let stored = self.store.read(&resolved_uri).await?;

        let decrypted = match extract_sealed(&stored.data) {
            Some(sealed) => Some(open_sealed(&encryption, &sealed)?),
            None => None,
        };

        Ok(ProxyReadResponse {
            success: true,
            uri: uri.to_string(),
            resolved_uri: Some(resolved),
            record: Some(stored),
            decrypted,
            error: None,
        })
    }

    /// Read up to 50 URIs, each decrypted independently.
    pub async fn proxy_read_multi(
        &self,
        claims: &Claims,
        uris: &[String],
    ) -> Result<ProxyReadMultiResponse, NodeError> {
        if uris.len() > READ_MULTI_MAX {
            return Err(NodeError::BatchTooLarge(format!(
                "{} uris exceeds the limit of {}",
                uris.len(),
                READ_MULTI_MAX
            )));
        }
        let mut results = Vec::with_capacity(uris.len());
        for uri in uris {
            let outcome = match self.proxy_read(claims, uri).await {
                Ok(response) => response,
                Err(err) => ProxyReadResponse {
                    success: false,
                    uri: uri.clone(),
                    resolved_uri: None,
                    record: None,
                    decrypted: None,
                    error: Some(err.to_string()),
                },
            };
            results.push(outcome);
        }
        let succeeded = results.iter().filter(|r| r.success).count();
        Ok(ProxyReadMultiResponse {
            success: true,
            summary: ReadSummary {
                total: results.len(),
                succeeded,
                failed: results.len() - succeeded,
            },
            results,
        })
    }
}

fn parse_auth_request(body: &Value) -> Result<AuthRequest, NodeError> {
    serde_json::from_value(body.to_json())
        .map_err(|e| NodeError::Auth(format!("bad auth request: {}", e)))
}

/// Render a sealed payload as the stored `{nonce, ciphertext}` object.
fn sealed_to_value(sealed: &SealedPayload) -> Value {
    Value::object([
        ("nonce".to_string(), Value::Bytes(sealed.nonce.to_vec())),
        (
            "ciphertext".to_string(),
            Value::Bytes(sealed.ciphertext.clone()),
        ),
    ])
}

/// Detect the `{auth, payload: {nonce, ciphertext}}` shape.
fn extract_sealed(data: &Value) -> Option<SealedPayload> {
    data.get("auth")?;
    let payload = data.get("payload")?;
    let nonce: [u8; shared_crypto::encryption::NONCE_LEN] =
        payload.get("nonce")?.as_bytes()?.try_into().ok()?;
    let ciphertext = payload.get("ciphertext")?.as_bytes()?.to_vec();
    Some(SealedPayload { nonce, ciphertext })
}

/// Open a self-addressed payload back into the original value.
fn open_sealed(
    encryption: &EncryptionKeyPair,
    sealed: &SealedPayload,
) -> Result<Value, NodeError> {
    let plaintext = encryption
        .open(&encryption.public_key(), sealed)
        .map_err(|e| NodeError::Decrypt(e.to_string()))?;
    let json: serde_json::Value = serde_json::from_slice(&plaintext)
        .map_err(|e| NodeError::Decrypt(format!("plaintext is not a value: {}", e)))?;
    Ok(Value::from_json(json))
}
