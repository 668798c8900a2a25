//! # Sessions
//!
//! Two session notions live here:
//!
//! - **Session keypairs**: the ephemeral Ed25519 pair a client generates
//!   before login. Its public key must be pre-approved at
//!   `mutable://accounts/{app_key}/sessions/{session_pub}` and the
//!   signup/login request body is signed with its private half.
//! - **JWT sessions**: after a successful login the wallet issues an
//!   HS256 token carrying `{app_key, username, principal_pub}` and the
//!   expiry; bearer endpoints verify it.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared_crypto::{SigningKeyPair, SigningPublicKey, SigningSignature};
use shared_types::{canonical, NodeError, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// JWT claims of a wallet session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub app_key: String,
    pub username: String,
    /// Principal public key, hex.
    pub principal_pub: String,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
    /// Issued-at, seconds since the epoch.
    pub iat: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Issue a session token.
pub fn issue_token(
    secret: &[u8],
    ttl: Duration,
    app_key: &str,
    username: &str,
    principal_pub: &str,
) -> Result<(String, Claims), NodeError> {
    let iat = now_secs();
    let claims = Claims {
        app_key: app_key.to_string(),
        username: username.to_string(),
        principal_pub: principal_pub.to_string(),
        exp: iat + ttl.as_secs(),
        iat,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| NodeError::Backend(format!("token encoding failed: {}", e)))?;
    Ok((token, claims))
}

/// Verify a bearer token, returning its claims. Expired or forged tokens
/// fail `auth`.
pub fn verify_token(secret: &[u8], token: &str) -> Result<Claims, NodeError> {
    let mut validation = Validation::default();
    // Session tokens are short-lived; no clock leeway.
    validation.leeway = 0;
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| NodeError::Auth(format!("invalid session token: {}", e)))
}

/// The ephemeral client-side session keypair and its request signature.
///
/// The signed bytes bind the app key and every request field except the
/// signature itself: `app_key` bytes followed by the canonical
/// serialization of the body with `sessionSignature` removed.
pub struct SessionKeys {
    keys: SigningKeyPair,
}

impl SessionKeys {
    pub fn generate() -> Self {
        Self {
            keys: SigningKeyPair::generate(),
        }
    }

    /// Session public key, hex; the value to pre-approve.
    pub fn public_hex(&self) -> String {
        self.keys.public_key().to_hex()
    }

    /// Sign a request body (without its `sessionSignature` field).
    pub fn sign_request(&self, app_key: &str, body: &Value) -> String {
        self.keys
            .sign(&session_message(app_key, body))
            .to_hex()
    }
}

/// The bytes a session signature covers.
pub fn session_message(app_key: &str, body: &Value) -> Vec<u8> {
    let stripped = match body.as_object() {
        Some(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != "sessionSignature")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        None => body.clone(),
    };
    let mut message = app_key.as_bytes().to_vec();
    message.extend_from_slice(&canonical::canonical_bytes(&stripped));
    message
}

/// Verify a request's session signature against the approved session key.
pub fn verify_session_signature(
    app_key: &str,
    body: &Value,
    session_pub_hex: &str,
    signature_hex: &str,
) -> Result<(), NodeError> {
    let session_pub = SigningPublicKey::from_hex(session_pub_hex)
        .map_err(|e| NodeError::Auth(format!("bad session public key: {}", e)))?;
    let signature = SigningSignature::from_hex(signature_hex)
        .map_err(|e| NodeError::Auth(format!("bad session signature: {}", e)))?;
    session_pub
        .verify(&session_message(app_key, body), &signature)
        .map_err(|_| NodeError::Auth("session signature does not verify".into()))
}
