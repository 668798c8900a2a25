//! # Built-in Validators
//!
//! The validator kinds the protocol ships with:
//!
//! | validator | semantics |
//! |---|---|
//! | [`OpenMutable`] | accept any value |
//! | [`OpenImmutable`] | accept only while the URI is empty |
//! | [`PubkeyScoped`] | signed value whose principal matches the URI |
//! | [`ContentHash`] | value must hash to the URI's content address |
//! | [`Link`] | value must be a syntactically valid URI string |
//!
//! Pubkey-scoped programs designate the principal either as the URI
//! authority or as a path segment; the signed bytes are the URI followed
//! by the canonical serialization of the payload (the value's `payload`
//! field when the write is auth-wrapped, otherwise the value minus its
//! `auth` field).

use crate::validator::{ReadHandle, Validator};
use async_trait::async_trait;
use shared_crypto::{SigningPublicKey, SigningSignature};
use shared_types::{canonical, NodeError, Uri, Value};

/// Accepts any value. The open mutable program.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenMutable;

#[async_trait]
impl Validator for OpenMutable {
    async fn validate(
        &self,
        _uri: &Uri,
        _value: &Value,
        _read: ReadHandle<'_>,
    ) -> Result<(), NodeError> {
        Ok(())
    }
}

/// Accepts a value only while nothing is stored at the URI yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenImmutable;

#[async_trait]
impl Validator for OpenImmutable {
    async fn validate(
        &self,
        uri: &Uri,
        _value: &Value,
        read: ReadHandle<'_>,
    ) -> Result<(), NodeError> {
        if read.exists(uri).await? {
            return Err(NodeError::ImmutableExists(format!(
                "{} already holds a record",
                uri
            )));
        }
        Ok(())
    }
}

/// Where a pubkey-scoped program finds its principal in the URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalAt {
    /// The URI authority is the principal's public key hex.
    Authority,
    /// The zero-based path segment holding the principal's public key hex.
    PathSegment(usize),
}

/// Signed writes scoped to the principal named in the URI.
///
/// The value must carry one or more `{pubkey, signature}` auth entries;
/// the designated principal must be among them and every entry's
/// signature must verify over the canonical payload bytes. With
/// `immutable`, an existing record additionally rejects the write.
#[derive(Debug, Clone, Copy)]
pub struct PubkeyScoped {
    principal_at: PrincipalAt,
    immutable: bool,
}

impl PubkeyScoped {
    pub fn mutable(principal_at: PrincipalAt) -> Self {
        Self {
            principal_at,
            immutable: false,
        }
    }

    pub fn immutable(principal_at: PrincipalAt) -> Self {
        Self {
            principal_at,
            immutable: true,
        }
    }

    fn principal_hex<'a>(&self, uri: &'a Uri) -> Result<&'a str, NodeError> {
        match self.principal_at {
            PrincipalAt::Authority => Ok(uri.authority()),
            PrincipalAt::PathSegment(index) => uri
                .path()
                .and_then(|path| path.split('/').nth(index))
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| {
                    NodeError::Validation(format!(
                        "{} has no path segment {} to name the principal",
                        uri, index
                    ))
                }),
        }
    }
}

/// The bytes a pubkey-scoped signature covers: the URI plus the canonical
/// serialization of the payload's non-auth fields.
fn signed_payload(value: &Value) -> Value {
    if let Some(payload) = value.get("payload") {
        return payload.clone();
    }
    match value.as_object() {
        Some(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != "auth")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        None => value.clone(),
    }
}

#[async_trait]
impl Validator for PubkeyScoped {
    async fn validate(
        &self,
        uri: &Uri,
        value: &Value,
        read: ReadHandle<'_>,
    ) -> Result<(), NodeError> {
        let principal = self.principal_hex(uri)?;
        let entries = value
            .get("auth")
            .and_then(Value::as_array)
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| {
                NodeError::Validation(format!("{} requires at least one auth entry", uri))
            })?;

        let payload = signed_payload(value);
        let message = canonical::signing_bytes(uri, &payload);

        let mut principal_signed = false;
        for entry in entries {
            let pubkey_hex = entry
                .get("pubkey")
                .and_then(Value::as_str)
                .ok_or_else(|| NodeError::Validation("auth entry missing pubkey".into()))?;
            let signature_hex = entry
                .get("signature")
                .and_then(Value::as_str)
                .ok_or_else(|| NodeError::Validation("auth entry missing signature".into()))?;

            let pubkey = SigningPublicKey::from_hex(pubkey_hex)
                .map_err(|e| NodeError::Validation(format!("bad pubkey: {}", e)))?;
            let signature = SigningSignature::from_hex(signature_hex)
                .map_err(|e| NodeError::Validation(format!("bad signature: {}", e)))?;
            pubkey
                .verify(&message, &signature)
                .map_err(|_| NodeError::Validation(format!("signature by {} does not verify", pubkey_hex)))?;

            if pubkey_hex == principal {
                principal_signed = true;
            }
        }

        if !principal_signed {
            return Err(NodeError::Validation(format!(
                "no auth entry matches the principal {}",
                principal
            )));
        }

        if self.immutable && read.exists(uri).await? {
            return Err(NodeError::ImmutableExists(format!(
                "{} already holds a record",
                uri
            )));
        }
        Ok(())
    }
}

/// Content-addressed writes: the value must hash to the URI's address.
///
/// Accepting a repeat of the same value is safe (the hash pins the bytes),
/// so content-hash programs are always mutable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHash;

#[async_trait]
impl Validator for ContentHash {
    async fn validate(
        &self,
        uri: &Uri,
        value: &Value,
        _read: ReadHandle<'_>,
    ) -> Result<(), NodeError> {
        let declared = uri.hash_suffix().ok_or_else(|| {
            NodeError::HashMismatch(format!("{} carries no content hash", uri))
        })?;
        let actual = canonical::content_hash_hex(value);
        if declared != actual {
            return Err(NodeError::HashMismatch(format!(
                "{} does not match the value hash {}",
                uri, actual
            )));
        }
        Ok(())
    }
}

/// URI-valued references: the value must be a parseable URI string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Link;

#[async_trait]
impl Validator for Link {
    async fn validate(
        &self,
        uri: &Uri,
        value: &Value,
        _read: ReadHandle<'_>,
    ) -> Result<(), NodeError> {
        let target = value.as_str().ok_or_else(|| {
            NodeError::Validation(format!("{} expects a URI string value", uri))
        })?;
        Uri::parse(target)
            .map_err(|e| NodeError::Validation(format!("{} is not a link target: {}", target, e)))?;
        Ok(())
    }
}
