//! # Third-Party Identity
//!
//! Token verification is an external collaborator; the wallet only needs
//! the opaque capability `verify(id_token) → profile`. Deployments inject
//! their provider's verifier; tests use [`StaticIdentityVerifier`].

use async_trait::async_trait;
use shared_types::NodeError;
use std::collections::HashMap;

/// The externally-verified identity bound to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub email: String,
}

/// Opaque id-token verification capability.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify an id token, yielding the profile it attests.
    async fn verify(&self, id_token: &str) -> Result<IdentityProfile, NodeError>;
}

/// Fixed token → profile mapping for tests and local development.
#[derive(Debug, Default)]
pub struct StaticIdentityVerifier {
    profiles: HashMap<String, IdentityProfile>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as attesting `email`.
    pub fn with_token(mut self, token: impl Into<String>, email: impl Into<String>) -> Self {
        self.profiles.insert(
            token.into(),
            IdentityProfile {
                email: email.into(),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, id_token: &str) -> Result<IdentityProfile, NodeError> {
        self.profiles
            .get(id_token)
            .cloned()
            .ok_or_else(|| NodeError::Auth("id token rejected".into()))
    }
}
