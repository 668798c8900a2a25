//! Wallet configuration.

use rand::RngCore;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default session token lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Default password-reset token lifetime.
pub const DEFAULT_RESET_TTL: Duration = Duration::from_secs(15 * 60);

/// Wallet configuration.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Bind address of the wallet HTTP surface.
    pub host: IpAddr,
    /// Listen port. 0 binds an ephemeral port.
    pub port: u16,
    /// Route prefix.
    pub prefix: String,
    /// HS256 secret for session tokens.
    pub jwt_secret: Vec<u8>,
    /// Session token lifetime.
    pub session_ttl: Duration,
    /// Password-reset token lifetime.
    pub reset_ttl: Duration,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8090,
            prefix: "/api/v1".to_string(),
            jwt_secret: random_secret(),
            session_ttl: DEFAULT_SESSION_TTL,
            reset_ttl: DEFAULT_RESET_TTL,
        }
    }
}

impl WalletConfig {
    /// Server bind address.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// A fresh random JWT secret; tokens do not survive a restart unless the
/// deployment pins one.
fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}
