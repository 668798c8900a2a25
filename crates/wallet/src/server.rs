//! Wallet server assembly.

use crate::http::{self, WalletState};
use crate::wallet::Wallet;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server lifecycle errors.
#[derive(Debug, Error)]
pub enum WalletServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The wallet HTTP surface.
pub struct WalletServer {
    wallet: Arc<Wallet>,
}

impl WalletServer {
    pub fn new(wallet: Arc<Wallet>) -> Self {
        Self { wallet }
    }

    /// Build the full router, ready to serve.
    pub fn router(&self) -> Router {
        let state = WalletState {
            wallet: Arc::clone(&self.wallet),
        };
        let prefix = self.wallet.config().prefix.clone();

        let api = Router::new()
            .route("/health", get(http::health))
            .route("/server-keys", get(http::server_keys))
            .route("/auth/signup/:app_key", post(http::signup))
            .route("/auth/login/:app_key", post(http::login))
            .route(
                "/auth/credentials/change-password/:app_key",
                post(http::change_password),
            )
            .route(
                "/auth/credentials/request-password-reset/:app_key",
                post(http::request_password_reset),
            )
            .route(
                "/auth/credentials/reset-password/:app_key",
                post(http::reset_password),
            )
            .route("/auth/public-keys/:app_key", get(http::public_keys))
            .route("/proxy/write", post(http::proxy_write))
            .route("/proxy/read", get(http::proxy_read))
            .route("/proxy/read-multi", post(http::proxy_read_multi));

        Router::new()
            .nest(&prefix, api)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn serve<F>(&self, shutdown: F) -> Result<(), WalletServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.wallet.config().addr()).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an existing listener until `shutdown` resolves.
    pub async fn serve_on<F>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), WalletServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(addr = %addr, "starting wallet");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("wallet stopped");
        Ok(())
    }
}
