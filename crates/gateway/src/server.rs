//! Gateway server assembly: router construction, CORS, body limits,
//! request tracing, and serving with graceful shutdown.

use crate::config::{ConfigError, CorsConfig, GatewayConfig};
use crate::http::{self, AppState};
use crate::ws;
use axum::routing::{delete, get, post};
use axum::Router;
use shared_types::Node;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server lifecycle errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create CORS layer from gateway config.
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<_> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The HTTP + WebSocket server over one node.
pub struct GatewayServer {
    node: Arc<dyn Node>,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Validate the configuration and build the server.
    pub fn new(node: Arc<dyn Node>, config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self { node, config })
    }

    /// The configured bind address.
    pub fn addr(&self) -> SocketAddr {
        self.config.addr()
    }

    /// Build the full router, ready to serve.
    pub fn router(&self) -> Router {
        let state = AppState {
            node: Arc::clone(&self.node),
        };

        let api = Router::new()
            .route("/health", get(http::health))
            .route("/schema", get(http::schema))
            .route("/write/:scheme/:authority", post(http::write_root))
            .route("/write/:scheme/:authority/*path", post(http::write_path))
            .route("/read/:scheme/:authority", get(http::read_root))
            .route("/read/:scheme/:authority/*path", get(http::read_path))
            .route("/list/:scheme/:authority", get(http::list_root))
            .route("/list/:scheme/:authority/*path", get(http::list_path))
            .route("/delete/:scheme/:authority", delete(http::delete_root))
            .route("/delete/:scheme/:authority/*path", delete(http::delete_path))
            .route("/read-multi", post(http::read_multi))
            .route("/ws", get(ws::ws_upgrade));

        Router::new()
            .nest(&self.config.prefix, api)
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&self.config.cors))
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .with_state(state)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn serve<F>(&self, shutdown: F) -> Result<(), GatewayError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.addr()).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an existing listener until `shutdown` resolves.
    pub async fn serve_on<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(addr = %addr, prefix = %self.config.prefix, "starting gateway");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("gateway stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_memory::MemoryStore;

    fn server() -> GatewayServer {
        GatewayServer::new(
            Arc::new(MemoryStore::new()),
            GatewayConfig {
                port: 0,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _router = server().router();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = GatewayServer::new(
            Arc::new(MemoryStore::new()),
            GatewayConfig {
                prefix: "bad".into(),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_cors_layer_explicit_origins() {
        let _layer = create_cors_layer(&CorsConfig {
            allowed_origins: vec!["http://localhost:3000".into()],
        });
        let _layer = create_cors_layer(&CorsConfig::default());
    }
}
