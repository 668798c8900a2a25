//! CLI command implementations.
//!
//! Each command talks to the backend stack named by `BACKEND_URL` and
//! exits with the protocol's code for the failure kind: 0 success,
//! 2 not-found, 3 validation, 4 no-schema, 5 backend.

use crate::config::RuntimeConfig;
use anyhow::Result;
use shared_types::{ErrorKind, ListOptions, Node, NodeError, Uri, Value, WriteRequest};
use std::sync::Arc;

/// Exit code for a protocol error.
pub fn exit_code(err: &NodeError) -> i32 {
    match err.kind() {
        ErrorKind::NotFound => 2,
        ErrorKind::Validation | ErrorKind::HashMismatch | ErrorKind::ImmutableExists => 3,
        ErrorKind::NoSchema => 4,
        _ => 5,
    }
}

fn parse_uri(raw: &str) -> Result<Uri, NodeError> {
    Uri::parse(raw).map_err(|e| NodeError::Validation(e.to_string()))
}

/// A value argument: JSON when it parses, a plain string otherwise.
fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_json(json),
        Err(_) => Value::String(raw.to_string()),
    }
}

pub async fn read(node: Arc<dyn Node>, uri: &str) -> Result<(), NodeError> {
    let record = node.read(&parse_uri(uri)?).await?;
    println!("{}", serde_json::to_string_pretty(&record).expect("records serialize"));
    Ok(())
}

pub async fn list(
    node: Arc<dyn Node>,
    uri: &str,
    opts: ListOptions,
) -> Result<(), NodeError> {
    // Unlistable targets print the empty page, matching the server edge.
    let page = match Uri::parse(uri) {
        Ok(parsed) => node.list(&parsed, opts).await?,
        Err(_) => shared_types::ListPage::empty(&opts),
    };
    println!("{}", serde_json::to_string_pretty(&page).expect("pages serialize"));
    Ok(())
}

pub async fn write(node: Arc<dyn Node>, uri: &str, value: &str) -> Result<(), NodeError> {
    let receipt = node
        .receive(WriteRequest::new(parse_uri(uri)?, parse_value(value)))
        .await?
        .into_result()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&receipt).expect("receipts serialize")
    );
    Ok(())
}

pub async fn delete(node: Arc<dyn Node>, uri: &str) -> Result<(), NodeError> {
    node.delete(&parse_uri(uri)?).await?;
    println!("deleted {}", uri);
    Ok(())
}

/// Run the embedded server until ctrl-c.
pub async fn serve(config: &RuntimeConfig, node: Arc<dyn Node>) -> Result<()> {
    let gateway_config = gateway::GatewayConfig {
        port: config.port,
        cors: gateway::CorsConfig {
            allowed_origins: config.cors_origins.clone(),
        },
        ..Default::default()
    };
    let server = gateway::GatewayServer::new(node, gateway_config)?;
    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&NodeError::NotFound("x".into())), 2);
        assert_eq!(exit_code(&NodeError::Validation("x".into())), 3);
        assert_eq!(exit_code(&NodeError::HashMismatch("x".into())), 3);
        assert_eq!(exit_code(&NodeError::ImmutableExists("x".into())), 3);
        assert_eq!(exit_code(&NodeError::NoSchema("x".into())), 4);
        assert_eq!(exit_code(&NodeError::Backend("x".into())), 5);
        assert_eq!(exit_code(&NodeError::Timeout("x".into())), 5);
    }

    #[test]
    fn test_value_argument_parsing() {
        assert_eq!(
            parse_value(r#"{"a": 1}"#),
            Value::from_json(serde_json::json!({"a": 1}))
        );
        assert_eq!(parse_value("42"), Value::from_json(serde_json::json!(42)));
        assert_eq!(parse_value("plain text"), Value::String("plain text".into()));
    }
}
