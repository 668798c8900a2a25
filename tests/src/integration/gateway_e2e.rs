//! End-to-end gateway tests over real sockets: HTTP and WebSocket
//! round-trips, error mapping, binary passthrough, and the universal
//! laws run through both remote clients.

use crate::laws;
use composition::Validated;
use futures_util::{SinkExt, StreamExt};
use gateway::{GatewayConfig, GatewayServer};
use remote_http::{HttpClientConfig, RemoteHttpStore};
use remote_ws::{RemoteWsStore, WsClientConfig};
use schema_registry::SchemaRegistry;
use shared_types::Node;
use std::sync::Arc;
use storage_memory::MemoryStore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve a node on an ephemeral port; returns the base url and a
/// shutdown sender.
async fn start_gateway(node: Arc<dyn Node>) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::new(
        node,
        GatewayConfig {
            port: 0,
            ..Default::default()
        },
    )
    .unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        server
            .serve_on(listener, async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });
    (format!("http://{}", addr), shutdown_tx)
}

#[tokio::test]
async fn http_write_read_list_delete() {
    let (base, _shutdown) = start_gateway(Arc::new(MemoryStore::new())).await;
    let client = reqwest::Client::new();

    let write = client
        .post(format!("{}/api/v1/write/users/alice/profile", base))
        .json(&serde_json::json!({"value": {"name": "Alice"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(write.status(), 200);
    let body: serde_json::Value = write.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["resolvedUri"], "users://alice/profile");

    let read = client
        .get(format!("{}/api/v1/read/users/alice/profile", base))
        .send()
        .await
        .unwrap();
    assert_eq!(read.status(), 200);
    let record: serde_json::Value = read.json().await.unwrap();
    assert_eq!(record["data"]["name"], "Alice");
    assert!(record["ts"].is_u64());

    let list = client
        .get(format!("{}/api/v1/list/users/alice", base))
        .query(&[("limit", "10")])
        .send()
        .await
        .unwrap();
    let page: serde_json::Value = list.json().await.unwrap();
    assert_eq!(page["items"][0]["uri"], "users://alice/profile");
    assert_eq!(page["items"][0]["kind"], "leaf");
    assert_eq!(page["page"]["total"], 1);

    let delete = client
        .delete(format!("{}/api/v1/delete/users/alice/profile", base))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), 200);

    let read = client
        .get(format!("{}/api/v1/read/users/alice/profile", base))
        .send()
        .await
        .unwrap();
    assert_eq!(read.status(), 404);
    let body: serde_json::Value = read.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().starts_with("not-found"));
}

#[tokio::test]
async fn http_error_mapping_and_schema() {
    let node = Validated::new(SchemaRegistry::open(), Arc::new(MemoryStore::new()));
    let (base, _shutdown) = start_gateway(Arc::new(node)).await;
    let client = reqwest::Client::new();

    // Unregistered program: 400 with the no-schema kind.
    let write = client
        .post(format!("{}/api/v1/write/custom/app/x", base))
        .json(&serde_json::json!({"value": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(write.status(), 400);
    let body: serde_json::Value = write.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("no-schema"));

    // The schema endpoint lists the registered programs.
    let schema = client
        .get(format!("{}/api/v1/schema", base))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = schema.json().await.unwrap();
    let programs: Vec<&str> = body["programs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(programs.contains(&"mutable://open"));
    assert!(programs.contains(&"hash://sha256"));

    let health = client
        .get(format!("{}/api/v1/health", base))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn http_binary_passthrough() {
    let (base, _shutdown) = start_gateway(Arc::new(MemoryStore::new())).await;
    let client = reqwest::Client::new();
    let payload = vec![0u8, 1, 2, 3, 255];

    let write = client
        .post(format!("{}/api/v1/write/files/open/blob", base))
        .header("content-type", "application/octet-stream")
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(write.status(), 200);

    let read = client
        .get(format!("{}/api/v1/read/files/open/blob", base))
        .send()
        .await
        .unwrap();
    assert_eq!(
        read.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
    assert!(read.headers().contains_key("x-record-ts"));
    assert_eq!(read.bytes().await.unwrap().to_vec(), payload);
}

#[tokio::test]
async fn http_read_multi() {
    let (base, _shutdown) = start_gateway(Arc::new(MemoryStore::new())).await;
    let client = reqwest::Client::new();

    for name in ["a", "b"] {
        client
            .post(format!("{}/api/v1/write/users/alice/{}", base, name))
            .json(&serde_json::json!({"value": name}))
            .send()
            .await
            .unwrap();
    }

    let response = client
        .post(format!("{}/api/v1/read-multi", base))
        .json(&serde_json::json!({
            "uris": ["users://alice/a", "users://alice/b", "users://alice/c"]
        }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["summary"]["total"], 3);
    assert_eq!(body["summary"]["succeeded"], 2);
    assert_eq!(body["summary"]["failed"], 1);
    assert_eq!(body["results"][0]["ok"], true);
    assert_eq!(body["results"][2]["ok"], false);
}

#[tokio::test]
async fn remote_http_store_obeys_laws() {
    let (base, _shutdown) = start_gateway(Arc::new(MemoryStore::new())).await;
    let store = RemoteHttpStore::new(HttpClientConfig::new(base)).unwrap();
    laws::assert_backend_laws(&store).await;
}

#[tokio::test]
async fn remote_ws_store_obeys_laws() {
    let (base, _shutdown) = start_gateway(Arc::new(MemoryStore::new())).await;
    let ws_url = format!("{}/api/v1/ws", base.replace("http://", "ws://"));
    let store = RemoteWsStore::connect(WsClientConfig::new(ws_url)).await.unwrap();
    laws::assert_backend_laws(&store).await;
    store.close().await.unwrap();
}

#[tokio::test]
async fn ws_echoes_client_ids() {
    let (base, _shutdown) = start_gateway(Arc::new(MemoryStore::new())).await;
    let ws_url = format!("{}/api/v1/ws", base.replace("http://", "ws://"));
    let (mut socket, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();

    socket
        .send(tokio_tungstenite::tungstenite::Message::Text(
            r#"{"id": "req-42", "op": "health"}"#.into(),
        ))
        .await
        .unwrap();
    let reply = socket.next().await.unwrap().unwrap();
    let body: serde_json::Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
    assert_eq!(body["id"], "req-42");
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn ws_client_times_out_without_server() {
    // Bind a TCP listener that never speaks WebSocket; the connect fails
    // with a disconnected kind rather than hanging.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = RemoteWsStore::connect(WsClientConfig::new(format!("ws://{}/ws", addr))).await;
    assert!(matches!(
        result,
        Err(shared_types::NodeError::Disconnected(_))
    ));
}
