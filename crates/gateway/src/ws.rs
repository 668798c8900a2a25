//! WebSocket server surface.
//!
//! One frame shape: `{id, op, payload}` in, `{id, ok, data?, error?}`
//! out. Ops correspond 1:1 to node ops and the client-chosen `id` is
//! echoed on every response. Binary record data travels inside the JSON
//! as the `__bin`/`b64` sentinel.

use crate::http::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::StreamExt;
use serde::Deserialize;
use shared_types::{ListOptions, ListPage, Node, NodeError, Uri, Value, WriteRequest};
use tracing::{debug, warn};

/// GET /ws upgrade handler.
pub async fn ws_upgrade(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, mut socket: WebSocket) {
    debug!("websocket connection opened");
    while let Some(result) = socket.next().await {
        let frame = match result {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(err) => {
                warn!(error = %err, "websocket error");
                break;
            }
        };

        let response = handle_frame(&state, &frame).await;
        if socket.send(Message::Text(response.into())).await.is_err() {
            break;
        }
    }
    debug!("websocket connection closed");
}

#[derive(Debug, Deserialize)]
struct Frame {
    id: serde_json::Value,
    op: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct UriPayload {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct ReceivePayload {
    uri: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ReadMultiPayload {
    uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListPayload {
    uri: String,
    #[serde(flatten)]
    opts: ListOptions,
}

/// Handle one request frame, producing the response frame.
async fn handle_frame(state: &AppState, text: &str) -> String {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            return reply_err(
                serde_json::Value::Null,
                &NodeError::Validation(format!("bad frame: {}", err)),
            );
        }
    };

    let id = frame.id.clone();
    match dispatch(state, &frame).await {
        Ok(data) => reply_ok(id, data),
        Err(err) => reply_err(id, &err),
    }
}

async fn dispatch(state: &AppState, frame: &Frame) -> Result<serde_json::Value, NodeError> {
    match frame.op.as_str() {
        "receive" => {
            let payload: ReceivePayload = parse_payload(&frame.payload)?;
            let uri = parse_uri(&payload.uri)?;
            let receipt = state
                .node
                .receive(WriteRequest::new(uri, payload.value))
                .await?;
            Ok(serde_json::to_value(&receipt).expect("receipts serialize"))
        }
        "read" => {
            let payload: UriPayload = parse_payload(&frame.payload)?;
            let record = state.node.read(&parse_uri(&payload.uri)?).await?;
            Ok(serde_json::to_value(&record).expect("records serialize"))
        }
        "readMulti" => {
            let payload: ReadMultiPayload = parse_payload(&frame.payload)?;
            let mut uris = Vec::with_capacity(payload.uris.len());
            for raw in &payload.uris {
                uris.push(parse_uri(raw)?);
            }
            let result = state.node.read_multi(&uris).await?;
            Ok(serde_json::to_value(&result).expect("results serialize"))
        }
        "list" => {
            let payload: ListPayload = parse_payload(&frame.payload)?;
            let page = match Uri::parse(&payload.uri) {
                Ok(uri) => state.node.list(&uri, payload.opts).await?,
                Err(_) => ListPage::empty(&payload.opts),
            };
            Ok(serde_json::to_value(&page).expect("pages serialize"))
        }
        "delete" => {
            let payload: UriPayload = parse_payload(&frame.payload)?;
            state.node.delete(&parse_uri(&payload.uri)?).await?;
            Ok(serde_json::Value::Bool(true))
        }
        "health" => {
            let health = state.node.health().await;
            Ok(serde_json::to_value(&health).expect("health serializes"))
        }
        "listPrograms" => {
            let programs = state.node.list_programs().await?;
            let rendered: Vec<String> = programs
                .iter()
                .map(|key| key.as_str().to_string())
                .collect();
            Ok(serde_json::to_value(rendered).expect("strings serialize"))
        }
        other => Err(NodeError::Validation(format!("unknown op {:?}", other))),
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(
    payload: &serde_json::Value,
) -> Result<T, NodeError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| NodeError::Validation(format!("bad payload: {}", e)))
}

fn parse_uri(raw: &str) -> Result<Uri, NodeError> {
    Uri::parse(raw).map_err(|e| NodeError::Validation(e.to_string()))
}

fn reply_ok(id: serde_json::Value, data: serde_json::Value) -> String {
    serde_json::json!({ "id": id, "ok": true, "data": data }).to_string()
}

fn reply_err(id: serde_json::Value, err: &NodeError) -> String {
    serde_json::json!({ "id": id, "ok": false, "error": err.to_string() }).to_string()
}
