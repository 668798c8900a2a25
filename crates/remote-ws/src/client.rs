//! The WebSocket client node.

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use shared_types::{
    Health, ListOptions, ListPage, Node, NodeError, ProgramKey, ReadMultiResult, Receipt, Record,
    Uri, WriteRequest, READ_MULTI_MAX,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reconnection backoff policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Base delay, doubled per attempt.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl ReconnectPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << attempt.min(6));
        exp.min(self.max_delay)
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct WsClientConfig {
    /// Server endpoint, e.g. `ws://127.0.0.1:8080/api/v1/ws`.
    pub url: String,
    /// Per-request deadline.
    pub timeout: Duration,
    /// Reconnect on socket loss; `None` makes a drop terminal.
    pub reconnect: Option<ReconnectPolicy>,
}

impl WsClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            reconnect: None,
        }
    }
}

type PendingTable = Arc<DashMap<String, oneshot::Sender<Result<serde_json::Value, NodeError>>>>;

/// Node backed by a remote gateway over one WebSocket.
pub struct RemoteWsStore {
    /// Writer handle; taken on close so the connection task can exit.
    outgoing: std::sync::Mutex<Option<mpsc::Sender<String>>>,
    pending: PendingTable,
    timeout: Duration,
    closed: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct WsResponse {
    id: serde_json::Value,
    ok: bool,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteWsStore {
    /// Connect and spawn the connection task. Fails fast if the first
    /// connection cannot be established.
    pub async fn connect(config: WsClientConfig) -> Result<Self, NodeError> {
        let (stream, _) = connect_async(&config.url)
            .await
            .map_err(|e| NodeError::Disconnected(format!("connect failed: {}", e)))?;
        debug!(url = %config.url, "websocket connected");

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<String>(64);
        let pending: PendingTable = Arc::new(DashMap::new());
        tokio::spawn(connection_task(
            config.url.clone(),
            stream,
            outgoing_rx,
            Arc::clone(&pending),
            config.reconnect.clone(),
        ));

        Ok(Self {
            outgoing: std::sync::Mutex::new(Some(outgoing_tx)),
            pending,
            timeout: config.timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Send one request frame and await its correlated response.
    async fn request(
        &self,
        op: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, NodeError> {
        let sender = match self.outgoing.lock().expect("writer lock").clone() {
            Some(sender) if !self.closed.load(Ordering::SeqCst) => sender,
            _ => return Err(NodeError::Disconnected("client is closed".into())),
        };
        let id = uuid::Uuid::new_v4().to_string();
        let frame = serde_json::json!({ "id": id, "op": op, "payload": payload }).to_string();

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        if sender.send(frame).await.is_err() {
            self.pending.remove(&id);
            return Err(NodeError::Disconnected("connection task is gone".into()));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(NodeError::Disconnected("connection dropped".into())),
            Err(_) => {
                // Remove the entry so a late response is discarded.
                self.pending.remove(&id);
                Err(NodeError::Timeout(format!(
                    "no response within {:?}",
                    self.timeout
                )))
            }
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T, NodeError> {
        serde_json::from_value(data).map_err(|e| NodeError::Backend(format!("bad response: {}", e)))
    }
}

/// Dispatch one response frame to its waiting caller.
fn dispatch_response(pending: &PendingTable, text: &str) {
    let response: WsResponse = match serde_json::from_str(text) {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "unparseable websocket frame");
            return;
        }
    };
    let Some(id) = response.id.as_str() else {
        return;
    };
    // A missing entry means the request already timed out; drop it.
    if let Some((_, tx)) = pending.remove(id) {
        let result = if response.ok {
            Ok(response.data)
        } else {
            Err(NodeError::parse_wire(
                response.error.as_deref().unwrap_or("backend: no error detail"),
            ))
        };
        let _ = tx.send(result);
    }
}

/// Fail every in-flight request; called when the socket drops.
fn fail_pending(pending: &PendingTable) {
    let ids: Vec<String> = pending.iter().map(|entry| entry.key().clone()).collect();
    for id in ids {
        if let Some((_, tx)) = pending.remove(&id) {
            let _ = tx.send(Err(NodeError::Disconnected(
                "connection lost with request in flight".into(),
            )));
        }
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Owns the socket: serializes writes, dispatches reads, reconnects.
async fn connection_task(
    url: String,
    first: WsStream,
    mut outgoing: mpsc::Receiver<String>,
    pending: PendingTable,
    reconnect: Option<ReconnectPolicy>,
) {
    let mut stream = first;
    loop {
        let clean_shutdown = run_connection(stream, &mut outgoing, &pending).await;
        fail_pending(&pending);
        if clean_shutdown {
            return;
        }

        let Some(policy) = &reconnect else {
            debug!("websocket dropped, no reconnect policy");
            return;
        };
        let mut attempts = 0u32;
        stream = loop {
            attempts += 1;
            if attempts > policy.max_attempts {
                warn!(attempts, "websocket reconnect attempts exhausted");
                return;
            }
            tokio::time::sleep(policy.delay_for(attempts - 1)).await;
            match connect_async(&url).await {
                Ok((fresh, _)) => {
                    debug!(url = %url, attempts, "websocket reconnected");
                    break fresh;
                }
                Err(err) => {
                    warn!(error = %err, attempts, "websocket reconnect failed");
                }
            }
        };
    }
}

/// Pump one connection until it drops. Returns true on clean shutdown
/// (the client was dropped or closed).
async fn run_connection(
    stream: WsStream,
    outgoing: &mut mpsc::Receiver<String>,
    pending: &PendingTable,
) -> bool {
    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            maybe_frame = outgoing.recv() => match maybe_frame {
                Some(frame) => {
                    if write.send(Message::Text(frame.into())).await.is_err() {
                        return false;
                    }
                }
                // All senders dropped: the client is gone.
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return true;
                }
            },
            maybe_msg = read.next() => match maybe_msg {
                Some(Ok(Message::Text(text))) => dispatch_response(pending, &text),
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => return false,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "websocket read error");
                    return false;
                }
            },
        }
    }
}

#[async_trait]
impl Node for RemoteWsStore {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        let data = self
            .request(
                "receive",
                serde_json::json!({ "uri": request.uri.as_str(), "value": request.value }),
            )
            .await?;
        Self::decode(data)
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        let data = self
            .request("read", serde_json::json!({ "uri": uri.as_str() }))
            .await?;
        Self::decode(data)
    }

    async fn read_multi(&self, uris: &[Uri]) -> Result<ReadMultiResult, NodeError> {
        if uris.len() > READ_MULTI_MAX {
            return Err(NodeError::BatchTooLarge(format!(
                "{} uris exceeds the limit of {}",
                uris.len(),
                READ_MULTI_MAX
            )));
        }
        let rendered: Vec<&str> = uris.iter().map(|uri| uri.as_str()).collect();
        let data = self
            .request("readMulti", serde_json::json!({ "uris": rendered }))
            .await?;
        Self::decode(data)
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        let mut payload = serde_json::to_value(&opts).expect("options serialize");
        payload["uri"] = serde_json::Value::String(uri.as_str().to_string());
        let data = self.request("list", payload).await?;
        Self::decode(data)
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        self.request("delete", serde_json::json!({ "uri": uri.as_str() }))
            .await?;
        Ok(())
    }

    async fn health(&self) -> Health {
        match self.request("health", serde_json::Value::Null).await {
            Ok(data) => Self::decode(data).unwrap_or_else(|err| Health::unhealthy(err.to_string())),
            Err(err) => Health::unhealthy(err.to_string()),
        }
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        let data = self
            .request("listPrograms", serde_json::Value::Null)
            .await?;
        let rendered: Vec<String> = Self::decode(data)?;
        let mut keys = Vec::with_capacity(rendered.len());
        for raw in rendered {
            keys.push(ProgramKey::parse(&raw).map_err(|e| NodeError::Backend(e.to_string()))?);
        }
        Ok(keys)
    }

    async fn close(&self) -> Result<(), NodeError> {
        // Idempotent: the first close drops the writer, which makes the
        // connection task send a close frame and exit.
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.outgoing.lock().expect("writer lock").take();
            fail_pending(&self.pending);
        }
        Ok(())
    }
}

impl Drop for RemoteWsStore {
    fn drop(&mut self) {
        fail_pending(&self.pending);
    }
}
