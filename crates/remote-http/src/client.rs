//! The HTTP client node.

use async_trait::async_trait;
use serde::Deserialize;
use shared_types::{
    Health, ListOptions, ListPage, Node, NodeError, ProgramKey, ReadMultiResult, Receipt, Record,
    SortBy, SortOrder, Uri, Value, WriteRequest, READ_MULTI_MAX,
};
use std::time::Duration;

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Server origin, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Route prefix the server was configured with.
    pub prefix: String,
    /// Per-request deadline.
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            prefix: "/api/v1".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Node backed by a remote gateway over HTTP.
pub struct RemoteHttpStore {
    client: reqwest::Client,
    config: HttpClientConfig,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    programs: Vec<String>,
}

impl RemoteHttpStore {
    /// Build a client. Fails only if the HTTP stack cannot initialize.
    pub fn new(config: HttpClientConfig) -> Result<Self, NodeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NodeError::Backend(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, op: &str, uri: Option<&Uri>) -> String {
        let mut url = format!(
            "{}{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.prefix,
            op
        );
        if let Some(uri) = uri {
            url.push('/');
            url.push_str(uri.scheme());
            url.push('/');
            url.push_str(uri.authority());
            if let Some(path) = uri.path() {
                url.push('/');
                url.push_str(path);
            }
        }
        url
    }

    /// Decode a non-success response into its protocol error.
    async fn decode_error(response: reqwest::Response) -> NodeError {
        let status = response.status();
        match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => NodeError::parse_wire(&envelope.error),
            Err(_) => NodeError::Backend(format!("http status {}", status)),
        }
    }

    fn transport_error(err: reqwest::Error) -> NodeError {
        if err.is_timeout() {
            NodeError::Timeout(err.to_string())
        } else if err.is_connect() {
            NodeError::Disconnected(err.to_string())
        } else {
            NodeError::Backend(err.to_string())
        }
    }
}

#[async_trait]
impl Node for RemoteHttpStore {
    async fn receive(&self, request: WriteRequest) -> Result<Receipt, NodeError> {
        let url = self.endpoint("write", Some(&request.uri));
        let builder = match &request.value {
            // Raw bytes pass through as an octet-stream body.
            Value::Bytes(bytes) => self
                .client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes.clone()),
            value => self
                .client
                .post(&url)
                .json(&serde_json::json!({ "value": value })),
        };
        let response = builder.send().await.map_err(Self::transport_error)?;

        if response.status().is_success() {
            return response
                .json::<Receipt>()
                .await
                .map_err(|e| NodeError::Backend(format!("bad receipt: {}", e)));
        }

        // A partially failed envelope still carries its receipt.
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| NodeError::Backend(e.to_string()))?;
        if let Ok(receipt) = serde_json::from_slice::<Receipt>(&body) {
            if !receipt.children.is_empty() {
                return Ok(receipt);
            }
        }
        match serde_json::from_slice::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(NodeError::parse_wire(&envelope.error)),
            Err(_) => Err(NodeError::Backend(format!("http status {}", status))),
        }
    }

    async fn read(&self, uri: &Uri) -> Result<Record, NodeError> {
        let response = self
            .client
            .get(self.endpoint("read", Some(uri)))
            .send()
            .await
            .map_err(Self::transport_error)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        let is_binary = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/octet-stream"))
            .unwrap_or(false);
        if is_binary {
            let ts = response
                .headers()
                .get("x-record-ts")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            let bytes = response
                .bytes()
                .await
                .map_err(|e| NodeError::Backend(e.to_string()))?;
            return Ok(Record::new(ts, Value::Bytes(bytes.to_vec())));
        }
        response
            .json::<Record>()
            .await
            .map_err(|e| NodeError::Backend(format!("bad record: {}", e)))
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
        let response = self
            .client
            .post(self.endpoint("read-multi", None))
            .json(&serde_json::json!({ "uris": rendered }))
            .send()
            .await
            .map_err(Self::transport_error)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        response
            .json::<ReadMultiResult>()
            .await
            .map_err(|e| NodeError::Backend(format!("bad read-multi result: {}", e)))
    }

    async fn list(&self, uri: &Uri, opts: ListOptions) -> Result<ListPage, NodeError> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", opts.page.to_string()),
            ("limit", opts.limit.to_string()),
        ];
        if let Some(pattern) = &opts.pattern {
            query.push(("pattern", pattern.clone()));
        }
        query.push((
            "sortBy",
            match opts.sort_by {
                SortBy::Name => "name".to_string(),
                SortBy::Ts => "ts".to_string(),
            },
        ));
        query.push((
            "sortOrder",
            match opts.sort_order {
                SortOrder::Asc => "asc".to_string(),
                SortOrder::Desc => "desc".to_string(),
            },
        ));

        let response = self
            .client
            .get(self.endpoint("list", Some(uri)))
            .query(&query)
            .send()
            .await
            .map_err(Self::transport_error)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        response
            .json::<ListPage>()
            .await
            .map_err(|e| NodeError::Backend(format!("bad list page: {}", e)))
    }

    async fn delete(&self, uri: &Uri) -> Result<(), NodeError> {
        let response = self
            .client
            .delete(self.endpoint("delete", Some(uri)))
            .send()
            .await
            .map_err(Self::transport_error)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        Ok(())
    }

    async fn health(&self) -> Health {
        let response = match self
            .client
            .get(self.endpoint("health", None))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return Health::unhealthy(err.to_string()),
        };
        // 503 still carries a health body; decode whatever arrived.
        match response.json::<Health>().await {
            Ok(health) => health,
            Err(err) => Health::unhealthy(format!("bad health body: {}", err)),
        }
    }

    async fn list_programs(&self) -> Result<Vec<ProgramKey>, NodeError> {
        let response = self
            .client
            .get(self.endpoint("schema", None))
            .send()
            .await
            .map_err(Self::transport_error)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        let schema = response
            .json::<SchemaResponse>()
            .await
            .map_err(|e| NodeError::Backend(format!("bad schema body: {}", e)))?;
        let mut keys = Vec::with_capacity(schema.programs.len());
        for raw in schema.programs {
            keys.push(
                ProgramKey::parse(&raw).map_err(|e| NodeError::Backend(e.to_string()))?,
            );
        }
        Ok(keys)
    }
}
