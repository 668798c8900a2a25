//! HTTP route handlers.
//!
//! A thin shell over the node interface: parse the URI out of the path
//! segments, call the node, map error kinds to status codes. Binary
//! records pass through as `application/octet-stream` in both directions;
//! everything else is JSON.

use crate::error::ApiError;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use shared_types::{ListOptions, ListPage, Node, NodeError, Receipt, Uri, Value, WriteRequest};
use std::sync::Arc;

/// Header carrying the record ts on binary reads.
pub const RECORD_TS_HEADER: &str = "x-record-ts";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<dyn Node>,
}

fn parse_uri(scheme: &str, authority: &str, path: Option<&str>) -> Result<Uri, ApiError> {
    let raw = match path {
        Some(path) => format!("{}://{}/{}", scheme, authority, path),
        None => format!("{}://{}", scheme, authority),
    };
    Uri::parse(&raw).map_err(|e| ApiError(NodeError::Validation(e.to_string())))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Response {
    let health = state.node.health().await;
    let status = match health.status {
        shared_types::HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(health)).into_response()
}

/// GET /schema
pub async fn schema(State(state): State<AppState>) -> Result<Response, ApiError> {
    let programs = state.node.list_programs().await?;
    let rendered: Vec<String> = programs
        .iter()
        .map(|key| key.as_str().to_string())
        .collect();
    Ok(Json(serde_json::json!({ "programs": rendered })).into_response())
}

#[derive(Debug, Deserialize)]
struct WriteBody {
    value: Value,
}

fn receipt_response(receipt: Receipt) -> Response {
    let accepted = receipt.accepted();
    let mut body = serde_json::to_value(&receipt).expect("receipts serialize");
    body["ok"] = serde_json::Value::Bool(accepted);
    if let Some(err) = receipt.first_error() {
        body["error"] = serde_json::Value::String(err.to_string());
    }
    let status = if accepted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(body)).into_response()
}

async fn write(
    state: AppState,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let is_binary = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/octet-stream"))
        .unwrap_or(false);

    let value = if is_binary {
        Value::Bytes(body.to_vec())
    } else {
        let parsed: WriteBody = serde_json::from_slice(&body)
            .map_err(|e| ApiError(NodeError::Validation(format!("bad write body: {}", e))))?;
        parsed.value
    };

    let receipt = state.node.receive(WriteRequest::new(uri, value)).await?;
    Ok(receipt_response(receipt))
}

/// POST /write/{scheme}/{authority}
pub async fn write_root(
    State(state): State<AppState>,
    Path((scheme, authority)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let uri = parse_uri(&scheme, &authority, None)?;
    write(state, uri, headers, body).await
}

/// POST /write/{scheme}/{authority}/{path...}
pub async fn write_path(
    State(state): State<AppState>,
    Path((scheme, authority, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let uri = parse_uri(&scheme, &authority, Some(&path))?;
    write(state, uri, headers, body).await
}

async fn read(state: AppState, uri: Uri) -> Result<Response, ApiError> {
    let record = state.node.read(&uri).await?;
    match &record.data {
        Value::Bytes(bytes) => Ok((
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (
                    header::HeaderName::from_static(RECORD_TS_HEADER),
                    record.ts.to_string(),
                ),
            ],
            bytes.clone(),
        )
            .into_response()),
        _ => Ok(Json(record).into_response()),
    }
}

/// GET /read/{scheme}/{authority}
pub async fn read_root(
    State(state): State<AppState>,
    Path((scheme, authority)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let uri = parse_uri(&scheme, &authority, None)?;
    read(state, uri).await
}

/// GET /read/{scheme}/{authority}/{path...}
pub async fn read_path(
    State(state): State<AppState>,
    Path((scheme, authority, path)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let uri = parse_uri(&scheme, &authority, Some(&path))?;
    read(state, uri).await
}

/// Query parameters of the list endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    page: Option<usize>,
    limit: Option<usize>,
    pattern: Option<String>,
    sort_by: Option<shared_types::SortBy>,
    sort_order: Option<shared_types::SortOrder>,
}

impl ListQuery {
    fn into_options(self) -> ListOptions {
        let defaults = ListOptions::default();
        ListOptions {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
            pattern: self.pattern,
            sort_by: self.sort_by.unwrap_or(defaults.sort_by),
            sort_order: self.sort_order.unwrap_or(defaults.sort_order),
        }
    }
}

async fn list(state: AppState, raw_uri: String, query: ListQuery) -> Result<Response, ApiError> {
    let opts = query.into_options();
    // Unlistable targets yield the empty page, not an error.
    let page = match Uri::parse(&raw_uri) {
        Ok(uri) => state.node.list(&uri, opts).await?,
        Err(_) => ListPage::empty(&opts),
    };
    Ok(Json(page).into_response())
}

/// GET /list/{scheme}/{authority}
pub async fn list_root(
    State(state): State<AppState>,
    Path((scheme, authority)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    list(state, format!("{}://{}", scheme, authority), query).await
}

/// GET /list/{scheme}/{authority}/{path...}
pub async fn list_path(
    State(state): State<AppState>,
    Path((scheme, authority, path)): Path<(String, String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    list(state, format!("{}://{}/{}", scheme, authority, path), query).await
}

async fn delete(state: AppState, uri: Uri) -> Result<Response, ApiError> {
    state.node.delete(&uri).await?;
    Ok(Json(serde_json::json!({ "ok": true })).into_response())
}

/// DELETE /delete/{scheme}/{authority}
pub async fn delete_root(
    State(state): State<AppState>,
    Path((scheme, authority)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let uri = parse_uri(&scheme, &authority, None)?;
    delete(state, uri).await
}

/// DELETE /delete/{scheme}/{authority}/{path...}
pub async fn delete_path(
    State(state): State<AppState>,
    Path((scheme, authority, path)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let uri = parse_uri(&scheme, &authority, Some(&path))?;
    delete(state, uri).await
}

#[derive(Debug, Deserialize)]
pub struct ReadMultiBody {
    uris: Vec<String>,
}

/// POST /read-multi
pub async fn read_multi(
    State(state): State<AppState>,
    Json(body): Json<ReadMultiBody>,
) -> Result<Response, ApiError> {
    let mut uris = Vec::with_capacity(body.uris.len());
    for raw in &body.uris {
        uris.push(
            Uri::parse(raw).map_err(|e| ApiError(NodeError::Validation(e.to_string())))?,
        );
    }
    let result = state.node.read_multi(&uris).await?;
    Ok(Json(result).into_response())
}
