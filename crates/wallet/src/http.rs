//! Wallet HTTP route handlers.
//!
//! Prefix `/api/v1`:
//!
//! - `GET  /health`, `GET /server-keys`
//! - `POST /auth/signup/{app_key}`, `POST /auth/login/{app_key}`
//! - `POST /auth/credentials/{change-password|request-password-reset|reset-password}/{app_key}`
//! - `GET  /auth/public-keys/{app_key}` (bearer)
//! - `POST /proxy/write` (bearer)
//! - `GET  /proxy/read?uri=…` (bearer)
//! - `POST /proxy/read-multi` (bearer)

use crate::session::Claims;
use crate::wallet::{ProxyWriteRequest, Wallet};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway::ApiError;
use serde::Deserialize;
use shared_types::{NodeError, Value};
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct WalletState {
    pub wallet: Arc<Wallet>,
}

/// Pull and verify the bearer token.
fn bearer_claims(state: &WalletState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError(NodeError::Auth("missing bearer token".into())))?;
    state.wallet.verify_bearer(token).map_err(ApiError)
}

/// GET /health
pub async fn health() -> Response {
    Json(serde_json::json!({ "status": "healthy" })).into_response()
}

/// GET /server-keys
pub async fn server_keys(State(state): State<WalletState>) -> Response {
    Json(state.wallet.server_keys()).into_response()
}

/// POST /auth/signup/{app_key}
pub async fn signup(
    State(state): State<WalletState>,
    Path(app_key): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let response = state.wallet.signup(&app_key, body).await?;
    Ok(Json(response).into_response())
}

/// POST /auth/login/{app_key}
pub async fn login(
    State(state): State<WalletState>,
    Path(app_key): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let response = state.wallet.login(&app_key, body).await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    username: String,
    old_password: String,
    new_password: String,
}

/// POST /auth/credentials/change-password/{app_key}
pub async fn change_password(
    State(state): State<WalletState>,
    Path(app_key): Path<String>,
    Json(body): Json<ChangePasswordBody>,
) -> Result<Response, ApiError> {
    state
        .wallet
        .change_password(&app_key, &body.username, &body.old_password, &body.new_password)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RequestResetBody {
    username: String,
}

/// POST /auth/credentials/request-password-reset/{app_key}
pub async fn request_password_reset(
    State(state): State<WalletState>,
    Path(app_key): Path<String>,
    Json(body): Json<RequestResetBody>,
) -> Result<Response, ApiError> {
    let response = state
        .wallet
        .request_password_reset(&app_key, &body.username)
        .await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
    username: String,
    reset_token: String,
    new_password: String,
}

/// POST /auth/credentials/reset-password/{app_key}
pub async fn reset_password(
    State(state): State<WalletState>,
    Path(app_key): Path<String>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Response, ApiError> {
    state
        .wallet
        .reset_password(&app_key, &body.username, &body.reset_token, &body.new_password)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })).into_response())
}

/// GET /auth/public-keys/{app_key} (bearer)
pub async fn public_keys(
    State(state): State<WalletState>,
    Path(app_key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state, &headers)?;
    if claims.app_key != app_key {
        return Err(ApiError(NodeError::Auth("token is for another app".into())));
    }
    let keys = state.wallet.public_keys(&claims).await?;
    Ok(Json(keys).into_response())
}

/// POST /proxy/write (bearer)
pub async fn proxy_write(
    State(state): State<WalletState>,
    headers: HeaderMap,
    Json(body): Json<ProxyWriteRequest>,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state, &headers)?;
    let response = state.wallet.proxy_write(&claims, body).await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ProxyReadQuery {
    uri: String,
}

/// GET /proxy/read?uri=… (bearer)
pub async fn proxy_read(
    State(state): State<WalletState>,
    headers: HeaderMap,
    Query(query): Query<ProxyReadQuery>,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state, &headers)?;
    let response = state.wallet.proxy_read(&claims, &query.uri).await?;
    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ProxyReadMultiBody {
    uris: Vec<String>,
}

/// POST /proxy/read-multi (bearer)
pub async fn proxy_read_multi(
    State(state): State<WalletState>,
    headers: HeaderMap,
    Json(body): Json<ProxyReadMultiBody>,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(&state, &headers)?;
    let response = state.wallet.proxy_read_multi(&claims, &body.uris).await?;
    Ok(Json(response).into_response())
}
