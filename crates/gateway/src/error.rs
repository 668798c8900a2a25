//! Error-kind to HTTP mapping and the wire error envelope.
//!
//! The envelope is always `{"ok": false, "error": "<kind>: <message>"}`;
//! the status code discriminates the kind class but the kind itself
//! always travels in the message, so clients recover the exact error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared_types::{ErrorKind, NodeError};

/// Status code for a protocol error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation
        | ErrorKind::NoSchema
        | ErrorKind::ImmutableExists
        | ErrorKind::HashMismatch
        | ErrorKind::BatchTooLarge
        | ErrorKind::Decrypt => StatusCode::BAD_REQUEST,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Disconnected => StatusCode::BAD_GATEWAY,
        ErrorKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A node error as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub NodeError);

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        let body = serde_json::json!({ "ok": false, "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classes() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::NoSchema), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Auth), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::Backend), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
