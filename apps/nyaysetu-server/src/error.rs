// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::providers::UpstreamError;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Extra top-level fields merged into the error body.
    pub details: Map<String, Value>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(flatten)]
    details: Map<String, Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Translate a failed relay call.
    ///
    /// The upstream status is propagated together with the message the
    /// backend reported. When the backend gave no readable message, or could
    /// not be reached at all, `fallback` is used instead.
    pub fn upstream(err: UpstreamError, fallback: &str) -> Self {
        match err {
            UpstreamError::Status { status, message } => {
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                Self::new(status, message.unwrap_or_else(|| fallback.to_string()))
            }
            UpstreamError::Transport(_) => Self::new(StatusCode::BAD_GATEWAY, fallback),
            UpstreamError::InvalidResponse(_) => Self::internal(fallback),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "storage operation failed");
        Self::internal("Database error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let internal = ApiError::internal("oops");
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(internal.details.is_empty());
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[tokio::test]
    async fn details_are_flattened_into_body() {
        let response = ApiError::bad_request("mismatch")
            .with_detail("sessionEmail", "a@example.com")
            .into_response();

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "mismatch");
        assert_eq!(body["sessionEmail"], "a@example.com");
    }

    #[test]
    fn upstream_status_and_message_are_propagated() {
        let err = ApiError::upstream(
            UpstreamError::Status {
                status: 403,
                message: Some("Not the owner".into()),
            },
            "Failed to share file",
        );
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "Not the owner");
    }

    #[test]
    fn upstream_without_message_uses_fallback() {
        let err = ApiError::upstream(
            UpstreamError::Status {
                status: 500,
                message: None,
            },
            "Failed to upload file",
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to upload file");

        let err = ApiError::upstream(
            UpstreamError::Transport("connection refused".into()),
            "Failed to upload file",
        );
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "Failed to upload file");
    }
}
