// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every variant except `Storage` is an "unauthorized" rejection and maps to
/// 401. Handlers never see these; the extractor returns them as rejections.
#[derive(Debug)]
pub enum AuthError {
    /// No session cookie and no bearer token
    MissingSession,
    /// Cookie or bearer value could not be parsed
    MalformedToken,
    /// Signature part does not match the configured secret
    InvalidSignature,
    /// No session document for the token
    SessionNotFound,
    /// Session document exists but has expired
    SessionExpired,
    /// Session points at a user that no longer exists
    UserNotFound,
    /// Session lookup failed
    Storage(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingSession => "missing_session",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::SessionNotFound => "session_not_found",
            AuthError::SessionExpired => "session_expired",
            AuthError::UserNotFound => "user_not_found",
            AuthError::Storage(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingSession
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingSession => write!(f, "Unauthorized"),
            AuthError::MalformedToken => write!(f, "Session token is malformed"),
            AuthError::InvalidSignature => write!(f, "Session token signature is invalid"),
            AuthError::SessionNotFound => write!(f, "Session not found"),
            AuthError::SessionExpired => write!(f, "Session has expired"),
            AuthError::UserNotFound => write!(f, "Session user not found"),
            AuthError::Storage(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AuthError::Storage(ref msg) = self {
            tracing::error!(error = %msg, "session lookup failed");
        }
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_session_returns_401() {
        let response = AuthError::MissingSession.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["error_code"], "missing_session");
    }

    #[tokio::test]
    async fn storage_failure_returns_500() {
        let response = AuthError::Storage("down".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn expired_session_is_unauthorized() {
        assert_eq!(AuthError::SessionExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::SessionExpired.error_code(), "session_expired");
    }
}
