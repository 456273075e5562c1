// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session introspection endpoint.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticatedUser};

/// Response for GET /api/auth/session
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// User's document id in the auth database
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email_verified: bool,
    /// When the current session stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl From<AuthenticatedUser> for SessionResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            name: user.name,
            email_verified: user.email_verified,
            expires_at: user.expires_at,
        }
    }
}

/// Get the user behind the current session.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "Auth",
    security(("session" = [])),
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Unauthorized - missing, invalid or expired session"),
    )
)]
pub async fn get_session(Auth(user): Auth) -> Json<SessionResponse> {
    Json(user.into())
}
