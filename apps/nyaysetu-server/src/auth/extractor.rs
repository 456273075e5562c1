// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for session-authenticated users.
//!
//! Use the `Auth` extractor in handlers to require a session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;

use super::session::{session_token, session_value};
use super::{AuthenticatedUser, AuthError};
use crate::state::AppState;

/// Extractor for authenticated users.
///
/// Resolves the session cookie (or bearer token) against the `session`
/// collection and loads the owning user.
///
/// ## Authentication Modes
///
/// - **Production mode** (`BETTER_AUTH_SECRET` set): the cookie signature is verified
/// - **Development mode** (no secret): the signature suffix is ignored
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if a layer already resolved the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let user = resolve_session(parts, state).await?;
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid session is present, instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

async fn resolve_session(parts: &Parts, state: &AppState) -> Result<AuthenticatedUser, AuthError> {
    let value = session_value(&parts.headers)?.ok_or(AuthError::MissingSession)?;
    let token = session_token(&value, state.auth_config.secret.as_deref())?;

    let session = state
        .accounts
        .find_session_by_token(&token)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?
        .ok_or(AuthError::SessionNotFound)?;

    if session.is_expired(Utc::now()) {
        tracing::debug!(session_id = %session.id, "rejecting expired session");
        return Err(AuthError::SessionExpired);
    }

    let user = state
        .accounts
        .find_user_by_id(&session.user_id)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

    Ok(AuthenticatedUser::from_records(session, user))
}
