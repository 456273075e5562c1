// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Newsletter subscription endpoints.
//!
//! The subscription lives on the user document as `newsletterSubscription`.
//! Every write is keyed by the session email, so a user can only change
//! their own subscription.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::{Auth, AuthenticatedUser},
    error::ApiError,
    models::{emails_match, NewsletterSubscription, SubscriptionStatus, UserRecord},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    /// Must match the signed-in user's email
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_subscribed: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterStatusResponse {
    pub subscribed: bool,
    pub status: SubscriptionStatus,
    pub subscribed_at: Option<DateTime<Utc>>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl From<NewsletterSubscription> for NewsletterStatusResponse {
    fn from(sub: NewsletterSubscription) -> Self {
        Self {
            subscribed: sub.is_active(),
            status: sub.status,
            subscribed_at: sub.subscribed_at,
            unsubscribed_at: sub.unsubscribed_at,
        }
    }
}

async fn load_user(state: &AppState, user: &AuthenticatedUser) -> Result<UserRecord, ApiError> {
    state
        .accounts
        .find_user_by_email(&user.email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

async fn store_subscription(
    state: &AppState,
    user: &AuthenticatedUser,
    subscription: &NewsletterSubscription,
) -> Result<(), ApiError> {
    let matched = state
        .accounts
        .update_newsletter(&user.email, subscription)
        .await?;
    if matched {
        Ok(())
    } else {
        Err(ApiError::not_found("User not found"))
    }
}

/// Subscribe the signed-in user to the newsletter.
#[utoipa::path(
    post,
    path = "/api/newsletter/subscribe",
    request_body = SubscribeRequest,
    tag = "Newsletter",
    security(("session" = [])),
    responses(
        (status = 200, description = "Subscribed (or already subscribed)", body = NewsletterResponse),
        (status = 400, description = "Missing email or email does not match the session"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Auth(user): Auth,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<NewsletterResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    if !emails_match(email, &user.email) {
        return Err(
            ApiError::bad_request("Email does not match your account")
                .with_detail("sessionEmail", user.email.clone()),
        );
    }

    let record = load_user(&state, &user).await?;
    if record.subscription().is_active() {
        return Ok(Json(NewsletterResponse {
            success: true,
            message: "Already subscribed to the newsletter".to_string(),
            already_subscribed: Some(true),
        }));
    }

    store_subscription(&state, &user, &NewsletterSubscription::activated(Utc::now())).await?;
    info!(user_id = %user.user_id, "newsletter subscription activated");

    Ok(Json(NewsletterResponse {
        success: true,
        message: "Successfully subscribed to the newsletter".to_string(),
        already_subscribed: Some(false),
    }))
}

/// Unsubscribe the signed-in user. Succeeds even if they never subscribed.
#[utoipa::path(
    post,
    path = "/api/newsletter/unsubscribe",
    tag = "Newsletter",
    security(("session" = [])),
    responses(
        (status = 200, description = "Unsubscribed", body = NewsletterResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<NewsletterResponse>, ApiError> {
    let record = load_user(&state, &user).await?;
    let subscription = record.subscription().deactivated(Utc::now());

    store_subscription(&state, &user, &subscription).await?;
    info!(user_id = %user.user_id, "newsletter subscription deactivated");

    Ok(Json(NewsletterResponse {
        success: true,
        message: "Successfully unsubscribed from the newsletter".to_string(),
        already_subscribed: None,
    }))
}

/// Current newsletter state of the signed-in user.
#[utoipa::path(
    get,
    path = "/api/newsletter/status",
    tag = "Newsletter",
    security(("session" = [])),
    responses(
        (status = 200, description = "Subscription state", body = NewsletterStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn status(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<NewsletterStatusResponse>, ApiError> {
    let record = load_user(&state, &user).await?;
    Ok(Json(record.subscription().into()))
}
