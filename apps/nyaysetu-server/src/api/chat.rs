// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    providers::{ChatTurn, CHAT_FALLBACK_MESSAGE},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
    /// Present and true when the backend could not answer
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

/// Ask the legal assistant.
///
/// Backend failures never surface as errors: the caller gets a fixed apology
/// with `fallback: true` and HTTP 200.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    tag = "Chat",
    responses(
        (status = 200, description = "Assistant reply or fallback", body = ChatResponse),
        (status = 400, description = "Empty message"),
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    let response = match state.chat.reply(&request.message, &request.history).await {
        Ok(reply) => ChatResponse {
            response: reply,
            fallback: false,
        },
        Err(e) => {
            warn!(error = %e, "chat backend failed, serving fallback reply");
            ChatResponse {
                response: CHAT_FALLBACK_MESSAGE.to_string(),
                fallback: true,
            }
        }
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_base_url, UpstreamConfig};
    use crate::state::AuthConfig;
    use crate::storage::InMemoryStore;
    use axum::http::StatusCode;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::{sync::Arc, time::Duration};

    fn state_with_chat_url(url: &str) -> AppState {
        let store = Arc::new(InMemoryStore::new());
        let upstream = UpstreamConfig {
            chat_url: parse_base_url(url).unwrap(),
            timeout: Duration::from_secs(2),
            ..UpstreamConfig::default()
        };
        AppState::new(store.clone(), store, &upstream, AuthConfig::default()).unwrap()
    }

    fn request(message: &str) -> Result<Json<ChatRequest>, JsonRejection> {
        Ok(Json(ChatRequest {
            message: message.to_string(),
            history: Vec::new(),
        }))
    }

    #[tokio::test]
    async fn relays_backend_reply() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(200)
                    .json_body(json!({"response": "You may file an RTI application."}));
            })
            .await;
        let state = state_with_chat_url(&server.base_url());

        let Json(response) = chat(State(state), request("How do I get records?"))
            .await
            .unwrap();
        assert_eq!(response.response, "You may file an RTI application.");
        assert!(!response.fallback);
    }

    #[tokio::test]
    async fn unreachable_backend_returns_fallback() {
        let state = state_with_chat_url("http://127.0.0.1:1");

        let Json(response) = chat(State(state), request("hello")).await.unwrap();
        assert_eq!(
            response.response,
            "I apologize, but I'm currently unable to process your request. Please try again later."
        );
        assert!(response.fallback);
    }

    #[tokio::test]
    async fn backend_error_returns_fallback() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(503);
            })
            .await;
        let state = state_with_chat_url(&server.base_url());

        let Json(response) = chat(State(state), request("hello")).await.unwrap();
        assert!(response.fallback);
        assert_eq!(response.response, CHAT_FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let state = state_with_chat_url("http://127.0.0.1:1");
        let err = chat(State(state), request("  ")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn fallback_flag_is_omitted_on_success() {
        let body = serde_json::to_value(ChatResponse {
            response: "ok".into(),
            fallback: false,
        })
        .unwrap();
        assert!(body.get("fallback").is_none());
    }
}
