// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the legal-assistant chat backend.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use utoipa::ToSchema;

use super::{ensure_success, http_client, UpstreamError};

/// Reply served whenever the chat backend cannot answer.
pub const CHAT_FALLBACK_MESSAGE: &str =
    "I apologize, but I'm currently unable to process your request. Please try again later.";

/// Fields the backend has used for its answer, in order of preference.
const REPLY_FIELDS: [&str; 3] = ["response", "reply", "answer"];

/// One prior exchange in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    message: &'a str,
    history: &'a [ChatTurn],
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: Url,
}

impl ChatClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, UpstreamError> {
        let endpoint = base_url
            .join("chat")
            .map_err(|e| UpstreamError::InvalidResponse(format!("invalid chat endpoint: {e}")))?;
        Ok(Self {
            http: http_client(timeout)?,
            endpoint,
        })
    }

    /// Ask the backend for a reply. Callers decide how to degrade on error.
    pub async fn reply(&self, message: &str, history: &[ChatTurn]) -> Result<String, UpstreamError> {
        debug!(history_len = history.len(), "chat: forwarding message");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&ChatPayload { message, history })
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "chat: backend unreachable"))?;
        let response = ensure_success(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        extract_reply(&body).ok_or_else(|| {
            UpstreamError::InvalidResponse("chat response has no reply field".to_string())
        })
    }
}

fn extract_reply(body: &Value) -> Option<String> {
    REPLY_FIELDS
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::to_string)
}
