// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP clients for the external services this server relays to.
//!
//! None of the clients retry. Redirects are not followed: the file backend
//! answers some successful form posts with a redirect, and the relay treats
//! that as success.

pub mod blockchain;
pub mod chat;
pub mod drafts;

use std::time::Duration;

use bytes::Bytes;
use reqwest::{redirect::Policy, Client, Response};
use serde_json::Value;

pub use blockchain::{BlockchainClient, FileDownload, FileUpload};
pub use chat::{ChatClient, ChatTurn, CHAT_FALLBACK_MESSAGE};
pub use drafts::DraftClient;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The service could not be reached or the connection broke mid-flight.
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("upstream response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Transport(err.to_string())
    }
}

/// A successful (2xx or 3xx) relay result.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: u16,
    /// Upstream body: decoded JSON, the raw text, or `Null` when empty.
    pub body: Value,
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, UpstreamError> {
    Client::builder()
        .timeout(timeout)
        .redirect(Policy::none())
        .build()
        .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {e}")))
}

/// Split a response into success or an `UpstreamError::Status`.
///
/// 2xx and 3xx count as success.
pub(crate) async fn relay(response: Response) -> Result<RelayResponse, UpstreamError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() || status.is_redirection() {
        Ok(RelayResponse {
            status: status.as_u16(),
            body: body_value(&bytes),
        })
    } else {
        Err(UpstreamError::Status {
            status: status.as_u16(),
            message: error_message(&bytes),
        })
    }
}

/// Fail with `UpstreamError::Status` unless the response is 2xx.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let bytes = response.bytes().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        message: error_message(&bytes),
    })
}

/// The error text a backend put in its JSON body, if any.
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["error", "message", "detail"]
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .map(str::to_string)
}

fn body_value(bytes: &Bytes) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
