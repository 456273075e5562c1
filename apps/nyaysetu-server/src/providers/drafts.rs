// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the PDF draft generator.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::{ensure_success, http_client, UpstreamError};

#[derive(Debug, Clone)]
pub struct DraftClient {
    http: Client,
    base_url: Url,
}

impl DraftClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url,
        })
    }

    /// Render a draft and return the PDF bytes.
    ///
    /// `draft_type` must already be validated; it becomes a path segment.
    pub async fn generate(&self, draft_type: &str, form: &Value) -> Result<Bytes, UpstreamError> {
        let endpoint = self
            .base_url
            .join(&format!("generate/{draft_type}"))
            .map_err(|e| UpstreamError::InvalidResponse(format!("invalid draft endpoint: {e}")))?;

        info!(draft_type = %draft_type, "draft generation: requesting PDF");

        let response = self
            .http
            .post(endpoint)
            .json(form)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, draft_type = %draft_type, "draft generation: backend unreachable"))?;
        let response = ensure_success(response).await?;

        let pdf = response.bytes().await?;
        info!(draft_type = %draft_type, size = pdf.len(), "draft generation: PDF received");
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_base_url;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> DraftClient {
        DraftClient::new(parse_base_url(&server.base_url()).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_form_and_returns_pdf() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/generate/rent-agreement")
                    .json_body(json!({"landlord": "R. Iyer", "rent": 15000}));
                then.status(200)
                    .header("content-type", "application/pdf")
                    .body("%PDF-1.4 draft");
            })
            .await;

        let pdf = client_for(&server)
            .generate("rent-agreement", &json!({"landlord": "R. Iyer", "rent": 15000}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(&pdf[..], b"%PDF-1.4 draft");
    }

    #[tokio::test]
    async fn generator_error_keeps_status_and_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate/affidavit");
                then.status(422).json_body(json!({"detail": "deponent_name is required"}));
            })
            .await;

        let err = client_for(&server)
            .generate("affidavit", &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UpstreamError::Status { status: 422, ref message } if message.as_deref() == Some("deponent_name is required")
        ));
    }
}
