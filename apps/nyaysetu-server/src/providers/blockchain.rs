// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the file-storage ("blockchain") backend.
//!
//! The backend exposes `POST /upload` (multipart), `POST /share` (form),
//! `GET /view` (raw file bytes) and `GET /chain` (JSON ledger dump).

use std::time::Duration;

use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use reqwest::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    multipart::{Form, Part},
    Client,
};
use tracing::{info, warn};
use url::Url;

use super::{ensure_success, http_client, relay, RelayResponse, UpstreamError};

const OCTET_STREAM: &str = "application/octet-stream";

/// A file to hand to the backend on behalf of a user.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub user_key: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A file streamed back from `/view`.
pub struct FileDownload {
    pub content_type: String,
    pub content_disposition: Option<String>,
    pub body: BoxStream<'static, Result<Bytes, reqwest::Error>>,
}

impl std::fmt::Debug for FileDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDownload")
            .field("content_type", &self.content_type)
            .field("content_disposition", &self.content_disposition)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct BlockchainClient {
    http: Client,
    base_url: Url,
}

impl BlockchainClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url,
        })
    }

    pub async fn upload(&self, upload: FileUpload) -> Result<RelayResponse, UpstreamError> {
        let size = upload.bytes.len();
        let mut part = Part::bytes(upload.bytes.to_vec()).file_name(upload.filename.clone());
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| UpstreamError::InvalidResponse(format!("invalid content type: {e}")))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("userKey", upload.user_key);

        info!(filename = %upload.filename, size, "blockchain upload: sending file");

        let response = self
            .http
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "blockchain upload: backend unreachable"))?;

        relay(response).await
    }

    pub async fn share(
        &self,
        file_key: &str,
        recipient_key: &str,
        user_key: &str,
    ) -> Result<RelayResponse, UpstreamError> {
        info!(file_key = %file_key, "blockchain share: forwarding grant");

        let response = self
            .http
            .post(self.endpoint("share")?)
            .form(&[
                ("file_key", file_key),
                ("recipient_key", recipient_key),
                ("userKey", user_key),
            ])
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "blockchain share: backend unreachable"))?;

        relay(response).await
    }

    pub async fn view(&self, file_key: &str, user_key: &str) -> Result<FileDownload, UpstreamError> {
        let response = self
            .http
            .get(self.endpoint("view")?)
            .query(&[("file_key", file_key), ("userKey", user_key)])
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "blockchain view: backend unreachable"))?;
        let response = ensure_success(response).await?;

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(OCTET_STREAM)
            .to_string();
        let content_disposition = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(FileDownload {
            content_type,
            content_disposition,
            body: response.bytes_stream().boxed(),
        })
    }

    pub async fn chain(&self) -> Result<RelayResponse, UpstreamError> {
        let response = self
            .http
            .get(self.endpoint("chain")?)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "blockchain chain: backend unreachable"))?;

        relay(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|e| UpstreamError::InvalidResponse(format!("invalid endpoint {path}: {e}")))
    }
}
