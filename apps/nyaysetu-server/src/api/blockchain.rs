// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain relay endpoints.
//!
//! Upload, share, view and chain calls are relayed to the file-storage
//! backend. File listings and the key registry are read from the blockchain
//! database directly.

use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{derive_username, BlockchainKeyRecord, FileRecord},
    providers::{FileUpload, RelayResponse, UpstreamError},
    state::AppState,
};

/// Size of a minted blockchain key in bytes (256 bits).
const KEY_BYTES: usize = 32;

/// Envelope returned by every relayed call.
#[derive(Debug, Serialize, ToSchema)]
pub struct RelayEnvelope {
    pub success: bool,
    pub message: String,
    /// Backend response body, passed through unchanged
    pub data: Value,
}

impl RelayEnvelope {
    fn ok(message: &str, relayed: RelayResponse) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: relayed.body,
        })
    }
}

fn relay_outcome(
    result: Result<RelayResponse, UpstreamError>,
    success: &str,
    failure: &str,
) -> Result<Json<RelayEnvelope>, ApiError> {
    match result {
        Ok(relayed) => Ok(RelayEnvelope::ok(success, relayed)),
        Err(e) => {
            warn!(error = %e, context = failure, "blockchain relay call failed");
            Err(ApiError::upstream(e, failure))
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewQuery {
    #[serde(rename = "fileKey")]
    pub file_key: Option<String>,
    #[serde(rename = "userKey")]
    pub user_key: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilesQuery {
    #[serde(rename = "userKey")]
    pub user_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilesResponse {
    pub success: bool,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct KeyResponse {
    pub success: bool,
    pub username: String,
    pub key: String,
    /// False when the key already existed
    pub created: bool,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn read_multipart(mut multipart: Multipart) -> Result<MultipartFields, ApiError> {
    let mut fields = MultipartFields::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            fields.file = Some((filename, content_type, bytes));
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            fields.text.push((name, text));
        }
    }
    Ok(fields)
}

#[derive(Default)]
struct MultipartFields {
    file: Option<(String, Option<String>, Bytes)>,
    text: Vec<(String, String)>,
}

impl MultipartFields {
    fn take_text(&mut self, name: &str) -> Option<String> {
        let idx = self.text.iter().position(|(n, _)| n == name)?;
        required(Some(self.text.swap_remove(idx).1))
    }
}

/// Upload a file to the file-storage backend.
///
/// Multipart body with `file` and `userKey`.
#[utoipa::path(
    post,
    path = "/api/blockchain/upload",
    tag = "Blockchain",
    security(("session" = [])),
    responses(
        (status = 200, description = "File stored", body = RelayEnvelope),
        (status = 400, description = "Missing file or userKey"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "File backend unreachable"),
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    Auth(user): Auth,
    multipart: Multipart,
) -> Result<Json<RelayEnvelope>, ApiError> {
    let mut fields = read_multipart(multipart).await?;
    let user_key = fields.take_text("userKey");
    let (Some((filename, content_type, bytes)), Some(user_key)) = (fields.file, user_key) else {
        return Err(ApiError::bad_request("File and userKey are required"));
    };

    info!(user_id = %user.user_id, filename = %filename, "relaying file upload");
    let result = state
        .blockchain
        .upload(FileUpload {
            user_key,
            filename,
            content_type,
            bytes,
        })
        .await;

    relay_outcome(result, "File uploaded successfully", "Failed to upload file")
}

/// Share a file with another key holder.
///
/// Multipart body with `file_key`, `recipient_key` and `userKey`.
#[utoipa::path(
    post,
    path = "/api/blockchain/share",
    tag = "Blockchain",
    security(("session" = [])),
    responses(
        (status = 200, description = "File shared", body = RelayEnvelope),
        (status = 400, description = "Missing file_key, recipient_key or userKey"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "File backend unreachable"),
    )
)]
pub async fn share(
    State(state): State<AppState>,
    Auth(user): Auth,
    multipart: Multipart,
) -> Result<Json<RelayEnvelope>, ApiError> {
    let mut fields = read_multipart(multipart).await?;
    let (Some(file_key), Some(recipient_key), Some(user_key)) = (
        fields.take_text("file_key"),
        fields.take_text("recipient_key"),
        fields.take_text("userKey"),
    ) else {
        return Err(ApiError::bad_request(
            "file_key, recipient_key and userKey are required",
        ));
    };

    info!(user_id = %user.user_id, file_key = %file_key, "relaying file share");
    let result = state
        .blockchain
        .share(&file_key, &recipient_key, &user_key)
        .await;

    relay_outcome(result, "File shared successfully", "Failed to share file")
}

/// Stream a stored file back to the caller.
#[utoipa::path(
    get,
    path = "/api/blockchain/view",
    params(ViewQuery),
    tag = "Blockchain",
    security(("session" = [])),
    responses(
        (status = 200, description = "File bytes with the backend's content type"),
        (status = 400, description = "Missing fileKey or userKey"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "File backend unreachable"),
    )
)]
pub async fn view(
    State(state): State<AppState>,
    Auth(_user): Auth,
    Query(query): Query<ViewQuery>,
) -> Result<Response, ApiError> {
    let (Some(file_key), Some(user_key)) = (required(query.file_key), required(query.user_key))
    else {
        return Err(ApiError::bad_request("fileKey and userKey are required"));
    };

    let download = state
        .blockchain
        .view(&file_key, &user_key)
        .await
        .map_err(|e| {
            warn!(error = %e, file_key = %file_key, "file view failed");
            ApiError::upstream(e, "Failed to retrieve file")
        })?;

    let mut response = (
        [(CONTENT_TYPE, download.content_type)],
        Body::from_stream(download.body),
    )
        .into_response();
    if let Some(disposition) = download
        .content_disposition
        .and_then(|d| d.parse().ok())
    {
        response.headers_mut().insert(CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}

/// Dump the backend's ledger.
#[utoipa::path(
    get,
    path = "/api/blockchain/chain",
    tag = "Blockchain",
    responses(
        (status = 200, description = "Ledger contents", body = RelayEnvelope),
        (status = 502, description = "File backend unreachable"),
    )
)]
pub async fn chain(State(state): State<AppState>) -> Result<Json<RelayEnvelope>, ApiError> {
    let result = state.blockchain.chain().await;
    relay_outcome(result, "Chain retrieved successfully", "Failed to fetch chain")
}

/// List the file records owned by a key.
#[utoipa::path(
    get,
    path = "/api/blockchain/files",
    params(FilesQuery),
    tag = "Blockchain",
    security(("session" = [])),
    responses(
        (status = 200, description = "File records", body = FilesResponse),
        (status = 400, description = "Missing userKey"),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    Auth(_user): Auth,
    Query(query): Query<FilesQuery>,
) -> Result<Json<FilesResponse>, ApiError> {
    let owner = required(query.user_key).ok_or_else(|| ApiError::bad_request("userKey is required"))?;
    let files = state.keys.list_files(&owner).await?;
    Ok(Json(FilesResponse {
        success: true,
        files,
    }))
}

/// Create the signed-in user's blockchain key, or return the existing one.
#[utoipa::path(
    post,
    path = "/api/blockchain/generate-key",
    tag = "Blockchain",
    security(("session" = [])),
    responses(
        (status = 200, description = "Key for the user", body = KeyResponse),
        (status = 400, description = "Session email has no usable local part"),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn generate_key(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<KeyResponse>, ApiError> {
    let username = derive_username(&user.email)
        .ok_or_else(|| ApiError::bad_request("Cannot derive a username from the session email"))?;

    let (record, created) = match state.keys.find_key(&username).await? {
        Some(existing) => (existing, false),
        None => {
            let minted = mint_key()?;
            let stored = state
                .keys
                .insert_key_if_absent(BlockchainKeyRecord {
                    username: username.clone(),
                    key: minted.clone(),
                    created_at: Utc::now(),
                })
                .await?;
            let created = stored.key == minted;
            (stored, created)
        }
    };

    if created {
        info!(user_id = %user.user_id, username = %username, "blockchain key created");
    }

    match state.accounts.set_blockchain_key(&user.email, &record.key).await {
        Ok(true) => {}
        Ok(false) => warn!(user_id = %user.user_id, "no user document to mirror blockchain key onto"),
        Err(e) => warn!(user_id = %user.user_id, error = %e, "failed to mirror blockchain key"),
    }

    Ok(Json(KeyResponse {
        success: true,
        username,
        key: record.key,
        created,
    }))
}

/// Return the signed-in user's blockchain key.
#[utoipa::path(
    get,
    path = "/api/blockchain/key",
    tag = "Blockchain",
    security(("session" = [])),
    responses(
        (status = 200, description = "Key for the user", body = KeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No key generated yet"),
    )
)]
pub async fn get_key(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<KeyResponse>, ApiError> {
    let username = derive_username(&user.email)
        .ok_or_else(|| ApiError::not_found("No blockchain key found"))?;
    let record = state
        .keys
        .find_key(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("No blockchain key found"))?;

    Ok(Json(KeyResponse {
        success: true,
        username,
        key: record.key,
        created: false,
    }))
}

/// 256 random bits, hex encoded.
fn mint_key() -> Result<String, ApiError> {
    let mut bytes = [0u8; KEY_BYTES];
    SystemRandom::new().fill(&mut bytes).map_err(|_| {
        tracing::error!("system RNG failed while minting blockchain key");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate key")
    })?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
