// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legal draft generation.
//!
//! The form is rendered by the draft generator and the PDF returned as a
//! download. Signed-in users with a blockchain key also get a copy stored on
//! the file backend; that upload runs after the response and only logs on
//! failure.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    auth::{AuthenticatedUser, OptionalAuth},
    error::ApiError,
    models::derive_username,
    providers::FileUpload,
    state::AppState,
};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Draft types become a path segment upstream: `[A-Za-z0-9_-]+`.
pub fn is_valid_draft_type(draft_type: &str) -> bool {
    !draft_type.is_empty()
        && draft_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Generate a draft PDF from a form.
#[utoipa::path(
    post,
    path = "/api/drafts/{draft_type}",
    params(
        ("draft_type" = String, Path, description = "Draft template, e.g. `rent-agreement`")
    ),
    request_body = Object,
    tag = "Drafts",
    responses(
        (status = 200, description = "Generated PDF", content_type = "application/pdf"),
        (status = 400, description = "Invalid draft type or body"),
        (status = 502, description = "Draft generator unreachable"),
    )
)]
pub async fn generate_draft(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(draft_type): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    if !is_valid_draft_type(&draft_type) {
        return Err(ApiError::bad_request("Invalid draft type"));
    }
    let Json(form) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if !form.is_object() {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    }

    let pdf = state
        .drafts
        .generate(&draft_type, &form)
        .await
        .map_err(|e| {
            warn!(error = %e, draft_type = %draft_type, "draft generation failed");
            ApiError::upstream(e, "Failed to generate draft")
        })?;

    let filename = format!("{draft_type}-{}.pdf", Utc::now().timestamp_millis());

    if let Some(user) = user {
        state.background.spawn(store_draft_copy(
            state.clone(),
            user,
            filename.clone(),
            pdf.clone(),
        ));
    }

    Ok((
        [
            (CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// Upload a generated draft to the file backend under the user's key.
async fn store_draft_copy(state: AppState, user: AuthenticatedUser, filename: String, pdf: Bytes) {
    let Some(username) = derive_username(&user.email) else {
        return;
    };
    let user_key = match state.keys.find_key(&username).await {
        Ok(Some(record)) => record.key,
        Ok(None) => {
            debug!(user_id = %user.user_id, "no blockchain key, skipping draft upload");
            return;
        }
        Err(e) => {
            warn!(user_id = %user.user_id, error = %e, "draft upload: key lookup failed");
            return;
        }
    };

    let upload = FileUpload {
        user_key,
        filename: filename.clone(),
        content_type: Some(PDF_CONTENT_TYPE.to_string()),
        bytes: pdf,
    };
    match state.blockchain.upload(upload).await {
        Ok(_) => info!(user_id = %user.user_id, filename = %filename, "draft stored on file backend"),
        Err(e) => warn!(user_id = %user.user_id, filename = %filename, error = %e, "draft upload failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_base_url, UpstreamConfig};
    use crate::models::BlockchainKeyRecord;
    use crate::state::AuthConfig;
    use crate::storage::{InMemoryStore, KeyStore};
    use axum::http::StatusCode;
    use chrono::Duration;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn state_for(server: &MockServer, store: Arc<InMemoryStore>) -> AppState {
        let base = parse_base_url(&server.base_url()).unwrap();
        let upstream = UpstreamConfig {
            blockchain_url: base.clone(),
            draft_url: base,
            ..UpstreamConfig::default()
        };
        AppState::new(store.clone(), store, &upstream, AuthConfig::default()).unwrap()
    }

    fn session_user() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "user_1".to_string(),
            email: "neha@example.in".to_string(),
            name: None,
            email_verified: true,
            session_id: "sess_1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn draft_type_validation() {
        assert!(is_valid_draft_type("rent-agreement"));
        assert!(is_valid_draft_type("power_of_attorney2"));
        assert!(!is_valid_draft_type(""));
        assert!(!is_valid_draft_type("../admin"));
        assert!(!is_valid_draft_type("nda?x=1"));
    }

    #[tokio::test]
    async fn returns_pdf_attachment() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate/affidavit");
                then.status(200).body("%PDF-1.4 affidavit");
            })
            .await;
        let state = state_for(&server, Arc::new(InMemoryStore::new()));

        let response = generate_draft(
            State(state),
            OptionalAuth(None),
            Path("affidavit".to_string()),
            Ok(Json(json!({"deponent_name": "Neha"}))),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"affidavit-"));
        assert!(disposition.ends_with(".pdf\""));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"%PDF-1.4 affidavit");
    }

    #[tokio::test]
    async fn invalid_draft_type_never_calls_generator() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;
        let state = state_for(&server, Arc::new(InMemoryStore::new()));

        let err = generate_draft(
            State(state),
            OptionalAuth(None),
            Path("bad type".to_string()),
            Ok(Json(json!({}))),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(mock.calls_async().await, 0);
    }

    #[tokio::test]
    async fn generator_failure_propagates_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate/nda");
                then.status(422).json_body(json!({"error": "party_a is required"}));
            })
            .await;
        let state = state_for(&server, Arc::new(InMemoryStore::new()));

        let err = generate_draft(
            State(state),
            OptionalAuth(None),
            Path("nda".to_string()),
            Ok(Json(json!({}))),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message, "party_a is required");
    }

    #[tokio::test]
    async fn signed_in_user_with_key_gets_copy_uploaded() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate/nda");
                then.status(200).body("%PDF nda");
            })
            .await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/upload")
                    .body_includes("key_for_neha");
                then.status(200).json_body(json!({"file_key": "fk_1"}));
            })
            .await;

        let store = Arc::new(InMemoryStore::new());
        store
            .insert_key_if_absent(BlockchainKeyRecord {
                username: "neha".into(),
                key: "key_for_neha".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let state = state_for(&server, store);

        generate_draft(
            State(state.clone()),
            OptionalAuth(Some(session_user())),
            Path("nda".to_string()),
            Ok(Json(json!({"party_a": "Neha"}))),
        )
        .await
        .unwrap();

        state.background.close();
        state.background.wait().await;
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn user_without_key_skips_upload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate/nda");
                then.status(200).body("%PDF nda");
            })
            .await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST).path("/upload");
                then.status(200);
            })
            .await;
        let state = state_for(&server, Arc::new(InMemoryStore::new()));

        generate_draft(
            State(state.clone()),
            OptionalAuth(Some(session_user())),
            Path("nda".to_string()),
            Ok(Json(json!({}))),
        )
        .await
        .unwrap();

        state.background.close();
        state.background.wait().await;
        assert_eq!(upload.calls_async().await, 0);
    }

    #[tokio::test]
    async fn failed_background_upload_does_not_affect_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate/nda");
                then.status(200).body("%PDF nda");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/upload");
                then.status(500);
            })
            .await;

        let store = Arc::new(InMemoryStore::new());
        store
            .insert_key_if_absent(BlockchainKeyRecord {
                username: "neha".into(),
                key: "key_for_neha".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let state = state_for(&server, store);

        let response = generate_draft(
            State(state.clone()),
            OptionalAuth(Some(session_user())),
            Path("nda".to_string()),
            Ok(Json(json!({}))),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        state.background.close();
        state.background.wait().await;
    }
}
