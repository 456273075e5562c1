// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, Request},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{
    models::{BlockchainKeyRecord, FileRecord, PurgeCounts, SubscriptionStatus},
    providers::ChatTurn,
    state::AppState,
};

pub mod account;
pub mod blockchain;
pub mod chat;
pub mod drafts;
pub mod health;
pub mod newsletter;
pub mod session;

/// Uploads carry whole documents; everything else keeps axum's default.
pub const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4().to_string().parse().ok().map(RequestId::new)
    }
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/auth/session", get(session::get_session))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route("/newsletter/status", get(newsletter::status))
        .route("/account", delete(account::delete_account))
        .route(
            "/blockchain/upload",
            post(blockchain::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/blockchain/share", post(blockchain::share))
        .route("/blockchain/view", get(blockchain::view))
        .route("/blockchain/chain", get(blockchain::chain))
        .route("/blockchain/files", get(blockchain::list_files))
        .route("/blockchain/generate-key", post(blockchain::generate_key))
        .route("/blockchain/key", get(blockchain::get_key))
        .route("/chat", post(chat::chat))
        .route("/drafts/{draft_type}", post(drafts::generate_draft));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let rid = req
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("n/a");
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri().path(),
                request_id = %rid,
            )
        }))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        session::get_session,
        newsletter::subscribe,
        newsletter::unsubscribe,
        newsletter::status,
        account::delete_account,
        blockchain::upload,
        blockchain::share,
        blockchain::view,
        blockchain::chain,
        blockchain::list_files,
        blockchain::generate_key,
        blockchain::get_key,
        chat::chat,
        drafts::generate_draft,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            session::SessionResponse,
            newsletter::SubscribeRequest,
            newsletter::NewsletterResponse,
            newsletter::NewsletterStatusResponse,
            account::DeleteAccountResponse,
            account::PurgeFailure,
            blockchain::RelayEnvelope,
            blockchain::FilesResponse,
            blockchain::KeyResponse,
            chat::ChatRequest,
            chat::ChatResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            BlockchainKeyRecord,
            ChatTurn,
            FileRecord,
            PurgeCounts,
            SubscriptionStatus
        )
    ),
    tags(
        (name = "Auth", description = "Session introspection"),
        (name = "Newsletter", description = "Newsletter subscription"),
        (name = "Account", description = "Account deletion"),
        (name = "Blockchain", description = "File-storage relay and key registry"),
        (name = "Chat", description = "Legal assistant chat relay"),
        (name = "Drafts", description = "Legal draft PDF generation"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
