// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nyaysetu_server::{
    api::router,
    config::{AppConfig, ConfigError, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    providers::UpstreamError,
    state::{AppState, AuthConfig},
    storage::{mongo, MongoAccountStore, MongoKeyStore, StorageError},
};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to MongoDB: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to build upstream clients: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("invalid bind address {0}")]
    BindAddress(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json_logs = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    let client = mongo::connect(&config.mongodb_uri).await?;
    let accounts = Arc::new(MongoAccountStore::new(&client, &config.auth_db_name));
    let keys = Arc::new(MongoKeyStore::new(&client, &config.blockchain_db_name));

    if config.auth_secret.is_none() {
        info!("BETTER_AUTH_SECRET not set, session signatures are not verified (development mode)");
    }

    let state = AppState::new(
        accounts,
        keys,
        &config.upstream,
        AuthConfig {
            secret: config.auth_secret.clone(),
        },
    )?;
    let background = state.background.clone();
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| StartupError::BindAddress(format!("{}:{}", config.host, config.port)))?;

    info!(
        %addr,
        blockchain_api = %config.upstream.blockchain_url,
        chat_api = %config.upstream.chat_url,
        draft_api = %config.upstream.draft_url,
        "NyaySetu relay server listening (docs at /docs)"
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    background.close();
    if !background.is_empty() {
        info!(pending = background.len(), "waiting for background uploads");
    }
    background.wait().await;
    info!("server stopped");

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
