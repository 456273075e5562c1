// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::config::UpstreamConfig;
use crate::providers::{BlockchainClient, ChatClient, DraftClient, UpstreamError};
use crate::storage::{AccountStore, InMemoryStore, KeyStore};

/// Session verification settings.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Cookie signing secret. `None` runs in development mode.
    pub secret: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub keys: Arc<dyn KeyStore>,
    pub blockchain: BlockchainClient,
    pub chat: ChatClient,
    pub drafts: DraftClient,
    pub auth_config: AuthConfig,
    /// Fire-and-forget work (draft re-uploads) drained on shutdown.
    pub background: TaskTracker,
}

impl AppState {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        keys: Arc<dyn KeyStore>,
        upstream: &UpstreamConfig,
        auth_config: AuthConfig,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            accounts,
            keys,
            blockchain: BlockchainClient::new(upstream.blockchain_url.clone(), upstream.timeout)?,
            chat: ChatClient::new(upstream.chat_url.clone(), upstream.timeout)?,
            drafts: DraftClient::new(upstream.draft_url.clone(), upstream.timeout)?,
            auth_config,
            background: TaskTracker::new(),
        })
    }

    /// State backed by a single in-memory store, with default upstreams and
    /// development-mode auth.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Result<Self, UpstreamError> {
        Self::new(
            store.clone(),
            store,
            &UpstreamConfig::default(),
            AuthConfig::default(),
        )
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }
}
