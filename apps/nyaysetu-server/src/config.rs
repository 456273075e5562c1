// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `MONGODB_URI` | MongoDB connection string | Required |
//! | `AUTH_DB_NAME` | Database holding the auth library collections | `nyaysetu` |
//! | `BLOCKCHAIN_DB_NAME` | Database holding key registry and file records | `blockchain` |
//! | `BLOCKCHAIN_API_URL` | File-storage backend base URL | `http://localhost:5000` |
//! | `CHAT_API_URL` | Chat backend base URL | `http://localhost:8000` |
//! | `DRAFT_API_URL` | PDF draft generator base URL | `http://localhost:8001` |
//! | `BETTER_AUTH_SECRET` | Session cookie signing secret | Optional (dev mode when unset) |
//! | `UPSTREAM_TIMEOUT_SECS` | Timeout for upstream HTTP calls | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{env, time::Duration};

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const MONGODB_URI_ENV: &str = "MONGODB_URI";
pub const AUTH_DB_NAME_ENV: &str = "AUTH_DB_NAME";
pub const BLOCKCHAIN_DB_NAME_ENV: &str = "BLOCKCHAIN_DB_NAME";
pub const BLOCKCHAIN_API_URL_ENV: &str = "BLOCKCHAIN_API_URL";
pub const CHAT_API_URL_ENV: &str = "CHAT_API_URL";
pub const DRAFT_API_URL_ENV: &str = "DRAFT_API_URL";
pub const AUTH_SECRET_ENV: &str = "BETTER_AUTH_SECRET";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AUTH_DB_NAME: &str = "nyaysetu";
pub const DEFAULT_BLOCKCHAIN_DB_NAME: &str = "blockchain";
pub const DEFAULT_BLOCKCHAIN_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_CHAT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_DRAFT_API_URL: &str = "http://localhost:8001";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Base URLs of the services this server relays to.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub blockchain_url: Url,
    pub chat_url: Url,
    pub draft_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub auth_db_name: String,
    pub blockchain_db_name: String,
    pub auth_secret: Option<String>,
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var(PORT_ENV) {
            Ok(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let timeout_secs = match env::var(UPSTREAM_TIMEOUT_ENV) {
            Ok(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: UPSTREAM_TIMEOUT_ENV,
                reason: e.to_string(),
            })?,
            Err(_) => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        Ok(Self {
            host: env_or_default(HOST_ENV, DEFAULT_HOST),
            port,
            mongodb_uri: env::var(MONGODB_URI_ENV).map_err(|_| ConfigError::Missing(MONGODB_URI_ENV))?,
            auth_db_name: env_or_default(AUTH_DB_NAME_ENV, DEFAULT_AUTH_DB_NAME),
            blockchain_db_name: env_or_default(BLOCKCHAIN_DB_NAME_ENV, DEFAULT_BLOCKCHAIN_DB_NAME),
            auth_secret: env::var(AUTH_SECRET_ENV).ok().filter(|s| !s.trim().is_empty()),
            upstream: UpstreamConfig {
                blockchain_url: url_from_env(BLOCKCHAIN_API_URL_ENV, DEFAULT_BLOCKCHAIN_API_URL)?,
                chat_url: url_from_env(CHAT_API_URL_ENV, DEFAULT_CHAT_API_URL)?,
                draft_url: url_from_env(DRAFT_API_URL_ENV, DEFAULT_DRAFT_API_URL)?,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            blockchain_url: default_url(DEFAULT_BLOCKCHAIN_API_URL),
            chat_url: default_url(DEFAULT_CHAT_API_URL),
            draft_url: default_url(DEFAULT_DRAFT_API_URL),
            timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}

/// Parse a base URL, ensuring a trailing slash so `Url::join` appends paths
/// instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}

fn url_from_env(name: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = env_or_default(name, default);
    parse_base_url(&raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn default_url(raw: &str) -> Url {
    // Only called with the DEFAULT_* constants above.
    parse_base_url(raw).expect("default upstream URL is valid")
}

fn env_or_default(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("http://backend:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://backend:5000/api/");
        assert_eq!(
            url.join("upload").unwrap().as_str(),
            "http://backend:5000/api/upload"
        );
    }

    #[test]
    fn base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn default_upstreams_point_at_localhost() {
        let upstream = UpstreamConfig::default();
        assert_eq!(upstream.blockchain_url.as_str(), "http://localhost:5000/");
        assert_eq!(upstream.chat_url.as_str(), "http://localhost:8000/");
        assert_eq!(upstream.draft_url.as_str(), "http://localhost:8001/");
    }
}
