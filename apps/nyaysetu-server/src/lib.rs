// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! NyaySetu - Authenticated Relay Server
//!
//! Session-gated HTTP API for the NyaySetu legal assistant. It reads the
//! sessions written by the web tier's auth library and relays requests to
//! the file-storage backend, the chat backend and the PDF draft generator.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session cookie verification and extractors
//! - `providers` - HTTP clients for the upstream services
//! - `storage` - MongoDB and in-memory stores

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;
