// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session authentication for the NyaySetu API. Sign-up, OTP and sign-in are
//! handled by the auth library in the web tier; this server only reads the
//! sessions that library writes.
//!
//! ## Auth Flow
//!
//! 1. The web tier signs the user in and sets `better-auth.session_token`
//! 2. The browser (or an API client via `Authorization: Bearer`) sends it along
//! 3. This server:
//!    - Verifies the HMAC signature when `BETTER_AUTH_SECRET` is configured
//!    - Looks the token up in the `session` collection and checks `expiresAt`
//!    - Loads the owning document from `user`
//!
//! ## Security
//!
//! - Newsletter, account and blockchain endpoints require a session
//! - Draft generation accepts an optional session (see `OptionalAuth`)
//! - Expired sessions are rejected even if the row still exists

pub mod error;
pub mod extractor;
pub mod session;

pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use session::AuthenticatedUser;
