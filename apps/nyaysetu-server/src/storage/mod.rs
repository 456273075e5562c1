// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for the relay layer lives in two MongoDB databases:
//!
//! ```text
//! <AUTH_DB_NAME>/            written by the auth library
//!   user                     users + newsletterSubscription + blockchainKey
//!   session                  session tokens
//!   account                  linked credentials/providers
//!   verification             OTP and verification tokens
//! <BLOCKCHAIN_DB_NAME>/      shared with the file-storage backend
//!   users                    { username, key, createdAt }
//!   files                    { owner, filename, file_key, secure_name }
//! ```
//!
//! Handlers talk to the [`AccountStore`] and [`KeyStore`] traits. The
//! MongoDB implementation is used in production and [`InMemoryStore`] backs
//! tests and local development.

pub mod documents;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;

use crate::models::{
    BlockchainKeyRecord, FileRecord, NewsletterSubscription, SessionRecord, UserRecord,
};

pub use memory::InMemoryStore;
pub use mongo::{MongoAccountStore, MongoKeyStore};

pub const USER_COLLECTION: &str = "user";
pub const SESSION_COLLECTION: &str = "session";
pub const ACCOUNT_COLLECTION: &str = "account";
pub const VERIFICATION_COLLECTION: &str = "verification";
pub const KEY_COLLECTION: &str = "users";
pub const FILE_COLLECTION: &str = "files";

/// Identifier prefixes the auth library's OTP plugin puts in front of an
/// email when it writes a verification row.
pub const VERIFICATION_PREFIXES: &[&str] = &[
    "email-verification-otp-",
    "sign-in-otp-",
    "forget-password-otp-",
];

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("malformed document in {collection}: {reason}")]
    Malformed {
        collection: &'static str,
        reason: String,
    },

    #[error("collection {0} is unavailable")]
    Unavailable(&'static str),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Access to the auth library's collections.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_session_by_token(&self, token: &str) -> StorageResult<Option<SessionRecord>>;

    async fn find_user_by_id(&self, user_id: &str) -> StorageResult<Option<UserRecord>>;

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>>;

    /// Replace the newsletter sub-document of the user with this email.
    ///
    /// Returns whether a user document matched.
    async fn update_newsletter(
        &self,
        email: &str,
        subscription: &NewsletterSubscription,
    ) -> StorageResult<bool>;

    /// Record the blockchain key on the user with this email.
    ///
    /// Returns whether a user document matched.
    async fn set_blockchain_key(&self, email: &str, key: &str) -> StorageResult<bool>;

    /// Delete user documents matching the id (raw or ObjectId) or the email.
    async fn delete_users(&self, user_id: &str, email: &str) -> StorageResult<u64>;

    /// Delete sessions owned by the user id (raw or ObjectId).
    async fn delete_sessions(&self, user_id: &str) -> StorageResult<u64>;

    /// Delete linked accounts owned by the user id (raw or ObjectId).
    async fn delete_accounts(&self, user_id: &str) -> StorageResult<u64>;

    /// Delete verification rows issued for the email.
    async fn delete_verifications(&self, email: &str) -> StorageResult<u64>;

    async fn ping(&self) -> StorageResult<()>;
}

/// Access to the blockchain database (key registry and file records).
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn find_key(&self, username: &str) -> StorageResult<Option<BlockchainKeyRecord>>;

    /// Insert `record` unless its username already has a key.
    ///
    /// Returns whichever record is stored afterwards, so the first writer
    /// wins.
    async fn insert_key_if_absent(
        &self,
        record: BlockchainKeyRecord,
    ) -> StorageResult<BlockchainKeyRecord>;

    async fn list_files(&self, owner: &str) -> StorageResult<Vec<FileRecord>>;

    async fn ping(&self) -> StorageResult<()>;
}

/// Every verification identifier that can belong to `email`.
pub fn verification_identifiers(email: &str) -> Vec<String> {
    std::iter::once(email.to_string())
        .chain(
            VERIFICATION_PREFIXES
                .iter()
                .map(|prefix| format!("{prefix}{email}")),
        )
        .collect()
}
