// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory implementation of both store traits.
//!
//! Mirrors the matching rules of the MongoDB store (id variants, email
//! keys, verification prefixes). Tests seed it with the `insert_*` helpers
//! and can make individual collections fail with [`InMemoryStore::fail_on`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    verification_identifiers, AccountStore, KeyStore, StorageError, StorageResult,
    ACCOUNT_COLLECTION, FILE_COLLECTION, KEY_COLLECTION, SESSION_COLLECTION, USER_COLLECTION,
    VERIFICATION_COLLECTION,
};
use crate::models::{
    BlockchainKeyRecord, FileRecord, NewsletterSubscription, SessionRecord, UserRecord,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    pub id: String,
    pub user_id: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRow {
    pub id: String,
    pub identifier: String,
}

#[derive(Default)]
struct Collections {
    users: HashMap<String, UserRecord>,
    sessions: Vec<SessionRecord>,
    accounts: Vec<AccountRow>,
    verifications: Vec<VerificationRow>,
    keys: HashMap<String, BlockchainKeyRecord>,
    files: Vec<FileRecord>,
    failing: HashSet<&'static str>,
}

impl Collections {
    fn check(&self, collection: &'static str) -> StorageResult<()> {
        if self.failing.contains(collection) {
            Err(StorageError::Unavailable(collection))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserRecord) {
        self.inner.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn insert_session(&self, session: SessionRecord) {
        self.inner.write().await.sessions.push(session);
    }

    pub async fn insert_account(&self, account: AccountRow) {
        self.inner.write().await.accounts.push(account);
    }

    pub async fn insert_verification(&self, verification: VerificationRow) {
        self.inner.write().await.verifications.push(verification);
    }

    pub async fn insert_file(&self, file: FileRecord) {
        self.inner.write().await.files.push(file);
    }

    /// Make every operation on `collection` return an error.
    pub async fn fail_on(&self, collection: &'static str) {
        self.inner.write().await.failing.insert(collection);
    }

    /// Count documents across the auth collections that still reference the
    /// user id or email.
    pub async fn remaining_for(&self, user_id: &str, email: &str) -> usize {
        let inner = self.inner.read().await;
        let identifiers = verification_identifiers(email);
        inner
            .users
            .values()
            .filter(|u| u.id == user_id || u.email == email)
            .count()
            + inner.sessions.iter().filter(|s| s.user_id == user_id).count()
            + inner.accounts.iter().filter(|a| a.user_id == user_id).count()
            + inner
                .verifications
                .iter()
                .filter(|v| identifiers.contains(&v.identifier))
                .count()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_session_by_token(&self, token: &str) -> StorageResult<Option<SessionRecord>> {
        let inner = self.inner.read().await;
        inner.check(SESSION_COLLECTION)?;
        Ok(inner.sessions.iter().find(|s| s.token == token).cloned())
    }

    async fn find_user_by_id(&self, user_id: &str) -> StorageResult<Option<UserRecord>> {
        let inner = self.inner.read().await;
        inner.check(USER_COLLECTION)?;
        Ok(inner.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let inner = self.inner.read().await;
        inner.check(USER_COLLECTION)?;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_newsletter(
        &self,
        email: &str,
        subscription: &NewsletterSubscription,
    ) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        inner.check(USER_COLLECTION)?;
        match inner.users.values_mut().find(|u| u.email == email) {
            Some(user) => {
                user.newsletter = Some(subscription.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_blockchain_key(&self, email: &str, key: &str) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        inner.check(USER_COLLECTION)?;
        match inner.users.values_mut().find(|u| u.email == email) {
            Some(user) => {
                user.blockchain_key = Some(key.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_users(&self, user_id: &str, email: &str) -> StorageResult<u64> {
        let mut inner = self.inner.write().await;
        inner.check(USER_COLLECTION)?;
        let before = inner.users.len();
        inner
            .users
            .retain(|id, user| id != user_id && user.email != email);
        Ok((before - inner.users.len()) as u64)
    }

    async fn delete_sessions(&self, user_id: &str) -> StorageResult<u64> {
        let mut inner = self.inner.write().await;
        inner.check(SESSION_COLLECTION)?;
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.user_id != user_id);
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn delete_accounts(&self, user_id: &str) -> StorageResult<u64> {
        let mut inner = self.inner.write().await;
        inner.check(ACCOUNT_COLLECTION)?;
        let before = inner.accounts.len();
        inner.accounts.retain(|a| a.user_id != user_id);
        Ok((before - inner.accounts.len()) as u64)
    }

    async fn delete_verifications(&self, email: &str) -> StorageResult<u64> {
        let identifiers = verification_identifiers(email);
        let mut inner = self.inner.write().await;
        inner.check(VERIFICATION_COLLECTION)?;
        let before = inner.verifications.len();
        inner
            .verifications
            .retain(|v| !identifiers.contains(&v.identifier));
        Ok((before - inner.verifications.len()) as u64)
    }

    async fn ping(&self) -> StorageResult<()> {
        self.inner.read().await.check(USER_COLLECTION)
    }
}

#[async_trait]
impl KeyStore for InMemoryStore {
    async fn find_key(&self, username: &str) -> StorageResult<Option<BlockchainKeyRecord>> {
        let inner = self.inner.read().await;
        inner.check(KEY_COLLECTION)?;
        Ok(inner.keys.get(username).cloned())
    }

    async fn insert_key_if_absent(
        &self,
        record: BlockchainKeyRecord,
    ) -> StorageResult<BlockchainKeyRecord> {
        let mut inner = self.inner.write().await;
        inner.check(KEY_COLLECTION)?;
        Ok(inner
            .keys
            .entry(record.username.clone())
            .or_insert(record)
            .clone())
    }

    async fn list_files(&self, owner: &str) -> StorageResult<Vec<FileRecord>> {
        let inner = self.inner.read().await;
        inner.check(FILE_COLLECTION)?;
        Ok(inner
            .files
            .iter()
            .filter(|f| f.owner == owner)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> StorageResult<()> {
        self.inner.read().await.check(KEY_COLLECTION)
    }
}
