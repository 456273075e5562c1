// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! MongoDB-backed stores.
//!
//! A single [`Client`] is shared by both stores; the driver pools
//! connections internally, so handlers never open or close connections
//! themselves.

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Bson},
    options::ReturnDocument,
    Client, Collection, Database,
};

use super::documents::{
    id_variants, to_bson_datetime, FileDocument, KeyDocument, NewsletterDocument,
    SessionDocument, UserDocument,
};
use super::{
    verification_identifiers, AccountStore, KeyStore, StorageError, StorageResult,
    ACCOUNT_COLLECTION, FILE_COLLECTION, KEY_COLLECTION, SESSION_COLLECTION, USER_COLLECTION,
    VERIFICATION_COLLECTION,
};
use crate::models::{
    BlockchainKeyRecord, FileRecord, NewsletterSubscription, SessionRecord, UserRecord,
};

/// Connect to MongoDB. The driver connects lazily, so this only validates
/// the connection string.
pub async fn connect(uri: &str) -> StorageResult<Client> {
    Ok(Client::with_uri_str(uri).await?)
}

async fn ping(db: &Database) -> StorageResult<()> {
    db.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

// =============================================================================
// Auth database
// =============================================================================

#[derive(Clone)]
pub struct MongoAccountStore {
    db: Database,
}

impl MongoAccountStore {
    pub fn new(client: &Client, db_name: &str) -> Self {
        Self {
            db: client.database(db_name),
        }
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection(USER_COLLECTION)
    }

    fn sessions(&self) -> Collection<SessionDocument> {
        self.db.collection(SESSION_COLLECTION)
    }

    fn raw(&self, name: &str) -> Collection<mongodb::bson::Document> {
        self.db.collection(name)
    }
}

#[async_trait]
impl AccountStore for MongoAccountStore {
    async fn find_session_by_token(&self, token: &str) -> StorageResult<Option<SessionRecord>> {
        let session = self.sessions().find_one(doc! { "token": token }).await?;
        Ok(session.map(Into::into))
    }

    async fn find_user_by_id(&self, user_id: &str) -> StorageResult<Option<UserRecord>> {
        let user = self
            .users()
            .find_one(doc! { "_id": { "$in": id_variants(user_id) } })
            .await?;
        Ok(user.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let user = self.users().find_one(doc! { "email": email }).await?;
        Ok(user.map(Into::into))
    }

    async fn update_newsletter(
        &self,
        email: &str,
        subscription: &NewsletterSubscription,
    ) -> StorageResult<bool> {
        let sub_doc = to_bson(&NewsletterDocument::from(subscription)).map_err(|e| {
            StorageError::Malformed {
                collection: USER_COLLECTION,
                reason: e.to_string(),
            }
        })?;

        let result = self
            .users()
            .update_one(
                doc! { "email": email },
                doc! {
                    "$set": {
                        "newsletterSubscription": sub_doc,
                        "updatedAt": to_bson_datetime(Utc::now()),
                    }
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn set_blockchain_key(&self, email: &str, key: &str) -> StorageResult<bool> {
        let result = self
            .users()
            .update_one(
                doc! { "email": email },
                doc! {
                    "$set": {
                        "blockchainKey": key,
                        "updatedAt": to_bson_datetime(Utc::now()),
                    }
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_users(&self, user_id: &str, email: &str) -> StorageResult<u64> {
        let result = self
            .raw(USER_COLLECTION)
            .delete_many(doc! {
                "$or": [
                    { "_id": { "$in": id_variants(user_id) } },
                    { "email": email },
                ]
            })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_sessions(&self, user_id: &str) -> StorageResult<u64> {
        let result = self
            .raw(SESSION_COLLECTION)
            .delete_many(doc! { "userId": { "$in": id_variants(user_id) } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_accounts(&self, user_id: &str) -> StorageResult<u64> {
        let result = self
            .raw(ACCOUNT_COLLECTION)
            .delete_many(doc! { "userId": { "$in": id_variants(user_id) } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_verifications(&self, email: &str) -> StorageResult<u64> {
        let identifiers: Vec<Bson> = verification_identifiers(email)
            .into_iter()
            .map(Bson::String)
            .collect();
        let result = self
            .raw(VERIFICATION_COLLECTION)
            .delete_many(doc! { "identifier": { "$in": identifiers } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> StorageResult<()> {
        ping(&self.db).await
    }
}

// =============================================================================
// Blockchain database
// =============================================================================

#[derive(Clone)]
pub struct MongoKeyStore {
    db: Database,
}

impl MongoKeyStore {
    pub fn new(client: &Client, db_name: &str) -> Self {
        Self {
            db: client.database(db_name),
        }
    }

    fn keys(&self) -> Collection<KeyDocument> {
        self.db.collection(KEY_COLLECTION)
    }

    fn files(&self) -> Collection<FileDocument> {
        self.db.collection(FILE_COLLECTION)
    }
}

#[async_trait]
impl KeyStore for MongoKeyStore {
    async fn find_key(&self, username: &str) -> StorageResult<Option<BlockchainKeyRecord>> {
        let key = self.keys().find_one(doc! { "username": username }).await?;
        Ok(key.map(Into::into))
    }

    async fn insert_key_if_absent(
        &self,
        record: BlockchainKeyRecord,
    ) -> StorageResult<BlockchainKeyRecord> {
        let candidate = KeyDocument::from(&record);

        // $setOnInsert leaves an existing document untouched, so the first
        // writer's key is what every caller reads back.
        let stored = self
            .keys()
            .find_one_and_update(
                doc! { "username": candidate.username.as_str() },
                doc! {
                    "$setOnInsert": {
                        "username": candidate.username.as_str(),
                        "key": candidate.key.as_str(),
                        "createdAt": candidate.created_at,
                    }
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;

        match stored {
            Some(doc) => Ok(doc.into()),
            None => self
                .find_key(&record.username)
                .await?
                .ok_or(StorageError::Unavailable(KEY_COLLECTION)),
        }
    }

    async fn list_files(&self, owner: &str) -> StorageResult<Vec<FileRecord>> {
        let cursor = self.files().find(doc! { "owner": owner }).await?;
        let docs: Vec<FileDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> StorageResult<()> {
        ping(&self.db).await
    }
}
