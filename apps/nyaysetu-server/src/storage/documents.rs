// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BSON document shapes as they are stored in MongoDB.
//!
//! Identifier fields are kept as raw [`Bson`] because the auth library
//! writes ObjectIds while older rows carry plain strings.

use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, Bson, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{
    BlockchainKeyRecord, FileRecord, NewsletterSubscription, SessionRecord, SubscriptionStatus,
    UserRecord,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: Bson,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub newsletter_subscription: Option<NewsletterDocument>,
    #[serde(default)]
    pub blockchain_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterDocument {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_at: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsubscribed_at: Option<BsonDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    #[serde(rename = "_id")]
    pub id: Bson,
    pub token: String,
    pub user_id: Bson,
    pub expires_at: BsonDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDocument {
    pub username: String,
    pub key: String,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDocument {
    pub owner: String,
    pub filename: String,
    pub file_key: String,
    #[serde(default)]
    pub secure_name: String,
}

/// String form of a document id: hex for ObjectIds, verbatim for strings.
pub fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Every stored representation an id may have: the raw string and, when it
/// parses, the ObjectId.
pub fn id_variants(id: &str) -> Vec<Bson> {
    let mut variants = vec![Bson::String(id.to_string())];
    if let Ok(oid) = ObjectId::parse_str(id) {
        variants.push(Bson::ObjectId(oid));
    }
    variants
}

pub fn to_bson_datetime(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

pub fn from_bson_datetime(dt: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

impl From<&NewsletterSubscription> for NewsletterDocument {
    fn from(sub: &NewsletterSubscription) -> Self {
        Self {
            status: sub.status.as_str().to_string(),
            subscribed_at: sub.subscribed_at.map(to_bson_datetime),
            unsubscribed_at: sub.unsubscribed_at.map(to_bson_datetime),
        }
    }
}

impl From<NewsletterDocument> for NewsletterSubscription {
    fn from(doc: NewsletterDocument) -> Self {
        Self {
            // Unknown statuses are treated as not subscribed
            status: doc.status.parse().unwrap_or_default(),
            subscribed_at: doc.subscribed_at.map(from_bson_datetime),
            unsubscribed_at: doc.unsubscribed_at.map(from_bson_datetime),
        }
    }
}

impl From<UserDocument> for UserRecord {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: id_to_string(&doc.id),
            email: doc.email,
            name: doc.name,
            email_verified: doc.email_verified,
            newsletter: doc.newsletter_subscription.map(Into::into),
            blockchain_key: doc.blockchain_key,
        }
    }
}

impl From<SessionDocument> for SessionRecord {
    fn from(doc: SessionDocument) -> Self {
        Self {
            id: id_to_string(&doc.id),
            token: doc.token,
            user_id: id_to_string(&doc.user_id),
            expires_at: from_bson_datetime(doc.expires_at),
        }
    }
}

impl From<&BlockchainKeyRecord> for KeyDocument {
    fn from(record: &BlockchainKeyRecord) -> Self {
        Self {
            username: record.username.clone(),
            key: record.key.clone(),
            created_at: to_bson_datetime(record.created_at),
        }
    }
}

impl From<KeyDocument> for BlockchainKeyRecord {
    fn from(doc: KeyDocument) -> Self {
        Self {
            username: doc.username,
            key: doc.key,
            created_at: from_bson_datetime(doc.created_at),
        }
    }
}

impl From<FileDocument> for FileRecord {
    fn from(doc: FileDocument) -> Self {
        Self {
            owner: doc.owner,
            filename: doc.filename,
            file_key: doc.file_key,
            secure_name: doc.secure_name,
        }
    }
}
