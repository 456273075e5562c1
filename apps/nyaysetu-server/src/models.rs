// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Models
//!
//! Records shared between the storage layer and the API handlers. Storage
//! backends convert their native documents into these types, so handlers
//! never see BSON.
//!
//! ## Model Categories
//!
//! - **Users**: auth library users plus the application-added newsletter
//!   sub-document and blockchain key
//! - **Sessions**: sessions written by the auth library
//! - **Blockchain**: key registry entries and file records

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

// =============================================================================
// User Models
// =============================================================================

/// Newsletter subscription state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    #[default]
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
        }
    }

}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "inactive" => Ok(SubscriptionStatus::Inactive),
            other => Err(format!("unknown subscription status: {other}")),
        }
    }
}

/// Newsletter sub-document embedded in the user record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl NewsletterSubscription {
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Subscription activated at `now`.
    pub fn activated(now: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Active,
            subscribed_at: Some(now),
            unsubscribed_at: None,
        }
    }

    /// This subscription deactivated at `now`. The original subscribe time
    /// is kept.
    pub fn deactivated(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Inactive,
            subscribed_at: self.subscribed_at,
            unsubscribed_at: Some(now),
        }
    }
}

/// A user owned by the auth library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Hex ObjectId (or raw string id) of the user document.
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub newsletter: Option<NewsletterSubscription>,
    pub blockchain_key: Option<String>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            email_verified: false,
            newsletter: None,
            blockchain_key: None,
        }
    }

    /// Subscription state, treating a missing sub-document as inactive.
    pub fn subscription(&self) -> NewsletterSubscription {
        self.newsletter.clone().unwrap_or_default()
    }
}

// =============================================================================
// Session Models
// =============================================================================

/// A session row written by the auth library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub token: String,
    /// Owning user id, normalised to its string form.
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// Blockchain Models
// =============================================================================

/// Key registry entry kept in the blockchain database.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainKeyRecord {
    pub username: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

/// File metadata written by the file-storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FileRecord {
    /// Blockchain key of the uploader.
    pub owner: String,
    pub filename: String,
    pub file_key: String,
    pub secure_name: String,
}

/// Per-collection deletion counts from an account sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PurgeCounts {
    pub user: u64,
    pub session: u64,
    pub account: u64,
    pub verification: u64,
}

// =============================================================================
// Email Helpers
// =============================================================================

/// Canonical form used for email comparisons: trimmed, NFKC, lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

/// Whether two emails refer to the same mailbox, ignoring case.
pub fn emails_match(a: &str, b: &str) -> bool {
    normalize_email(a) == normalize_email(b)
}

/// Key-registry username for an email: the lowercased local part.
///
/// Returns `None` when the local part is empty.
pub fn derive_username(email: &str) -> Option<String> {
    let normalized = normalize_email(email);
    let local = match normalized.rfind('@') {
        Some(idx) => &normalized[..idx],
        None => normalized.as_str(),
    };
    if local.is_empty() {
        None
    } else {
        Some(local.to_string())
    }
}
