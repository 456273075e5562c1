// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account deletion.
//!
//! Each auth collection is swept independently. A failure in one collection
//! is logged and reported but does not stop the others.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    auth::{Auth, AuthenticatedUser},
    models::PurgeCounts,
    state::AppState,
    storage::{
        AccountStore, StorageResult, ACCOUNT_COLLECTION, SESSION_COLLECTION, USER_COLLECTION,
        VERIFICATION_COLLECTION,
    },
};

/// A collection that could not be swept.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PurgeFailure {
    pub collection: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteAccountResponse {
    /// True when every collection was swept without error
    pub success: bool,
    pub deleted: PurgeCounts,
    pub errors: Vec<PurgeFailure>,
}

/// Remove every document belonging to the user from the auth collections.
pub async fn purge_account(
    accounts: &dyn AccountStore,
    user: &AuthenticatedUser,
) -> (PurgeCounts, Vec<PurgeFailure>) {
    let mut counts = PurgeCounts::default();
    let mut errors = Vec::new();

    let mut record = |collection: &'static str, result: StorageResult<u64>, slot: &mut u64| match result {
        Ok(n) => *slot = n,
        Err(e) => {
            warn!(user_id = %user.user_id, collection, error = %e, "account purge: collection sweep failed");
            errors.push(PurgeFailure {
                collection: collection.to_string(),
                error: e.to_string(),
            });
        }
    };

    record(
        USER_COLLECTION,
        accounts.delete_users(&user.user_id, &user.email).await,
        &mut counts.user,
    );
    record(
        SESSION_COLLECTION,
        accounts.delete_sessions(&user.user_id).await,
        &mut counts.session,
    );
    record(
        ACCOUNT_COLLECTION,
        accounts.delete_accounts(&user.user_id).await,
        &mut counts.account,
    );
    record(
        VERIFICATION_COLLECTION,
        accounts.delete_verifications(&user.email).await,
        &mut counts.verification,
    );

    (counts, errors)
}

/// Delete the signed-in user's account.
///
/// Always answers 200 once authenticated; per-collection failures are listed
/// in `errors`.
#[utoipa::path(
    delete,
    path = "/api/account",
    tag = "Account",
    security(("session" = [])),
    responses(
        (status = 200, description = "Sweep finished", body = DeleteAccountResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Json<DeleteAccountResponse> {
    let (deleted, errors) = purge_account(state.accounts.as_ref(), &user).await;

    info!(
        user_id = %user.user_id,
        users = deleted.user,
        sessions = deleted.session,
        accounts = deleted.account,
        verifications = deleted.verification,
        failures = errors.len(),
        "account deleted"
    );

    Json(DeleteAccountResponse {
        success: errors.is_empty(),
        deleted,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionRecord, UserRecord};
    use crate::storage::memory::{AccountRow, VerificationRow};
    use crate::storage::InMemoryStore;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    const USER_ID: &str = "665f1c2e9b1e8a0012345678";
    const EMAIL: &str = "arjun@example.in";

    fn session_user() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: USER_ID.to_string(),
            email: EMAIL.to_string(),
            name: None,
            email_verified: true,
            session_id: "sess_1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert_user(UserRecord::new(USER_ID, EMAIL)).await;
        store.insert_user(UserRecord::new("other", "other@example.in")).await;
        for (id, token) in [("s1", "t1"), ("s2", "t2")] {
            store
                .insert_session(SessionRecord {
                    id: id.into(),
                    token: token.into(),
                    user_id: USER_ID.into(),
                    expires_at: Utc::now() + Duration::days(1),
                })
                .await;
        }
        store
            .insert_account(AccountRow {
                id: "acc_1".into(),
                user_id: USER_ID.into(),
                provider_id: "credential".into(),
            })
            .await;
        for (id, identifier) in [
            ("v1", format!("email-verification-otp-{EMAIL}")),
            ("v2", format!("sign-in-otp-{EMAIL}")),
            ("v3", EMAIL.to_string()),
            ("v4", "sign-in-otp-other@example.in".to_string()),
        ] {
            store
                .insert_verification(VerificationRow {
                    id: id.into(),
                    identifier,
                })
                .await;
        }
        store
    }

    #[tokio::test]
    async fn delete_account_leaves_nothing_behind() {
        let store = seeded_store().await;
        let state = AppState::in_memory(store.clone()).unwrap();

        let Json(response) = delete_account(State(state), Auth(session_user())).await;

        assert!(response.success);
        assert!(response.errors.is_empty());
        assert_eq!(
            response.deleted,
            PurgeCounts {
                user: 1,
                session: 2,
                account: 1,
                verification: 3,
            }
        );
        assert_eq!(store.remaining_for(USER_ID, EMAIL).await, 0);
        // Other users are untouched
        assert!(store.find_user_by_id("other").await.unwrap().is_some());
        assert_eq!(store.remaining_for("other", "other@example.in").await, 2);
    }

    #[tokio::test]
    async fn failing_collection_does_not_stop_the_sweep() {
        let store = seeded_store().await;
        store.fail_on(SESSION_COLLECTION).await;

        let (counts, errors) = purge_account(store.as_ref(), &session_user()).await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].collection, SESSION_COLLECTION);
        assert_eq!(counts.session, 0);
        assert_eq!(counts.user, 1);
        assert_eq!(counts.account, 1);
        assert_eq!(counts.verification, 3);
    }

    #[tokio::test]
    async fn partial_failure_is_still_ok_response() {
        let store = seeded_store().await;
        store.fail_on(VERIFICATION_COLLECTION).await;
        let state = AppState::in_memory(store).unwrap();

        let Json(response) = delete_account(State(state), Auth(session_user())).await;
        assert!(!response.success);
        assert_eq!(response.errors[0].collection, VERIFICATION_COLLECTION);
        assert_eq!(response.deleted.user, 1);
    }
}
