use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::jwt::hash_token;

#[derive(Debug, Clone)]
pub struct StoredRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    /// Rotation lineage, kept for audit logging
    #[allow(dead_code)]
    pub parent_token_id: Option<Uuid>,
}

/// What presenting a refresh token means for the session.
#[derive(Debug, PartialEq)]
pub enum RefreshOutcome {
    /// Token accepted and revoked (single-use rotation); issue a new pair
    /// linked to this id.
    Rotated { token_id: Uuid, user_id: Uuid },
    /// Token unknown or expired.
    Invalid,
    /// A revoked token was replayed. All of the user's tokens have been
    /// revoked as a defensive response.
    ReuseDetected { user_id: Uuid },
}

/// In-memory refresh token registry keyed by SHA-256 hash of the raw token.
/// Mirrors the usual refresh_tokens table semantics: single-use rotation
/// plus family revocation on replay.
#[derive(Clone, Default)]
pub struct TokenStore {
    tokens: Arc<Mutex<HashMap<String, StoredRefreshToken>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store(
        &self,
        user_id: Uuid,
        raw_refresh_token: &str,
        ttl_secs: i64,
        parent_token_id: Option<Uuid>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let token = StoredRefreshToken {
            id,
            user_id,
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
            revoked: false,
            parent_token_id,
        };
        let mut tokens = self.tokens.lock().await;
        tokens.insert(hash_token(raw_refresh_token), token);
        id
    }

    /// Present a raw refresh token for rotation.
    pub async fn consume(&self, raw_refresh_token: &str) -> RefreshOutcome {
        let hash = hash_token(raw_refresh_token);
        let mut tokens = self.tokens.lock().await;

        let stored = match tokens.get(&hash) {
            Some(t) => t.clone(),
            None => return RefreshOutcome::Invalid,
        };

        if stored.revoked {
            // Reuse detection: revoke the entire family
            for t in tokens.values_mut() {
                if t.user_id == stored.user_id {
                    t.revoked = true;
                }
            }
            return RefreshOutcome::ReuseDetected {
                user_id: stored.user_id,
            };
        }

        if stored.expires_at < Utc::now() {
            return RefreshOutcome::Invalid;
        }

        if let Some(t) = tokens.get_mut(&hash) {
            t.revoked = true;
        }
        RefreshOutcome::Rotated {
            token_id: stored.id,
            user_id: stored.user_id,
        }
    }

    /// Revoke all active refresh tokens for a user (logout).
    pub async fn revoke_all_for_user(&self, user_id: Uuid) {
        let mut tokens = self.tokens.lock().await;
        for t in tokens.values_mut() {
            if t.user_id == user_id {
                t.revoked = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rotation_consumes_token() {
        let store = TokenStore::new();
        let user_id = Uuid::new_v4();
        store.store(user_id, "raw-token", 3600, None).await;

        match store.consume("raw-token").await {
            RefreshOutcome::Rotated { user_id: uid, .. } => assert_eq!(uid, user_id),
            other => panic!("expected Rotated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replay_revokes_family() {
        let store = TokenStore::new();
        let user_id = Uuid::new_v4();
        store.store(user_id, "first", 3600, None).await;
        store.store(user_id, "second", 3600, None).await;

        let _ = store.consume("first").await;
        // Replaying the consumed token trips reuse detection
        assert_eq!(
            store.consume("first").await,
            RefreshOutcome::ReuseDetected { user_id }
        );
        // And the sibling token is now dead too
        assert_eq!(
            store.consume("second").await,
            RefreshOutcome::ReuseDetected { user_id }
        );
    }

    #[tokio::test]
    async fn test_unknown_and_expired_tokens_invalid() {
        let store = TokenStore::new();
        assert_eq!(store.consume("nope").await, RefreshOutcome::Invalid);

        let user_id = Uuid::new_v4();
        store.store(user_id, "stale", -10, None).await;
        assert_eq!(store.consume("stale").await, RefreshOutcome::Invalid);
    }

    #[tokio::test]
    async fn test_logout_revokes_all() {
        let store = TokenStore::new();
        let user_id = Uuid::new_v4();
        store.store(user_id, "tok", 3600, None).await;
        store.revoke_all_for_user(user_id).await;
        assert!(matches!(
            store.consume("tok").await,
            RefreshOutcome::ReuseDetected { .. }
        ));
    }
}
