use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::user::User;

/// Registration failure: the email is already taken.
#[derive(Debug, PartialEq)]
pub struct EmailTaken;

/// In-memory user registry (single-instance, nothing persisted — the whole
/// service is stateless across restarts by design).
#[derive(Clone, Default)]
pub struct UserStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new user; fails if the email is already registered.
    /// Email comparison is case-insensitive.
    pub async fn insert(&self, user: User) -> Result<User, EmailTaken> {
        let mut users = self.users.lock().await;
        let taken = users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(EmailTaken);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        let users = self.users.lock().await;
        users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    pub async fn get(&self, id: Uuid) -> Option<User> {
        let users = self.users.lock().await;
        users.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use chrono::Utc;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: "hash".into(),
            name: "Test".into(),
            preferred_language: Language::English,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = UserStore::new();
        let u = store.insert(user("a@fharma.in")).await.unwrap();
        assert_eq!(store.get(u.id).await.unwrap().email, "a@fharma.in");
        assert!(store.find_by_email("A@Fharma.IN").await.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = UserStore::new();
        store.insert(user("dup@fharma.in")).await.unwrap();
        assert!(store.insert(user("dup@fharma.in")).await.is_err());
    }
}
