use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{RefreshTokenStore, UserStore};
use crate::error::DatabaseError;
use crate::models::{RefreshTokenRecord, RevokeOutcome, User};

/// Mutex-guarded maps. Every call takes the lock once, so each operation is
/// atomic with respect to the others.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<String, User>>,
    refresh_tokens: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<String, User>>, DatabaseError> {
        self.users
            .lock()
            .map_err(|_| DatabaseError::UnexpectedError("user map lock poisoned".to_string()))
    }

    fn refresh_tokens(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, RefreshTokenRecord>>, DatabaseError> {
        self.refresh_tokens
            .lock()
            .map_err(|_| DatabaseError::UnexpectedError("refresh token map lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, DatabaseError> {
        let mut users = self.users()?;
        if users.contains_key(email) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        users.insert(email.to_string(), user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users()?.get(email).cloned())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError> {
        let mut tokens = self.refresh_tokens()?;
        if tokens.contains_key(&record.token_hash) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Refresh token already exists".to_string(),
            ));
        }
        tokens.insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        Ok(self.refresh_tokens()?.get(token_hash).cloned())
    }

    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<RevokeOutcome, DatabaseError> {
        let mut tokens = self.refresh_tokens()?;
        let outcome = match tokens.get_mut(token_hash) {
            None => RevokeOutcome::NotFound,
            Some(record) if record.revoked_at.is_some() => RevokeOutcome::AlreadyRevoked,
            Some(record) => {
                record.revoked_at = Some(at);
                RevokeOutcome::Revoked
            }
        };
        Ok(outcome)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let mut tokens = self.refresh_tokens()?;
        let mut revoked = 0;
        for record in tokens
            .values_mut()
            .filter(|r| r.user_id == user_id && r.revoked_at.is_none())
        {
            record.revoked_at = Some(at);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let mut tokens = self.refresh_tokens()?;
        let before = tokens.len();
        tokens.retain(|_, record| !record.is_expired_at(now));
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(hash: &str, user_id: Uuid, now: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord::new(hash.to_string(), user_id, now, Duration::days(60))
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryStore::new();
        store.create_user("a@example.com", "hash").await.expect("first insert");

        let err = store.create_user("a@example.com", "hash").await.unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_get_user_by_email() {
        let store = InMemoryStore::new();
        let created = store.create_user("a@example.com", "hash").await.expect("insert");

        let found = store.get_user_by_email("a@example.com").await.expect("lookup");
        assert_eq!(found.map(|u| u.id), Some(created.id));
        assert!(store.get_user_by_email("b@example.com").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_token_hash_rejected() {
        let store = InMemoryStore::new();
        let rec = record("h1", Uuid::new_v4(), Utc::now());
        store.create_refresh_token(&rec).await.expect("insert");

        assert!(store.create_refresh_token(&rec).await.is_err());
    }

    #[tokio::test]
    async fn test_revoke_keeps_first_timestamp() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .create_refresh_token(&record("h1", Uuid::new_v4(), now))
            .await
            .expect("insert");

        let first = now + Duration::minutes(1);
        let second = now + Duration::minutes(2);
        assert_eq!(store.revoke_refresh_token("h1", first).await.expect("revoke"), RevokeOutcome::Revoked);
        assert_eq!(
            store.revoke_refresh_token("h1", second).await.expect("revoke"),
            RevokeOutcome::AlreadyRevoked
        );
        assert_eq!(
            store.revoke_refresh_token("missing", second).await.expect("revoke"),
            RevokeOutcome::NotFound
        );

        let stored = store.find_refresh_token("h1").await.expect("find").expect("present");
        assert_eq!(stored.revoked_at, Some(first));
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        for (hash, owner) in [("a", user), ("b", user), ("c", other)] {
            store.create_refresh_token(&record(hash, owner, now)).await.expect("insert");
        }
        store.revoke_refresh_token("a", now).await.expect("revoke");

        assert_eq!(store.revoke_all_for_user(user, now).await.expect("revoke all"), 1);
        let untouched = store.find_refresh_token("c").await.expect("find").expect("present");
        assert!(untouched.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let stale = RefreshTokenRecord::new("old".into(), Uuid::new_v4(), now - Duration::days(61), Duration::days(60));
        store.create_refresh_token(&stale).await.expect("insert");
        store.create_refresh_token(&record("fresh", Uuid::new_v4(), now)).await.expect("insert");

        assert_eq!(store.delete_expired(now).await.expect("purge"), 1);
        assert!(store.find_refresh_token("old").await.expect("find").is_none());
        assert!(store.find_refresh_token("fresh").await.expect("find").is_some());
    }
}
