/// Persistence collaborators
///
/// The auth core talks to storage only through these traits. Two backends are
/// provided: `PgStore` for Postgres and `InMemoryStore` for tests and
/// single-process embedding.

mod memory;
mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, DatabaseError};
use crate::models::{RefreshTokenRecord, RevokeOutcome, User};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Emails are unique.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, DatabaseError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
}

/// Refresh token rows, keyed by token digest.
///
/// Implementations must make each call atomic per row: a `find` racing a
/// `revoke` sees the row either before or after `revoked_at` is set.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), DatabaseError>;

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Set `revoked_at = at` unless it is already set.
    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<RevokeOutcome, DatabaseError>;

    /// Revoke every active token of a user. Returns how many were revoked.
    async fn revoke_all_for_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, DatabaseError>;

    /// Physically remove rows that expired at or before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError>;
}

/// Everything the auth service needs from storage.
pub trait AuthStore: UserStore + RefreshTokenStore {}

impl<T: UserStore + RefreshTokenStore> AuthStore for T {}

/// Run a store call under a deadline. An elapsed deadline drops the pending
/// call and surfaces as `DatabaseError::Timeout`.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(elapsed) => {
            tracing::error!(deadline_ms = deadline.as_millis() as u64, "Store call timed out");
            Err(AppError::Database(DatabaseError::from(elapsed)))
        }
    }
}
