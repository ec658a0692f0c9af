/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 random bytes from the OS-seeded CSPRNG, hex encoded
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Soft-revoked, so a reused revoked token is reported as revoked, not unknown

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, AuthError};
use crate::models::{RefreshTokenRecord, RefreshTokenState, RevokeOutcome};
use crate::store::RefreshTokenStore;

const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a new opaque refresh token.
///
/// The token is returned in plaintext (this is what the client stores).
/// The server stores only the SHA-256 hash.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest used as the storage key.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create and persist a refresh token for `user_id`, expiring `ttl` after `now`.
///
/// # Errors
/// Returns a database error if the insert fails
pub async fn save_refresh_token<S>(
    store: &S,
    user_id: Uuid,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AppError>
where
    S: RefreshTokenStore + ?Sized,
{
    let token = generate_refresh_token();
    let record = RefreshTokenRecord::new(hash_token(&token), user_id, now, ttl);
    store.create_refresh_token(&record).await?;

    tracing::debug!(user_id = %user_id, expires_at = %record.expires_at, "Refresh token stored");
    Ok(token)
}

/// Resolve a refresh token to its owner.
///
/// Checks, in order:
/// 1. Token exists
/// 2. Token has not been revoked
/// 3. Token has not expired
///
/// # Errors
/// `TokenNotFound`, `TokenRevoked` or `TokenExpired`, or a database error
pub async fn validate_refresh_token<S>(
    store: &S,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, AppError>
where
    S: RefreshTokenStore + ?Sized,
{
    let record = store
        .find_refresh_token(&hash_token(token))
        .await?
        .ok_or_else(|| {
            tracing::warn!("Refresh token not found");
            AuthError::TokenNotFound
        })?;

    match record.state() {
        RefreshTokenState::Revoked { at } => {
            tracing::warn!(user_id = %record.user_id, revoked_at = %at, "Attempt to use revoked refresh token");
            Err(AuthError::TokenRevoked.into())
        }
        RefreshTokenState::Active { expires_at } if expires_at <= now => {
            tracing::info!(user_id = %record.user_id, "Refresh token expired");
            Err(AuthError::TokenExpired.into())
        }
        RefreshTokenState::Active { .. } => Ok(record.user_id),
    }
}

/// Revoke a refresh token.
///
/// Revoking an already revoked token succeeds and leaves its original
/// revocation time untouched.
///
/// # Errors
/// `TokenNotFound` if no such token was ever issued, or a database error
pub async fn revoke_refresh_token<S>(
    store: &S,
    token: &str,
    now: DateTime<Utc>,
) -> Result<RevokeOutcome, AppError>
where
    S: RefreshTokenStore + ?Sized,
{
    match store.revoke_refresh_token(&hash_token(token), now).await? {
        RevokeOutcome::NotFound => Err(AuthError::TokenNotFound.into()),
        outcome => Ok(outcome),
    }
}

/// Revoke all refresh tokens for a user
///
/// Useful for logout-all-devices functionality.
pub async fn revoke_all_user_tokens<S>(
    store: &S,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<u64, AppError>
where
    S: RefreshTokenStore + ?Sized,
{
    let revoked = store.revoke_all_for_user(user_id, now).await?;
    tracing::info!(user_id = %user_id, revoked, "All refresh tokens revoked for user");
    Ok(revoked)
}
