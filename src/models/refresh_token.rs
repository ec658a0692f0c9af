use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A persisted refresh token.
///
/// Only the SHA-256 digest of the token is kept. Rows are never updated except
/// to set `revoked_at` once, and revoked rows stay so reuse can be detected.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Lifecycle view over the nullable `revoked_at` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active { expires_at: DateTime<Utc> },
    Revoked { at: DateTime<Utc> },
}

impl RefreshTokenRecord {
    pub fn new(token_hash: String, user_id: Uuid, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            token_hash,
            user_id,
            created_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        }
    }

    pub fn state(&self) -> RefreshTokenState {
        match self.revoked_at {
            Some(at) => RefreshTokenState::Revoked { at },
            None => RefreshTokenState::Active {
                expires_at: self.expires_at,
            },
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// What a revoke call did to the matching row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    /// Already revoked; the original `revoked_at` is kept.
    AlreadyRevoked,
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_created_plus_ttl() {
        let now = Utc::now();
        let record = RefreshTokenRecord::new("hash".into(), Uuid::new_v4(), now, chrono::Duration::days(60));

        assert_eq!(record.expires_at - record.created_at, chrono::Duration::days(60));
        assert_eq!(record.state(), RefreshTokenState::Active { expires_at: record.expires_at });
        assert!(!record.is_expired_at(now));
        assert!(record.is_expired_at(record.expires_at));
    }

    #[test]
    fn test_revoked_state() {
        let now = Utc::now();
        let mut record = RefreshTokenRecord::new("hash".into(), Uuid::new_v4(), now, chrono::Duration::days(60));
        record.revoked_at = Some(now);

        assert_eq!(record.state(), RefreshTokenState::Revoked { at: now });
    }
}
