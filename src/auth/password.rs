/// Password Hashing and Verification
///
/// bcrypt with a per-call random salt. The cost is a parameter so tests can
/// run at the minimum cost while production uses the configured one.

use bcrypt::{hash, verify};

use crate::error::{AppError, AuthError};

/// Lowest cost bcrypt accepts. Only meant for tests.
pub const MIN_COST: u32 = 4;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns an internal error if `cost` is out of range or hashing fails
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(AppError::from)
}

/// Verify a password against a stored hash.
///
/// A stored hash that bcrypt cannot parse is treated as a mismatch, so callers
/// cannot tell a corrupt record from a wrong password.
///
/// # Errors
/// Returns `CredentialMismatch` on any failure
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    match verify(password, password_hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::CredentialMismatch),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            Err(AuthError::CredentialMismatch)
        }
    }
}
