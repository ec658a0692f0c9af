/// Access Token Generation and Validation
///
/// Access tokens are HS256 JWTs. They are stateless: nothing is stored and
/// nothing can revoke one early, so their lifetime is capped at one hour.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::error::{AppError, AuthError};

/// Upper bound, and default, for an access token's lifetime.
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 60 * 60;

/// Lifetime actually used for a requested `ttl`.
///
/// Non-positive or over-long requests fall back to the one hour maximum.
pub fn capped_ttl(requested: Duration) -> Duration {
    let max = Duration::seconds(MAX_ACCESS_TOKEN_TTL_SECONDS);
    if requested <= Duration::zero() || requested > max {
        max
    } else {
        requested
    }
}

/// Mint an access token for `user_id`, valid for `ttl` (capped) from now.
///
/// # Errors
/// Returns an internal error if signing fails
pub fn generate_access_token(
    user_id: &Uuid,
    secret: &[u8],
    issuer: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    generate_access_token_at(user_id, secret, issuer, ttl, Utc::now())
}

pub fn generate_access_token_at(
    user_id: &Uuid,
    secret: &[u8],
    issuer: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = Claims::new(*user_id, issuer, now, capped_ttl(ttl));

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return the user it was issued to.
///
/// Checks run in a fixed order: structure, then signature, then expiry.
///
/// # Errors
/// - `TokenMalformed` if the token cannot be parsed or was not issued by `issuer`
/// - `InvalidSignature` if it was signed with another secret or tampered with
/// - `TokenExpired` once its `exp` is not in the future
pub fn validate_access_token(token: &str, secret: &[u8], issuer: &str) -> Result<Uuid, AuthError> {
    validate_access_token_at(token, secret, issuer, Utc::now())
}

pub fn validate_access_token_at(
    token: &str,
    secret: &[u8],
    issuer: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked below against `now`, with no leeway.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_issuer(&[issuer]);

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            let kind = classify(&e);
            tracing::debug!(error = %e, ?kind, "Access token rejected");
            kind
        })?;

    if claims.is_expired_at(now) {
        return Err(AuthError::TokenExpired);
    }

    claims.user_id()
}

fn classify(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenMalformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-characters-long";
    const ISSUER: &str = "chirpy";

    #[test]
    fn test_generate_and_validate_token() {
        let user_id = Uuid::new_v4();

        let token = generate_access_token(&user_id, SECRET, ISSUER, Duration::minutes(5))
            .expect("Failed to generate token");
        let validated = validate_access_token(&token, SECRET, ISSUER).expect("Failed to validate token");

        assert_eq!(validated, user_id);
    }

    #[test]
    fn test_ttl_is_capped() {
        let hour = Duration::seconds(MAX_ACCESS_TOKEN_TTL_SECONDS);
        assert_eq!(capped_ttl(Duration::zero()), hour);
        assert_eq!(capped_ttl(Duration::seconds(-5)), hour);
        assert_eq!(capped_ttl(Duration::hours(24)), hour);
        assert_eq!(capped_ttl(Duration::minutes(15)), Duration::minutes(15));
        assert_eq!(capped_ttl(hour), hour);
    }

    #[test]
    fn test_over_long_ttl_expires_after_one_hour() {
        let user_id = Uuid::new_v4();
        let issued = Utc::now();
        let token = generate_access_token_at(&user_id, SECRET, ISSUER, Duration::days(7), issued)
            .expect("Failed to generate token");

        let just_before = issued + Duration::seconds(MAX_ACCESS_TOKEN_TTL_SECONDS - 1);
        let at_expiry = issued + Duration::seconds(MAX_ACCESS_TOKEN_TTL_SECONDS);
        assert_eq!(validate_access_token_at(&token, SECRET, ISSUER, just_before), Ok(user_id));
        assert_eq!(
            validate_access_token_at(&token, SECRET, ISSUER, at_expiry),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_expired_token() {
        let user_id = Uuid::new_v4();
        let issued = Utc::now() - Duration::hours(2);
        let token = generate_access_token_at(&user_id, SECRET, ISSUER, Duration::minutes(10), issued)
            .expect("Failed to generate token");

        assert_eq!(
            validate_access_token(&token, SECRET, ISSUER),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let user_id = Uuid::new_v4();
        let token = generate_access_token(&user_id, SECRET, ISSUER, Duration::minutes(5))
            .expect("Failed to generate token");

        assert_eq!(
            validate_access_token(&token, b"another-secret", ISSUER),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_token_with_wrong_secret_reports_signature() {
        let issued = Utc::now() - Duration::hours(2);
        let token = generate_access_token_at(&Uuid::new_v4(), SECRET, ISSUER, Duration::minutes(1), issued)
            .expect("Failed to generate token");

        assert_eq!(
            validate_access_token(&token, b"another-secret", ISSUER),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload() {
        let token = generate_access_token(&Uuid::new_v4(), SECRET, ISSUER, Duration::minutes(5))
            .expect("Failed to generate token");
        let other = generate_access_token(&Uuid::new_v4(), SECRET, ISSUER, Duration::minutes(5))
            .expect("Failed to generate token");

        // Splice the other token's payload under this token's signature.
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(
            validate_access_token(&tampered, SECRET, ISSUER),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_token() {
        for garbage in ["", "invalid", "invalid.token", "a.b.c", "!!!.???.###"] {
            assert_eq!(
                validate_access_token(garbage, SECRET, ISSUER),
                Err(AuthError::TokenMalformed),
                "token {:?} should be malformed",
                garbage
            );
        }
    }

    #[test]
    fn test_wrong_issuer() {
        let token = generate_access_token(&Uuid::new_v4(), SECRET, "someone-else", Duration::minutes(5))
            .expect("Failed to generate token");

        assert_eq!(
            validate_access_token(&token, SECRET, ISSUER),
            Err(AuthError::TokenMalformed)
        );
    }
}
