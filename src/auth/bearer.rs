/// Bearer Token Extraction
///
/// Reads the presented credential out of the `Authorization` header.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the token out of an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-sensitively with exactly one space; the rest is
/// trimmed.
///
/// # Errors
/// - `MissingAuthHeader` when there is no `Authorization` header
/// - `MalformedAuthHeader` for any other scheme, a non-text value, or an empty token
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedAuthHeader)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedAuthHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedAuthHeader);
    }

    Ok(token.to_string())
}
