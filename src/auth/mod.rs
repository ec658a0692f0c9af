/// Authentication module
///
/// Password hashing, access token minting/validation, refresh token
/// lifecycle, bearer header parsing, and the service that composes them.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use bearer::extract_bearer_token;
pub use claims::Claims;
pub use jwt::{
    capped_ttl, generate_access_token, generate_access_token_at, validate_access_token,
    validate_access_token_at, MAX_ACCESS_TOKEN_TTL_SECONDS,
};
pub use password::{hash_password, verify_password, MIN_COST};
pub use refresh_token::{
    generate_refresh_token, hash_token, revoke_all_user_tokens, revoke_refresh_token,
    save_refresh_token, validate_refresh_token,
};
pub use service::{authenticate_request, AuthService};
