mod auth;
mod refresh_token;
mod user;

pub use auth::{LoginRequest, LoginResponse, RefreshResponse, RegisterRequest};
pub use refresh_token::{RefreshTokenRecord, RefreshTokenState, RevokeOutcome};
pub use user::{User, UserProfile};
