//! Credential and token core for the Chirpy API: bcrypt password checks,
//! HS256 access tokens, and server-side refresh tokens with soft revocation.

pub mod auth;
pub mod configuration;
pub mod error;
pub mod middleware;
pub mod models;
pub mod store;
pub mod telemetry;

pub use auth::AuthService;
pub use error::{AppError, AuthError};
