/// Middleware module
///
/// Guards that put the auth core in front of actix-web scopes.

mod jwt_middleware;

pub use jwt_middleware::{AuthenticatedUser, JwtMiddleware};
