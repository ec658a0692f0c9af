/// Authentication orchestration
///
/// Ties the hasher, the access token codec, the refresh token store and the
/// bearer extractor together. Every credential failure leaves this module as
/// `AppError::Auth`; the specific reason is only logged.

use std::sync::Arc;

use actix_web::http::header::HeaderMap;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::bearer::extract_bearer_token;
use crate::auth::jwt::{generate_access_token, validate_access_token};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::{
    revoke_all_user_tokens, revoke_refresh_token, save_refresh_token, validate_refresh_token,
};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::models::{
    LoginRequest, LoginResponse, RefreshResponse, RegisterRequest, RevokeOutcome, UserProfile,
};
use crate::store::{with_deadline, AuthStore};

/// Resolve the user behind a request's access token. Never touches the store.
pub fn authenticate_request(headers: &HeaderMap, settings: &AuthSettings) -> Result<Uuid, AppError> {
    let token = extract_bearer_token(headers)?;
    let user_id = validate_access_token(&token, settings.secret.as_bytes(), &settings.issuer)?;
    Ok(user_id)
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    settings: AuthSettings,
    /// Verified against when the email is unknown, so both login failures
    /// pay the same bcrypt cost.
    dummy_hash: Arc<str>,
}

impl AuthService {
    /// # Errors
    /// Returns a config error if `settings` fail validation
    pub fn new(store: Arc<dyn AuthStore>, settings: AuthSettings) -> Result<Self, AppError> {
        settings.validate()?;
        let dummy_hash = hash_password(&Uuid::new_v4().to_string(), settings.hash_cost)?;
        Ok(Self {
            store,
            settings,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Create an account. The password is hashed before it reaches the store.
    ///
    /// # Errors
    /// - 409-class database error if the email is taken
    /// - internal error if hashing fails
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, AppError> {
        let context = ErrorContext::new("user_registration");

        let result = async {
            let cost = self.settings.hash_cost;
            let password = request.password;
            let password_hash = run_blocking(move || hash_password(&password, cost)).await?;

            let store = self.store.clone();
            let email = request.email;
            let user = with_deadline(self.settings.store_timeout(), async move {
                Ok::<_, AppError>(store.create_user(&email, &password_hash).await?)
            })
            .await?;

            Ok::<_, AppError>(UserProfile::from(&user))
        }
        .await;

        match &result {
            Ok(profile) => tracing::info!(
                request_id = %context.request_id,
                user_id = %profile.id,
                "User registered successfully"
            ),
            Err(e) => context.log_error(e),
        }
        result
    }

    /// Check a password and open a session.
    ///
    /// Unknown email and wrong password produce the same error after the same
    /// bcrypt work.
    ///
    /// # Errors
    /// - `AuthError::CredentialMismatch` for bad credentials
    /// - database or internal errors otherwise
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        let context = ErrorContext::new("user_login");

        let result = async {
            let store = self.store.clone();
            let email = request.email.clone();
            let user = with_deadline(self.settings.store_timeout(), async move {
                Ok::<_, AppError>(store.get_user_by_email(&email).await?)
            })
            .await?;

            let password = request.password;
            let password_hash: Arc<str> = match &user {
                Some(user) => user.password_hash.as_str().into(),
                None => self.dummy_hash.clone(),
            };
            run_blocking(move || verify_password(&password, &password_hash).map_err(AppError::from))
                .await?;
            let user = user.ok_or(AuthError::CredentialMismatch)?;

            let ttl = self.access_token_ttl(request.expires_in_seconds);
            let access_token = self.mint_access_token(&user.id, ttl)?;
            let refresh_token = self.create_refresh_token(user.id).await?;

            Ok::<_, AppError>(LoginResponse {
                user: UserProfile::from(&user),
                access_token,
                refresh_token,
            })
        }
        .await;

        match &result {
            Ok(response) => tracing::info!(
                request_id = %context.request_id,
                user_id = %response.user.id,
                "User logged in successfully"
            ),
            Err(e) => context.log_error(e),
        }
        result
    }

    /// Identify the caller from its access token. Never consults the store.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, AppError> {
        authenticate_request(headers, &self.settings).map_err(|e| {
            ErrorContext::new("authenticate").log_error(&e);
            e
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The presented refresh token stays valid unless rotation is enabled, in
    /// which case it is revoked and a replacement is returned.
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<RefreshResponse, AppError> {
        let mut context = ErrorContext::new("token_refresh");
        let mut resolved_user = None;

        let result = async {
            let token = extract_bearer_token(headers)?;

            let store = self.store.clone();
            let presented = token.clone();
            let user_id = with_deadline(self.settings.store_timeout(), async move {
                validate_refresh_token(&*store, &presented, Utc::now()).await
            })
            .await?;
            resolved_user = Some(user_id);

            let refresh_token = if self.settings.rotate_refresh_tokens {
                Some(self.rotate(&token, user_id).await?)
            } else {
                None
            };

            let access_token = self.mint_access_token(&user_id, self.settings.access_token_ttl())?;
            Ok::<_, AppError>((user_id, RefreshResponse {
                access_token,
                refresh_token,
            }))
        }
        .await;

        match result {
            Ok((user_id, response)) => {
                tracing::info!(
                    request_id = %context.request_id,
                    user_id = %user_id,
                    rotated = response.refresh_token.is_some(),
                    "Token refreshed successfully"
                );
                Ok(response)
            }
            Err(e) => {
                if let Some(user_id) = resolved_user {
                    context = context.with_user_id(user_id.to_string());
                }
                context.log_error(&e);
                Err(e)
            }
        }
    }

    /// Revoke the presented refresh token.
    ///
    /// Succeeds for already revoked and unknown tokens alike: either way the
    /// token no longer works. Only a missing or malformed header is rejected.
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let context = ErrorContext::new("token_revoke");

        let result = async {
            let token = extract_bearer_token(headers)?;

            let store = self.store.clone();
            let outcome = with_deadline(self.settings.store_timeout(), async move {
                revoke_refresh_token(&*store, &token, Utc::now()).await
            })
            .await;

            match outcome {
                Ok(RevokeOutcome::Revoked) => {
                    tracing::info!(request_id = %context.request_id, "Refresh token revoked")
                }
                Ok(_) => tracing::info!(
                    request_id = %context.request_id,
                    "Refresh token was already revoked"
                ),
                Err(AppError::Auth(AuthError::TokenNotFound)) => tracing::warn!(
                    request_id = %context.request_id,
                    "Revoke requested for unknown refresh token"
                ),
                Err(e) => return Err(e),
            }
            Ok::<_, AppError>(())
        }
        .await;

        if let Err(e) = &result {
            context.log_error(e);
        }
        result
    }

    /// Revoke every refresh token a user holds.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let store = self.store.clone();
        let result = with_deadline(self.settings.store_timeout(), async move {
            revoke_all_user_tokens(&*store, user_id, Utc::now()).await
        })
        .await;

        if let Err(e) = &result {
            ErrorContext::new("token_revoke_all")
                .with_user_id(user_id.to_string())
                .log_error(e);
        }
        result
    }

    /// Delete refresh token rows past their expiry. Optional housekeeping.
    pub async fn purge_expired_refresh_tokens(&self) -> Result<u64, AppError> {
        let store = self.store.clone();
        let purged = with_deadline(self.settings.store_timeout(), async move {
            Ok::<_, AppError>(store.delete_expired(Utc::now()).await?)
        })
        .await?;

        tracing::info!(purged, "Expired refresh tokens purged");
        Ok(purged)
    }

    /// Caller-requested lifetime, or the configured default when the request
    /// is absent, not positive, or longer than the default.
    fn access_token_ttl(&self, requested_seconds: Option<i64>) -> Duration {
        let default = self.settings.access_token_ttl();
        match requested_seconds.map(Duration::seconds) {
            Some(requested) if requested > Duration::zero() && requested <= default => requested,
            _ => default,
        }
    }

    fn mint_access_token(&self, user_id: &Uuid, ttl: Duration) -> Result<String, AppError> {
        generate_access_token(user_id, self.settings.secret.as_bytes(), &self.settings.issuer, ttl)
    }

    async fn create_refresh_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let store = self.store.clone();
        let ttl = self.settings.refresh_token_ttl();
        with_deadline(self.settings.store_timeout(), async move {
            save_refresh_token(&*store, user_id, ttl, Utc::now()).await
        })
        .await
    }

    /// Revoke `token` and issue its replacement. Losing a race against another
    /// revoke of the same token counts as presenting a revoked token.
    async fn rotate(&self, token: &str, user_id: Uuid) -> Result<String, AppError> {
        let store = self.store.clone();
        let presented = token.to_string();
        let outcome = with_deadline(self.settings.store_timeout(), async move {
            revoke_refresh_token(&*store, &presented, Utc::now()).await
        })
        .await?;

        if outcome == RevokeOutcome::AlreadyRevoked {
            return Err(AuthError::TokenRevoked.into());
        }
        self.create_refresh_token(user_id).await
    }
}

/// Run CPU-bound hashing off the async worker threads.
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}
