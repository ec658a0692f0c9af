/// Access Token Middleware
///
/// Authenticates every request in a scope from its bearer access token and
/// injects the caller into request extensions for use by route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::authenticate_request;
use crate::configuration::AuthSettings;
use crate::error::AppError;

/// The caller of an authenticated request.
///
/// Handlers read it with `web::ReqData<AuthenticatedUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Middleware for protecting routes
///
/// Rejects with a 401 before the inner service runs when the access token is
/// missing, malformed, forged or expired. The refresh token store is never
/// consulted.
pub struct JwtMiddleware {
    settings: Rc<AuthSettings>,
}

impl JwtMiddleware {
    pub fn new(settings: AuthSettings) -> Self {
        Self {
            settings: Rc::new(settings),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            settings: self.settings.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    settings: Rc<AuthSettings>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate_request(req.headers(), &self.settings) {
            Ok(user_id) => {
                req.extensions_mut().insert(AuthenticatedUser { user_id });
                tracing::debug!(user_id = %user_id, path = %req.path(), "Access token validated");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                if let AppError::Auth(kind) = &e {
                    tracing::warn!(reason = ?kind, path = %req.path(), "Access token rejected");
                }
                let err: Error = e.into();
                Box::pin(async move { Err::<ServiceResponse<B>, Error>(err) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_access_token;
    use actix_web::{http::header, test, web, App, HttpResponse};

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    async fn whoami(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    #[actix_web::test]
    async fn test_valid_token_reaches_handler() {
        let settings = AuthSettings::with_secret(SECRET);
        let app = test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(settings.clone()))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let user_id = Uuid::new_v4();
        let token = generate_access_token(
            &user_id,
            settings.secret.as_bytes(),
            &settings.issuer,
            chrono::Duration::minutes(5),
        )
        .expect("mint");

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;

        assert_eq!(body, user_id.to_string().as_bytes());
    }

    #[actix_web::test]
    async fn test_rejections_are_401() {
        let settings = AuthSettings::with_secret(SECRET);
        let app = test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(settings))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let forged = generate_access_token(
            &Uuid::new_v4(),
            b"some-other-secret",
            "chirpy",
            chrono::Duration::minutes(5),
        )
        .expect("mint");

        let cases = vec![
            (None, "missing header"),
            (Some("Token abc".to_string()), "wrong scheme"),
            (Some("Bearer not-a-jwt".to_string()), "malformed token"),
            (Some(format!("Bearer {}", forged)), "wrong secret"),
        ];

        for (value, reason) in cases {
            let mut req = test::TestRequest::get().uri("/api/me");
            if let Some(value) = value {
                req = req.insert_header((header::AUTHORIZATION, value));
            }
            let resp = test::try_call_service(&app, req.to_request()).await;
            let status = match resp {
                Ok(resp) => resp.status(),
                Err(err) => err.as_response_error().status_code(),
            };
            assert_eq!(status.as_u16(), 401, "{} should be rejected", reason);
        }
    }
}
