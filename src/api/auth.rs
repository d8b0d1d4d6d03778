// Client token authentication for API endpoints

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::api::error::ApiError;

/// Paths that require a client token; everything else is public.
const PROTECTED_PATHS: &[&str] = &["/api/add_item"];

const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Identity of the client that made the request (the token `sub`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for ClientId {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<ClientId>()
                .cloned()
                .ok_or(ApiError::Unauthorized),
        )
    }
}

/// Verifies HS256 client tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Option<ClientId> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) if !data.claims.sub.trim().is_empty() => Some(ClientId(data.claims.sub)),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "rejected client token");
                None
            }
        }
    }

    /// Bearer header first, then the `token` cookie.
    fn client_for(&self, req: &ServiceRequest) -> Option<ClientId> {
        let bearer = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string());
        let token = bearer.or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string()))?;
        self.verify(&token)
    }
}

/// Authentication middleware that resolves the client identity on protected paths
pub struct Auth {
    verifier: TokenVerifier,
}

impl Auth {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Auth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service,
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    verifier: TokenVerifier,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let protected = PROTECTED_PATHS.contains(&req.path()) && req.method() != Method::OPTIONS;

        if protected {
            match self.verifier.client_for(&req) {
                Some(client) => {
                    tracing::debug!(client_id = %client.as_str(), path = req.path(), "client authenticated");
                    req.extensions_mut().insert(client);
                }
                None => {
                    tracing::warn!(path = req.path(), "unauthorized request");
                    return Box::pin(async move {
                        let response = ApiError::Unauthorized
                            .error_response()
                            .map_into_right_body();
                        Ok(req.into_response(response))
                    });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
