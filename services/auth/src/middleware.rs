//! Middleware for bearer token authentication

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;

use common::models::User;

use crate::{
    AuthState,
    guard::{authenticate, authenticate_optional},
};

/// The authenticated caller, placed in request extensions
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn bearer_token(req: &Request<Body>) -> Option<String> {
    req.headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Reject the request unless it carries a valid bearer token for an existing user
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = bearer_token(&req);

    match authenticate(&state, token.as_deref()).await {
        Ok(user) => {
            req.extensions_mut().insert(AuthUser(user));
            next.run(req).await
        }
        Err(err) => {
            debug!("Authentication failed for {}: {}", req.uri(), err);
            err.into_response()
        }
    }
}

/// Attach the caller when a valid bearer token is present; never rejects
pub async fn optional_auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = bearer_token(&req);

    if let Some(user) = authenticate_optional(&state, token.as_deref()).await {
        req.extensions_mut().insert(AuthUser(user));
    }

    next.run(req).await
}
