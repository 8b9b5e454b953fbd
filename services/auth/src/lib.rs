//! Authentication and access control for the Launchit services
//!
//! Issues and verifies bearer tokens, verifies Google identities, guards
//! routes, and serves the `/auth/*` endpoints.

use std::sync::Arc;

use common::store::UserStore;

pub mod error;
pub mod guard;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod routes;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use error::AuthError;
pub use guard::{AccessDenied, ensure_owner};
pub use middleware::{AuthUser, auth_middleware, optional_auth_middleware};
pub use routes::create_router;

use identity::IdentityVerifier;
use jwt::JwtService;

/// State shared by the auth routes and middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt_service: JwtService,
    pub users: Arc<dyn UserStore>,
    pub identity_verifier: Arc<dyn IdentityVerifier>,
}

impl AuthState {
    pub fn new(
        jwt_service: JwtService,
        users: Arc<dyn UserStore>,
        identity_verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            jwt_service,
            users,
            identity_verifier,
        }
    }
}
