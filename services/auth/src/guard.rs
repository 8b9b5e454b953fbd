//! Credential resolution and ownership checks

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use common::models::User;

use crate::{AuthState, error::AuthError};

/// Authenticated caller is not allowed to touch the resource
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("User {actor} does not own resource owned by {owner}")]
pub struct AccessDenied {
    pub actor: Uuid,
    pub owner: Uuid,
}

/// Resolve a bearer credential to an existing user
///
/// Fails when the credential is absent, is not a valid access token, or
/// names a user that no longer exists.
pub async fn authenticate(state: &AuthState, credential: Option<&str>) -> Result<User, AuthError> {
    let Some(token) = credential.filter(|t| !t.is_empty()) else {
        return Err(AuthError::unauthorized(
            "No token provided, authorization denied",
        ));
    };

    let claims = state.jwt_service.validate_access_token(token).map_err(|e| {
        debug!("Rejected access token: {}", e);
        AuthError::unauthorized("Token is not valid")
    })?;

    state
        .users
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| AuthError::unauthorized("Token is not valid"))
}

/// Like [`authenticate`], but any failure yields no identity
pub async fn authenticate_optional(state: &AuthState, credential: Option<&str>) -> Option<User> {
    credential?;
    authenticate(state, credential).await.ok()
}

/// Check that `actor` owns a resource belonging to `owner`
pub fn ensure_owner(actor: &User, owner: Uuid) -> Result<(), AccessDenied> {
    if actor.id == owner {
        Ok(())
    } else {
        Err(AccessDenied {
            actor: actor.id,
            owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{auth_state, seed_user};

    #[tokio::test]
    async fn missing_credential_is_unauthorized() {
        let (state, _) = auth_state();

        let err = authenticate(&state, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(m) if m.contains("No token")));
        assert!(authenticate(&state, Some("")).await.is_err());
    }

    #[tokio::test]
    async fn valid_token_resolves_user() {
        let (state, store) = auth_state();
        let user = seed_user(&store, "ada").await;
        let token = state.jwt_service.generate_access_token(user.id).unwrap();

        let resolved = authenticate(&state, Some(&token)).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(
            authenticate_optional(&state, Some(&token)).await.map(|u| u.id),
            Some(user.id)
        );
    }

    #[tokio::test]
    async fn token_for_missing_user_is_unauthorized() {
        let (state, _) = auth_state();
        let token = state
            .jwt_service
            .generate_access_token(Uuid::new_v4())
            .unwrap();

        assert!(matches!(
            authenticate(&state, Some(&token)).await,
            Err(AuthError::Unauthorized(_))
        ));
        assert!(authenticate_optional(&state, Some(&token)).await.is_none());
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_credential() {
        let (state, store) = auth_state();
        let user = seed_user(&store, "ada").await;
        let refresh = state.jwt_service.generate_refresh_token(user.id).unwrap();

        assert!(authenticate(&state, Some(&refresh)).await.is_err());
    }

    #[tokio::test]
    async fn optional_without_credential_is_anonymous() {
        let (state, _) = auth_state();

        assert!(authenticate_optional(&state, None).await.is_none());
        assert!(authenticate_optional(&state, Some("garbage")).await.is_none());
    }

    #[tokio::test]
    async fn ownership_is_enforced() {
        let (_, store) = auth_state();
        let ada = seed_user(&store, "ada").await;
        let grace = seed_user(&store, "grace").await;

        assert!(ensure_owner(&ada, ada.id).is_ok());
        assert_eq!(
            ensure_owner(&grace, ada.id),
            Err(AccessDenied {
                actor: grace.id,
                owner: ada.id
            })
        );
    }
}
