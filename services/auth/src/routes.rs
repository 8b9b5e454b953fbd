//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use common::{
    error::DatabaseError,
    models::{NewUser, User, UserChanges},
};

use crate::{
    AuthState,
    error::{AuthError, AuthJson, AuthResult},
    identity::ExternalIdentity,
    middleware::{AuthUser, auth_middleware},
    password::{hash_password, verify_password},
    validation::{sanitize_username, validate_login, validate_signup},
};

/// Request for user signup
#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request for Google sign-in
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthRequest {
    pub id_token: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

/// Request for token refresh
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

/// Create the router for the authentication service
pub fn create_router(state: AuthState) -> Router {
    let protected_routes = Router::new()
        .route("/profile", get(profile))
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/google", post(google_auth))
        .route("/refresh-token", post(refresh_token))
        .merge(protected_routes)
        .with_state(state)
}

fn session_body(state: &AuthState, message: &str, user: &User) -> AuthResult<serde_json::Value> {
    let pair = state.jwt_service.issue_pair(user.id)?;

    Ok(json!({
        "success": true,
        "message": message,
        "data": {
            "user": user,
            "token": pair.token,
            "refreshToken": pair.refresh_token,
        }
    }))
}

/// User signup endpoint
pub async fn signup(
    State(state): State<AuthState>,
    AuthJson(payload): AuthJson<SignupRequest>,
) -> AuthResult<impl IntoResponse> {
    let errors = validate_signup(
        payload.username.as_deref(),
        payload.email.as_deref(),
        payload.password.as_deref(),
    );
    if !errors.is_empty() {
        return Err(AuthError::Validation(errors));
    }

    let username = payload.username.unwrap_or_default().trim().to_string();
    let email = payload.email.unwrap_or_default().trim().to_string();
    let password = payload.password.unwrap_or_default();

    info!("Signup attempt for user: {}", username);

    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(AuthError::bad_request("User with this email already exists"));
    }
    if state.users.find_user_by_username(&username).await?.is_some() {
        return Err(AuthError::bad_request("Username is already taken"));
    }

    let password_hash =
        hash_password(&password).map_err(|e| AuthError::Internal(e.to_string()))?;

    let user = state
        .users
        .create_user(&NewUser {
            username,
            email,
            password_hash: Some(password_hash),
            ..Default::default()
        })
        .await
        .map_err(|e| match e {
            DatabaseError::Conflict(constraint) if constraint.contains("email") => {
                AuthError::bad_request("User with this email already exists")
            }
            DatabaseError::Conflict(_) => AuthError::bad_request("Username is already taken"),
            other => other.into(),
        })?;

    info!("Created user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(session_body(&state, "User created successfully", &user)?),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AuthState>,
    AuthJson(payload): AuthJson<LoginRequest>,
) -> AuthResult<impl IntoResponse> {
    let errors = validate_login(payload.email.as_deref(), payload.password.as_deref());
    if !errors.is_empty() {
        return Err(AuthError::Validation(errors));
    }

    let email = payload.email.unwrap_or_default().trim().to_string();
    let password = payload.password.unwrap_or_default();

    info!("Login attempt for: {}", email);

    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .filter(|user| {
            user.password_hash
                .as_deref()
                .is_some_and(|hash| verify_password(&password, hash))
        })
        .ok_or_else(|| AuthError::unauthorized("Invalid email or password"))?;

    Ok(Json(session_body(&state, "Login successful", &user)?))
}

/// Google sign-in endpoint
pub async fn google_auth(
    State(state): State<AuthState>,
    AuthJson(payload): AuthJson<GoogleAuthRequest>,
) -> AuthResult<impl IntoResponse> {
    let id_token = payload
        .id_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::bad_request("Google ID token is required"))?;

    let identity = state.identity_verifier.verify(id_token).await?;
    info!("Google identity verified for {}", identity.email);

    let user = find_or_create_google_user(&state, &identity, &payload).await?;

    Ok(Json(session_body(
        &state,
        "Google authentication successful",
        &user,
    )?))
}

async fn find_or_create_google_user(
    state: &AuthState,
    identity: &ExternalIdentity,
    payload: &GoogleAuthRequest,
) -> AuthResult<User> {
    let existing = match state.users.find_user_by_email(&identity.email).await? {
        Some(user) => Some(user),
        None => {
            state
                .users
                .find_user_by_google_id(&identity.external_id)
                .await?
        }
    };

    if let Some(user) = existing {
        if user.google_id.is_some() {
            return Ok(user);
        }

        info!("Linking Google account to existing user {}", user.id);
        let changes = UserChanges {
            google_id: Some(identity.external_id.clone()),
            avatar: user
                .avatar
                .is_none()
                .then(|| identity.avatar.clone())
                .flatten(),
            is_email_verified: Some(true),
            ..Default::default()
        };
        return state
            .users
            .update_user(user.id, &changes)
            .await?
            .ok_or_else(|| AuthError::Internal("user vanished while linking".to_string()));
    }

    let requested = payload
        .username
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .or(identity.display_name.as_deref())
        .unwrap_or_else(|| identity.email.split('@').next().unwrap_or_default());
    let username = available_username(state, &sanitize_username(requested)).await?;

    let user = state
        .users
        .create_user(&NewUser {
            username,
            email: identity.email.clone(),
            password_hash: None,
            google_id: Some(identity.external_id.clone()),
            avatar: payload.avatar.clone().or_else(|| identity.avatar.clone()),
        })
        .await?;
    info!("Created user {} from Google sign-in", user.id);

    let verified = UserChanges {
        is_email_verified: Some(true),
        ..Default::default()
    };
    Ok(state.users.update_user(user.id, &verified).await?.unwrap_or(user))
}

/// First free username derived from `base` by appending a numeric suffix
async fn available_username(state: &AuthState, base: &str) -> AuthResult<String> {
    if state.users.find_user_by_username(base).await?.is_none() {
        return Ok(base.to_string());
    }

    for suffix in 1..1000u32 {
        let suffix = suffix.to_string();
        let stem: String = base.chars().take(30 - suffix.len()).collect();
        let candidate = format!("{}{}", stem, suffix);

        if state.users.find_user_by_username(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }

    warn!("No free username derived from {}", base);
    Err(AuthError::bad_request("Username is already taken"))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AuthState>,
    AuthJson(payload): AuthJson<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let token = payload
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::bad_request("Refresh token is required"))?;

    let claims = state
        .jwt_service
        .validate_refresh_token(token)
        .map_err(|_| AuthError::unauthorized("Invalid refresh token"))?;

    let user = state
        .users
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| AuthError::unauthorized("Invalid refresh token"))?;

    let pair = state.jwt_service.issue_pair(user.id)?;

    Ok(Json(json!({
        "success": true,
        "message": "Tokens refreshed successfully",
        "data": {
            "token": pair.token,
            "refreshToken": pair.refresh_token,
        }
    })))
}

/// Current user profile
pub async fn profile(Extension(AuthUser(user)): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Profile retrieved successfully",
        "data": { "user": user }
    }))
}

/// Logout endpoint; tokens stay valid until they expire
pub async fn logout(Extension(AuthUser(user)): Extension<AuthUser>) -> impl IntoResponse {
    info!("User {} logged out", user.id);

    Json(json!({
        "success": true,
        "message": "Logged out successfully"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{auth_state_with, seed_user, serve, StaticVerifier};
    use common::store::UserStore;
    use serde_json::Value;

    async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(format!("{}{}", base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn signup_then_login_then_profile() {
        let (state, _) = auth_state_with(StaticVerifier::rejecting());
        let base = serve(create_router(state)).await;

        let (status, body) = post(
            &base,
            "/signup",
            json!({"username": "ada", "email": "ada@example.com", "password": "Secret123"}),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user"]["username"], "ada");
        assert!(body["data"]["user"].get("passwordHash").is_none());

        let (status, body) = post(
            &base,
            "/login",
            json!({"email": "ada@example.com", "password": "Secret123"}),
        )
        .await;
        assert_eq!(status, 200);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let response = reqwest::Client::new()
            .get(format!("{}/profile", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["data"]["user"]["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn signup_reports_every_validation_error() {
        let (state, _) = auth_state_with(StaticVerifier::rejecting());
        let base = serve(create_router(state)).await;

        let (status, body) = post(
            &base,
            "/signup",
            json!({"username": "a", "email": "bad", "password": "weak"}),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn malformed_bodies_get_the_error_envelope() {
        let (state, _) = auth_state_with(StaticVerifier::rejecting());
        let base = serve(create_router(state)).await;

        let (status, body) = post(&base, "/signup", json!({"username": 1})).await;
        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));

        let response = reqwest::Client::new()
            .post(format!("{}/login", base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);

        let response = reqwest::Client::new()
            .post(format!("{}/refresh-token", base))
            .body("refreshToken=abc")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn signup_rejects_duplicates() {
        let (state, store) = auth_state_with(StaticVerifier::rejecting());
        seed_user(&store, "ada").await;
        let base = serve(create_router(state)).await;

        let (status, body) = post(
            &base,
            "/signup",
            json!({"username": "other", "email": "ada@example.com", "password": "Secret123"}),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["message"], "User with this email already exists");

        let (status, body) = post(
            &base,
            "/signup",
            json!({"username": "ada", "email": "new@example.com", "password": "Secret123"}),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["message"], "Username is already taken");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let (state, _) = auth_state_with(StaticVerifier::rejecting());
        let base = serve(create_router(state)).await;

        post(
            &base,
            "/signup",
            json!({"username": "ada", "email": "ada@example.com", "password": "Secret123"}),
        )
        .await;

        let (status, body) = post(
            &base,
            "/login",
            json!({"email": "ada@example.com", "password": "Wrong1234"}),
        )
        .await;
        assert_eq!(status, 401);
        assert_eq!(body["message"], "Invalid email or password");

        let (status, _) = post(
            &base,
            "/login",
            json!({"email": "nobody@example.com", "password": "Secret123"}),
        )
        .await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn refresh_token_issues_new_pair() {
        let (state, store) = auth_state_with(StaticVerifier::rejecting());
        let user = seed_user(&store, "ada").await;
        let pair = state.jwt_service.issue_pair(user.id).unwrap();
        let base = serve(create_router(state)).await;

        let (status, body) = post(
            &base,
            "/refresh-token",
            json!({"refreshToken": pair.refresh_token}),
        )
        .await;
        assert_eq!(status, 200);
        assert!(body["data"]["token"].is_string());
        assert!(body["data"]["refreshToken"].is_string());

        let (status, _) = post(&base, "/refresh-token", json!({"refreshToken": pair.token})).await;
        assert_eq!(status, 401);

        let (status, _) = post(&base, "/refresh-token", json!({})).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let (state, _) = auth_state_with(StaticVerifier::rejecting());
        let base = serve(create_router(state)).await;

        let response = reqwest::Client::new()
            .post(format!("{}/logout", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn google_sign_in_creates_then_reuses_user() {
        let identity = ExternalIdentity {
            external_id: "google-1".to_string(),
            email: "grace@example.com".to_string(),
            display_name: Some("Grace Hopper".to_string()),
            avatar: Some("https://example.com/g.png".to_string()),
        };
        let (state, store) = auth_state_with(StaticVerifier::accepting(identity));
        let base = serve(create_router(state)).await;

        let (status, _) = post(&base, "/google", json!({})).await;
        assert_eq!(status, 400);

        let (status, body) = post(&base, "/google", json!({"idToken": "x".repeat(150)})).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["user"]["username"], "Grace_Hopper");
        assert_eq!(body["data"]["user"]["isEmailVerified"], true);

        let (status, second) = post(&base, "/google", json!({"idToken": "x".repeat(150)})).await;
        assert_eq!(status, 200);
        assert_eq!(second["data"]["user"]["id"], body["data"]["user"]["id"]);

        let stored = store.find_user_by_google_id("google-1").await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn google_sign_in_links_existing_account() {
        let identity = ExternalIdentity {
            external_id: "google-ada".to_string(),
            email: "ada@example.com".to_string(),
            display_name: None,
            avatar: None,
        };
        let (state, store) = auth_state_with(StaticVerifier::accepting(identity));
        let ada = seed_user(&store, "ada").await;
        let base = serve(create_router(state)).await;

        let (status, body) = post(&base, "/google", json!({"idToken": "x".repeat(150)})).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["user"]["id"], ada.id.to_string());
        assert_eq!(body["data"]["user"]["googleId"], "google-ada");
    }

    #[tokio::test]
    async fn google_sign_in_deduplicates_username() {
        let identity = ExternalIdentity {
            external_id: "google-2".to_string(),
            email: "ada.two@example.com".to_string(),
            display_name: None,
            avatar: None,
        };
        let (state, store) = auth_state_with(StaticVerifier::accepting(identity));
        seed_user(&store, "ada").await;
        let base = serve(create_router(state)).await;

        let (status, body) = post(
            &base,
            "/google",
            json!({"idToken": "x".repeat(150), "username": "ada"}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["user"]["username"], "ada1");
    }

    #[tokio::test]
    async fn google_verification_failure_is_unauthorized() {
        let (state, _) = auth_state_with(StaticVerifier::rejecting());
        let base = serve(create_router(state)).await;

        let (status, body) = post(&base, "/google", json!({"idToken": "x".repeat(150)})).await;
        assert_eq!(status, 401);
        assert_eq!(body["message"], "Invalid Google token");
    }
}
