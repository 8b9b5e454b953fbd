use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use common::{
    models::{NewUser, User},
    store::{MemoryRecordStore, UserStore},
};

use crate::{
    AuthState,
    identity::{ExternalIdentity, IdentityError, IdentityVerifier},
    jwt::{JwtConfig, JwtService},
    password::hash_password,
};

/// Verifier answering every token with the same outcome
pub struct StaticVerifier(Option<ExternalIdentity>);

impl StaticVerifier {
    pub fn accepting(identity: ExternalIdentity) -> Self {
        Self(Some(identity))
    }

    pub fn rejecting() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, _id_token: &str) -> Result<ExternalIdentity, IdentityError> {
        self.0
            .clone()
            .ok_or_else(|| IdentityError::InvalidCredential("rejected".to_string()))
    }
}

pub fn auth_state_with(verifier: StaticVerifier) -> (AuthState, Arc<MemoryRecordStore>) {
    let store = Arc::new(MemoryRecordStore::new());
    let jwt = JwtService::new(JwtConfig {
        secret: "test-access".to_string(),
        refresh_secret: "test-refresh".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 7200,
    })
    .unwrap();

    let state = AuthState::new(jwt, store.clone(), Arc::new(verifier));
    (state, store)
}

pub fn auth_state() -> (AuthState, Arc<MemoryRecordStore>) {
    auth_state_with(StaticVerifier::rejecting())
}

pub async fn seed_user(store: &MemoryRecordStore, username: &str) -> User {
    store
        .create_user(&NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: Some(hash_password("Secret123").unwrap()),
            ..Default::default()
        })
        .await
        .unwrap()
}

/// Serve `router` on an ephemeral port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}
