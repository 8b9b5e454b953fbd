use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use uuid::Uuid;

use auth::{
    AuthState,
    identity::{ExternalIdentity, IdentityError, IdentityVerifier},
    jwt::{JwtConfig, JwtService},
    password::hash_password,
};
use common::{
    models::{NewUser, Page, PageStatus, User},
    store::{MemoryRecordStore, UserStore},
};

use crate::{
    config::ServerConfig,
    generator::{ContentGenerator, GenerationError, GenerationRequest},
    lifecycle::PageLifecycleManager,
    routes::create_router,
    state::AppState,
};

/// Generator replaying scripted outcomes, each call waiting for a permit
pub struct ScriptedGenerator {
    outcomes: Mutex<VecDeque<Result<String, ()>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    gate: Semaphore,
    panics: bool,
}

impl ScriptedGenerator {
    fn with_permits(outcomes: Vec<Result<String, ()>>, permits: usize) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
            gate: Semaphore::new(permits),
            panics: false,
        }
    }

    /// Calls block until [`ScriptedGenerator::release`] hands out permits
    pub fn gated(outcomes: Vec<Result<String, ()>>) -> Self {
        Self::with_permits(outcomes, 0)
    }

    pub fn open(outcomes: Vec<Result<String, ()>>) -> Self {
        Self::with_permits(outcomes, Semaphore::MAX_PERMITS)
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::open(Vec::new())
        }
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.gate.acquire().await.unwrap().forget();

        if self.panics {
            panic!("scripted generator panic");
        }

        match self.outcomes.lock().unwrap().pop_front() {
            Some(Ok(html)) => Ok(html),
            _ => Err(GenerationError::Provider {
                status: 500,
                body: "scripted failure".to_string(),
            }),
        }
    }
}

struct RejectingVerifier;

#[async_trait]
impl IdentityVerifier for RejectingVerifier {
    async fn verify(&self, _id_token: &str) -> Result<ExternalIdentity, IdentityError> {
        Err(IdentityError::InvalidCredential("rejected".to_string()))
    }
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

/// Poll until the page reaches `status`
pub async fn wait_for_status(manager: &PageLifecycleManager, id: Uuid, status: PageStatus) -> Page {
    for _ in 0..500 {
        let page = manager.get(&id.to_string()).await.unwrap();
        if page.status == status {
            return page;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("page {} never reached {}", id, status);
}

/// A running API instance backed by the memory store
pub struct TestApp {
    pub base_url: String,
    pub state: AppState,
    pub store: Arc<MemoryRecordStore>,
    pub generator: Arc<ScriptedGenerator>,
}

impl TestApp {
    pub async fn spawn(generator: ScriptedGenerator) -> Self {
        let store = Arc::new(MemoryRecordStore::new());
        let generator = Arc::new(generator);

        let jwt = JwtService::new(JwtConfig {
            secret: "test-access".to_string(),
            refresh_secret: "test-refresh".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 7200,
        })
        .unwrap();

        let state = AppState {
            pages: PageLifecycleManager::new(store.clone(), generator.clone()),
            auth: AuthState::new(jwt, store.clone(), Arc::new(RejectingVerifier)),
            server: Arc::new(ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                frame_ancestors: "'self'".to_string(),
                cors_origin: "http://localhost:3000".to_string(),
            }),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = create_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            store,
            generator,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Seed a user and mint an access token for them
    pub async fn user(&self, username: &str) -> (User, String) {
        let user = seed_user(&self.store, username).await;
        let token = self
            .state
            .auth
            .jwt_service
            .generate_access_token(user.id)
            .unwrap();
        (user, token)
    }
}
