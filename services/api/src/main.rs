use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod generator;
mod html;
mod lifecycle;
mod models;
mod routes;
mod slug;
mod state;

#[cfg(test)]
mod test_support;

use auth::{
    AuthState,
    identity::{GoogleConfig, GoogleVerifier},
    jwt::{JwtConfig, JwtService},
};
use common::{
    database::{self, DatabaseConfig, init_pool, run_migrations},
    error::DatabaseError,
    store::{MemoryRecordStore, PageStore, PgRecordStore, RecordStore, UserStore},
};

use crate::{
    config::ServerConfig,
    generator::{GeminiConfig, GeminiGenerator},
    lifecycle::PageLifecycleManager,
    state::AppState,
};

/// One record store seen through both of its ports
struct Stores {
    users: Arc<dyn UserStore>,
    pages: Arc<dyn PageStore>,
}

impl Stores {
    fn shared<S: RecordStore + 'static>(store: S) -> Self {
        let store = Arc::new(store);
        Stores {
            users: store.clone(),
            pages: store,
        }
    }
}

/// Connect to PostgreSQL when configured, otherwise keep records in memory
async fn record_store() -> Result<Stores> {
    let db_config = match DatabaseConfig::from_env() {
        Ok(config) => config,
        Err(DatabaseError::Configuration(reason)) => {
            warn!("{}; records are kept in memory and lost on restart", reason);
            return Ok(Stores::shared(MemoryRecordStore::new()));
        }
        Err(e) => return Err(e.into()),
    };

    let pool = init_pool(&db_config).await?;
    if !database::health_check(&pool).await? {
        anyhow::bail!("Failed to connect to database");
    }
    info!("Database connection successful");

    run_migrations(&pool).await?;

    Ok(Stores::shared(PgRecordStore::new(pool)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let server_config = ServerConfig::from_env()?;
    let stores = record_store().await?;

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;
    let verifier = GoogleVerifier::new(GoogleConfig::from_env())?;

    let gemini_config = GeminiConfig::from_env();
    if gemini_config.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; every generation will end in error");
    }
    let generator = GeminiGenerator::new(gemini_config)?;

    let app_state = AppState {
        pages: PageLifecycleManager::new(stores.pages, Arc::new(generator)),
        auth: AuthState::new(jwt_service, stores.users, Arc::new(verifier)),
        server: Arc::new(server_config),
    };

    // Start the web server
    let app = routes::create_router(app_state.clone());

    let address = app_state.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
