//! Application state shared across handlers

use std::sync::Arc;

use auth::AuthState;

use crate::{config::ServerConfig, lifecycle::PageLifecycleManager};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pages: PageLifecycleManager,
    pub auth: AuthState,
    pub server: Arc<ServerConfig>,
}
