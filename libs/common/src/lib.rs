//! Common library for the Launchit services
//!
//! This crate provides the persistence layer shared by the auth and api
//! services: database connectivity, the user and page models, and the record
//! store ports with their PostgreSQL and in-memory adapters.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, run_migrations};
//! use common::store::{PageStore, PgRecordStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     let store = PgRecordStore::new(pool);
//!     println!("{} pages published", store.list_published().await?.len());
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod models;
pub mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use store::{
    MemoryRecordStore, PageStore, PgRecordStore, PublishOutcome, RecordStore, UserStore,
};
