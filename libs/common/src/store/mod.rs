//! Record store ports and their adapters
//!
//! `UserStore` and `PageStore` are the only way services touch persisted
//! state. [`PgRecordStore`] serves them from PostgreSQL and
//! [`MemoryRecordStore`] from process memory with the same semantics.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseResult;
use crate::models::{NewPage, NewUser, Page, PageChanges, PublishedPage, User, UserChanges};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

/// Result of an atomic publish attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Slug recorded and page marked published
    Published(Page),
    /// Another page (or this one) already holds the slug; nothing changed
    SlugTaken,
    /// The page is gone or not in `generated` state; nothing changed
    NotPublishable,
}

/// Persistence of user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, new_user: &NewUser) -> DatabaseResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>>;

    /// Look a user up by their external identity provider id
    async fn find_user_by_google_id(&self, google_id: &str) -> DatabaseResult<Option<User>>;

    /// Apply a partial update; `None` when the user does not exist
    async fn update_user(&self, id: Uuid, changes: &UserChanges) -> DatabaseResult<Option<User>>;

    /// Remove a user together with every page they own
    async fn delete_user(&self, id: Uuid) -> DatabaseResult<bool>;
}

/// Persistence of launch pages
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn create_page(&self, new_page: &NewPage) -> DatabaseResult<Page>;

    async fn find_page_by_id(&self, id: Uuid) -> DatabaseResult<Option<Page>>;

    /// Pages owned by `user_id`, newest first
    async fn list_pages_by_owner(&self, user_id: Uuid) -> DatabaseResult<Vec<Page>>;

    /// Apply a partial update; `None` when the page does not exist
    async fn update_page(&self, id: Uuid, changes: &PageChanges) -> DatabaseResult<Option<Page>>;

    async fn delete_page(&self, id: Uuid) -> DatabaseResult<bool>;

    /// A published page whose slug matches exactly
    async fn find_published_by_slug(&self, slug: &str) -> DatabaseResult<Option<Page>>;

    /// Every published page with its creator's username, newest first
    async fn list_published(&self) -> DatabaseResult<Vec<PublishedPage>>;

    /// Check slug uniqueness and publish as one atomic unit
    async fn publish_page(&self, id: Uuid, slug: &str) -> DatabaseResult<PublishOutcome>;
}

/// Convenience bound for adapters serving both ports
pub trait RecordStore: UserStore + PageStore {}

impl<T: UserStore + PageStore> RecordStore for T {}
