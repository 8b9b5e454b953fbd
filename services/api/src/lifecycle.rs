//! Launch page lifecycle
//!
//! A page is created in `generating` state with a placeholder document and
//! handed to a detached generation task. The task always finishes by writing
//! `generated` or `error`; callers poll the page to observe the outcome.
//! `regenerate` is the only way out of `error`, and only `generated` pages
//! can be published.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use auth::{AccessDenied, ensure_owner};
use common::{
    error::DatabaseError,
    models::{NewPage, Page, PageChanges, PageStatus, PublishedPage, User},
    store::{PageStore, PublishOutcome},
};

use crate::{
    generator::{ContentGenerator, GenerationRequest},
    html::{ERROR_PLACEHOLDER, GENERATING_PLACEHOLDER},
    slug::normalize_slug,
};

/// Lifecycle errors
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),

    #[error("Launch page not found")]
    NotFound,

    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    #[error("{0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Attributes supplied when creating a page
#[derive(Debug, Clone, Default)]
pub struct PageDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tagline: Option<String>,
    pub color_palette: Option<String>,
    pub theme: Option<String>,
}

/// Metadata edit; blank fields are ignored
#[derive(Debug, Clone, Default)]
pub struct PageEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tagline: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Page ids that are not UUIDs cannot exist
fn parse_page_id(id: &str) -> LifecycleResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| LifecycleError::NotFound)
}

/// Owns page state transitions and the detached generation jobs
#[derive(Clone)]
pub struct PageLifecycleManager {
    store: Arc<dyn PageStore>,
    generator: Arc<dyn ContentGenerator>,
}

impl PageLifecycleManager {
    pub fn new(store: Arc<dyn PageStore>, generator: Arc<dyn ContentGenerator>) -> Self {
        Self { store, generator }
    }

    /// Persist a new page in `generating` state and start generating it
    pub async fn create(&self, owner: &User, draft: PageDraft) -> LifecycleResult<Page> {
        let name = trimmed(draft.name)
            .ok_or_else(|| LifecycleError::Validation("Project name is required".to_string()))?;

        let page = self
            .store
            .create_page(&NewPage {
                user_id: owner.id,
                name,
                description: trimmed(draft.description),
                tagline: trimmed(draft.tagline),
                color_palette: trimmed(draft.color_palette),
                theme: trimmed(draft.theme),
                html_content: GENERATING_PLACEHOLDER.to_string(),
                status: PageStatus::Generating,
            })
            .await?;

        info!("Created launch page {} for user {}", page.id, owner.id);
        self.spawn_generation(page.id, GenerationRequest::from(&page));

        Ok(page)
    }

    /// Any page by id, regardless of owner
    pub async fn get(&self, id: &str) -> LifecycleResult<Page> {
        let id = parse_page_id(id)?;

        self.store
            .find_page_by_id(id)
            .await?
            .ok_or(LifecycleError::NotFound)
    }

    /// Pages owned by `owner`, newest first
    pub async fn list_for_owner(&self, owner: &User) -> LifecycleResult<Vec<Page>> {
        Ok(self.store.list_pages_by_owner(owner.id).await?)
    }

    async fn owned(&self, actor: &User, id: &str) -> LifecycleResult<Page> {
        let page = self.get(id).await?;
        ensure_owner(actor, page.user_id)?;
        Ok(page)
    }

    /// Edit name, description or tagline; status and content are untouched
    pub async fn update(&self, actor: &User, id: &str, edit: PageEdit) -> LifecycleResult<Page> {
        let page = self.owned(actor, id).await?;

        let changes = PageChanges {
            name: trimmed(edit.name),
            description: trimmed(edit.description),
            tagline: trimmed(edit.tagline),
            ..Default::default()
        };
        if changes.is_empty() {
            return Err(LifecycleError::Validation(
                "Please provide at least one field to update".to_string(),
            ));
        }

        self.store
            .update_page(page.id, &changes)
            .await?
            .ok_or(LifecycleError::NotFound)
    }

    /// Remove a page permanently
    pub async fn delete(&self, actor: &User, id: &str) -> LifecycleResult<()> {
        let page = self.owned(actor, id).await?;

        if !self.store.delete_page(page.id).await? {
            return Err(LifecycleError::NotFound);
        }

        info!("Deleted launch page {}", page.id);
        Ok(())
    }

    /// Flip the page back to `generating` and generate it again
    ///
    /// The stored document is kept until the new result lands.
    pub async fn regenerate(&self, actor: &User, id: &str) -> LifecycleResult<Page> {
        let page = self.owned(actor, id).await?;

        let page = self
            .store
            .update_page(page.id, &PageChanges::status(PageStatus::Generating))
            .await?
            .ok_or(LifecycleError::NotFound)?;

        info!("Regenerating launch page {}", page.id);
        self.spawn_generation(page.id, GenerationRequest::from(&page));

        Ok(page)
    }

    /// Publish a generated page under a normalized, globally unique slug
    pub async fn publish(
        &self,
        actor: &User,
        id: &str,
        slug: Option<&str>,
    ) -> LifecycleResult<Page> {
        let requested = slug
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LifecycleError::Validation("Valid URL slug is required".to_string()))?;

        let slug = normalize_slug(requested);
        if slug.is_empty() {
            return Err(LifecycleError::Validation(
                "URL slug must contain at least one letter or number".to_string(),
            ));
        }

        let page = self.owned(actor, id).await?;
        if page.status != PageStatus::Generated {
            return Err(not_publishable());
        }

        match self.store.publish_page(page.id, &slug).await? {
            PublishOutcome::Published(page) => {
                info!("Published launch page {} at /{}", page.id, slug);
                Ok(page)
            }
            PublishOutcome::SlugTaken => Err(LifecycleError::Conflict(
                "This URL is already taken. Please choose a different one.".to_string(),
            )),
            PublishOutcome::NotPublishable => Err(not_publishable()),
        }
    }

    /// A published page by its exact slug
    pub async fn get_published_by_slug(&self, slug: &str) -> LifecycleResult<Page> {
        self.store
            .find_published_by_slug(slug)
            .await?
            .ok_or(LifecycleError::NotFound)
    }

    /// Every published page with its creator's name, newest first
    pub async fn list_published(&self) -> LifecycleResult<Vec<PublishedPage>> {
        Ok(self.store.list_published().await?)
    }

    fn spawn_generation(&self, page_id: Uuid, request: GenerationRequest) {
        let store = Arc::clone(&self.store);
        let generator = Arc::clone(&self.generator);

        tokio::spawn(run_generation(store, generator, page_id, request));
    }
}

fn not_publishable() -> LifecycleError {
    LifecycleError::Validation("Only generated pages can be published".to_string())
}

/// Generate a page and record the terminal status
///
/// The generator runs in its own task so that a panic inside it still ends
/// with the page in `error`.
async fn run_generation(
    store: Arc<dyn PageStore>,
    generator: Arc<dyn ContentGenerator>,
    page_id: Uuid,
    request: GenerationRequest,
) {
    info!("Generating launch page {}", page_id);

    let generation = tokio::spawn(async move { generator.generate(&request).await }).await;

    let html = match generation {
        Ok(Ok(html)) => html,
        Ok(Err(e)) => {
            warn!("Generation failed for launch page {}: {}", page_id, e);
            record_failure(store.as_ref(), page_id).await;
            return;
        }
        Err(e) => {
            error!("Generation task for launch page {} aborted: {}", page_id, e);
            record_failure(store.as_ref(), page_id).await;
            return;
        }
    };

    let changes = PageChanges::completed(PageStatus::Generated, html);
    match store.update_page(page_id, &changes).await {
        Ok(Some(_)) => info!("Launch page {} generated", page_id),
        Ok(None) => warn!("Launch page {} was deleted during generation", page_id),
        Err(e) => {
            error!("Failed to store generated launch page {}: {}", page_id, e);
            record_failure(store.as_ref(), page_id).await;
        }
    }
}

async fn record_failure(store: &dyn PageStore, page_id: Uuid) {
    let changes = PageChanges::completed(PageStatus::Error, ERROR_PLACEHOLDER.to_string());

    if let Err(e) = store.update_page(page_id, &changes).await {
        error!("Failed to mark launch page {} as failed: {}", page_id, e);
    }
}
