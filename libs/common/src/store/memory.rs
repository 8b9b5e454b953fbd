//! In-process record store
//!
//! Mirrors the PostgreSQL adapter's constraints (unique usernames, emails,
//! Google ids and publish slugs, cascade on user delete) so services behave
//! the same without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{PageStore, PublishOutcome, UserStore};
use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{
    NewPage, NewUser, Page, PageChanges, PageStatus, PublishedPage, User, UserChanges,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    pages: HashMap<Uuid, Page>,
}

impl Tables {
    fn user_conflict(&self, id: Option<Uuid>, candidate: &UserKeys<'_>) -> Option<&'static str> {
        self.users
            .values()
            .filter(|existing| Some(existing.id) != id)
            .find_map(|existing| {
                if candidate.username == Some(existing.username.as_str()) {
                    Some("users_username_key")
                } else if candidate.email == Some(existing.email.as_str()) {
                    Some("users_email_key")
                } else if candidate.google_id.is_some()
                    && candidate.google_id == existing.google_id.as_deref()
                {
                    Some("users_google_id_key")
                } else {
                    None
                }
            })
    }
}

struct UserKeys<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
    google_id: Option<&'a str>,
}

/// Next `updated_at` for a record, strictly after the previous one
fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous + Duration::microseconds(1))
}

/// Record store holding everything in process memory
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryRecordStore {
    async fn create_user(&self, new_user: &NewUser) -> DatabaseResult<User> {
        let mut tables = self.tables.lock().await;

        let keys = UserKeys {
            username: Some(&new_user.username),
            email: Some(&new_user.email),
            google_id: new_user.google_id.as_deref(),
        };
        if let Some(constraint) = tables.user_conflict(None, &keys) {
            return Err(DatabaseError::Conflict(constraint.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            google_id: new_user.google_id.clone(),
            avatar: new_user.avatar.clone(),
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> DatabaseResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, changes: &UserChanges) -> DatabaseResult<Option<User>> {
        let mut tables = self.tables.lock().await;

        let keys = UserKeys {
            username: changes.username.as_deref(),
            email: changes.email.as_deref(),
            google_id: changes.google_id.as_deref(),
        };
        if let Some(constraint) = tables.user_conflict(Some(id), &keys) {
            return Err(DatabaseError::Conflict(constraint.to_string()));
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if !changes.is_empty() {
            changes.apply_to(user);
            user.updated_at = touch(user.updated_at);
        }

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut tables = self.tables.lock().await;

        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.pages.retain(|_, page| page.user_id != id);

        Ok(true)
    }
}

#[async_trait]
impl PageStore for MemoryRecordStore {
    async fn create_page(&self, new_page: &NewPage) -> DatabaseResult<Page> {
        let mut tables = self.tables.lock().await;

        if !tables.users.contains_key(&new_page.user_id) {
            return Err(DatabaseError::Conflict(
                "launch_pages_user_id_fkey".to_string(),
            ));
        }

        let now = Utc::now();
        let page = Page {
            id: Uuid::new_v4(),
            user_id: new_page.user_id,
            name: new_page.name.clone(),
            description: new_page.description.clone(),
            tagline: new_page.tagline.clone(),
            color_palette: new_page.color_palette.clone(),
            theme: new_page.theme.clone(),
            html_content: new_page.html_content.clone(),
            status: new_page.status,
            publish_slug: None,
            is_published: false,
            created_at: now,
            updated_at: now,
        };
        tables.pages.insert(page.id, page.clone());

        Ok(page)
    }

    async fn find_page_by_id(&self, id: Uuid) -> DatabaseResult<Option<Page>> {
        Ok(self.tables.lock().await.pages.get(&id).cloned())
    }

    async fn list_pages_by_owner(&self, user_id: Uuid) -> DatabaseResult<Vec<Page>> {
        let tables = self.tables.lock().await;

        let mut pages: Vec<Page> = tables
            .pages
            .values()
            .filter(|page| page.user_id == user_id)
            .cloned()
            .collect();
        pages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(pages)
    }

    async fn update_page(&self, id: Uuid, changes: &PageChanges) -> DatabaseResult<Option<Page>> {
        let mut tables = self.tables.lock().await;

        let Some(page) = tables.pages.get_mut(&id) else {
            return Ok(None);
        };
        if !changes.is_empty() {
            changes.apply_to(page);
            page.updated_at = touch(page.updated_at);
        }

        Ok(Some(page.clone()))
    }

    async fn delete_page(&self, id: Uuid) -> DatabaseResult<bool> {
        Ok(self.tables.lock().await.pages.remove(&id).is_some())
    }

    async fn find_published_by_slug(&self, slug: &str) -> DatabaseResult<Option<Page>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .pages
            .values()
            .find(|page| page.is_published && page.publish_slug.as_deref() == Some(slug))
            .cloned())
    }

    async fn list_published(&self) -> DatabaseResult<Vec<PublishedPage>> {
        let tables = self.tables.lock().await;

        let mut published: Vec<PublishedPage> = tables
            .pages
            .values()
            .filter(|page| page.is_published)
            .filter_map(|page| {
                tables.users.get(&page.user_id).map(|owner| PublishedPage {
                    page: page.clone(),
                    creator_name: owner.username.clone(),
                })
            })
            .collect();
        published.sort_by(|a, b| b.page.created_at.cmp(&a.page.created_at));

        Ok(published)
    }

    async fn publish_page(&self, id: Uuid, slug: &str) -> DatabaseResult<PublishOutcome> {
        let mut tables = self.tables.lock().await;

        let taken = tables
            .pages
            .values()
            .any(|page| page.publish_slug.as_deref() == Some(slug));
        if taken {
            return Ok(PublishOutcome::SlugTaken);
        }

        let Some(page) = tables.pages.get_mut(&id) else {
            return Ok(PublishOutcome::NotPublishable);
        };
        if page.status != PageStatus::Generated {
            return Ok(PublishOutcome::NotPublishable);
        }

        page.publish_slug = Some(slug.to_string());
        page.is_published = true;
        page.updated_at = touch(page.updated_at);

        Ok(PublishOutcome::Published(page.clone()))
    }
}
