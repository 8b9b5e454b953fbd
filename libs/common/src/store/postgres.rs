//! PostgreSQL record store

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::{PageStore, PublishOutcome, UserStore};
use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{
    NewPage, NewUser, Page, PageChanges, PublishedPage, UpdateValue, User, UserChanges,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, google_id, avatar, \
     is_email_verified, created_at, updated_at";

const PAGE_COLUMNS: &str = "id, user_id, name, description, tagline, color_palette, theme, \
     html_content, status, publish_slug, is_published, created_at, updated_at";

/// Keeps `updated_at` strictly increasing even when two writes share a clock tick
const TOUCH_UPDATED_AT: &str =
    "updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')";

/// Record store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new record store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn user_from_row(row: &PgRow) -> DatabaseResult<User> {
    Ok(User {
        id: row.try_get("id").map_err(decode)?,
        username: row.try_get("username").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        google_id: row.try_get("google_id").map_err(decode)?,
        avatar: row.try_get("avatar").map_err(decode)?,
        is_email_verified: row.try_get("is_email_verified").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn page_from_row(row: &PgRow) -> DatabaseResult<Page> {
    let status: String = row.try_get("status").map_err(decode)?;

    Ok(Page {
        id: row.try_get("id").map_err(decode)?,
        user_id: row.try_get("user_id").map_err(decode)?,
        name: row.try_get("name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        tagline: row.try_get("tagline").map_err(decode)?,
        color_palette: row.try_get("color_palette").map_err(decode)?,
        theme: row.try_get("theme").map_err(decode)?,
        html_content: row.try_get("html_content").map_err(decode)?,
        status: status.parse()?,
        publish_slug: row.try_get("publish_slug").map_err(decode)?,
        is_published: row.try_get("is_published").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn decode(err: sqlx::Error) -> DatabaseError {
    DatabaseError::Decode(err.to_string())
}

#[async_trait]
impl UserStore for PgRecordStore {
    async fn create_user(&self, new_user: &NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", new_user.username);

        let sql = format!(
            "INSERT INTO users (username, email, password_hash, google_id, avatar) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.google_id)
            .bind(&new_user.avatar)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        user_from_row(&row)
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE google_id = $1");
        let row = sqlx::query(&sql)
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, id: Uuid, changes: &UserChanges) -> DatabaseResult<Option<User>> {
        let assignments = changes.assignments();
        if assignments.is_empty() {
            return self.find_user_by_id(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        for (field, value) in assignments {
            builder.push(field.column()).push(" = ");
            match value {
                UpdateValue::Text(text) => builder.push_bind(text),
                UpdateValue::Flag(flag) => builder.push_bind(flag),
            };
            builder.push(", ");
        }
        builder
            .push(TOUCH_UPDATED_AT)
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {USER_COLUMNS}"));

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete_user(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PageStore for PgRecordStore {
    async fn create_page(&self, new_page: &NewPage) -> DatabaseResult<Page> {
        let sql = format!(
            "INSERT INTO launch_pages \
             (user_id, name, description, tagline, color_palette, theme, html_content, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(new_page.user_id)
            .bind(&new_page.name)
            .bind(&new_page.description)
            .bind(&new_page.tagline)
            .bind(&new_page.color_palette)
            .bind(&new_page.theme)
            .bind(&new_page.html_content)
            .bind(new_page.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        page_from_row(&row)
    }

    async fn find_page_by_id(&self, id: Uuid) -> DatabaseResult<Option<Page>> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM launch_pages WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(page_from_row).transpose()
    }

    async fn list_pages_by_owner(&self, user_id: Uuid) -> DatabaseResult<Vec<Page>> {
        let sql = format!(
            "SELECT {PAGE_COLUMNS} FROM launch_pages WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter().map(page_from_row).collect()
    }

    async fn update_page(&self, id: Uuid, changes: &PageChanges) -> DatabaseResult<Option<Page>> {
        let assignments = changes.assignments();
        if assignments.is_empty() {
            return self.find_page_by_id(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE launch_pages SET ");
        for (field, value) in assignments {
            builder
                .push(field.column())
                .push(" = ")
                .push_bind(value)
                .push(", ");
        }
        builder
            .push(TOUCH_UPDATED_AT)
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {PAGE_COLUMNS}"));

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row.as_ref().map(page_from_row).transpose()
    }

    async fn delete_page(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM launch_pages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_published_by_slug(&self, slug: &str) -> DatabaseResult<Option<Page>> {
        let sql = format!(
            "SELECT {PAGE_COLUMNS} FROM launch_pages WHERE publish_slug = $1 AND is_published = true"
        );
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(page_from_row).transpose()
    }

    async fn list_published(&self) -> DatabaseResult<Vec<PublishedPage>> {
        let rows = sqlx::query(
            r#"
            SELECT p.*, u.username AS creator_name
            FROM launch_pages p
            JOIN users u ON u.id = p.user_id
            WHERE p.is_published = true
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter()
            .map(|row| {
                Ok(PublishedPage {
                    page: page_from_row(row)?,
                    creator_name: row.try_get("creator_name").map_err(decode)?,
                })
            })
            .collect()
    }

    async fn publish_page(&self, id: Uuid, slug: &str) -> DatabaseResult<PublishOutcome> {
        let sql = format!(
            "UPDATE launch_pages \
             SET publish_slug = $1, is_published = true, {TOUCH_UPDATED_AT} \
             WHERE id = $2 AND status = 'generated' \
               AND NOT EXISTS (SELECT 1 FROM launch_pages WHERE publish_slug = $1) \
             RETURNING {PAGE_COLUMNS}"
        );

        // The unique index on publish_slug settles races the NOT EXISTS guard cannot see
        let row = match sqlx::query(&sql)
            .bind(slug)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)
        {
            Ok(row) => row,
            Err(DatabaseError::Conflict(_)) => {
                debug!("Slug {} lost a concurrent publish race", slug);
                return Ok(PublishOutcome::SlugTaken);
            }
            Err(e) => return Err(e),
        };

        if let Some(row) = row {
            return Ok(PublishOutcome::Published(page_from_row(&row)?));
        }

        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM launch_pages WHERE publish_slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await
                .map_err(DatabaseError::Query)?;

        if taken {
            Ok(PublishOutcome::SlugTaken)
        } else {
            Ok(PublishOutcome::NotPublishable)
        }
    }
}
