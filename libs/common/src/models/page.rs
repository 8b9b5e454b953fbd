//! Launch page model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Content lifecycle of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Generation requested, result not yet written
    Generating,
    /// `html_content` holds the generated document
    Generated,
    /// The last generation failed; only a regenerate leaves this state
    Error,
}

impl PageStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            PageStatus::Generating => "generating",
            PageStatus::Generated => "generated",
            PageStatus::Error => "error",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generating" => Ok(PageStatus::Generating),
            "generated" => Ok(PageStatus::Generated),
            "error" => Ok(PageStatus::Error),
            other => Err(DatabaseError::Decode(format!("unknown page status '{}'", other))),
        }
    }
}

/// Launch page entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub tagline: Option<String>,
    pub color_palette: Option<String>,
    pub theme: Option<String>,
    pub html_content: String,
    pub status: PageStatus,
    pub publish_slug: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Published page joined with its creator's display name
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPage {
    #[serde(flatten)]
    pub page: Page,
    pub creator_name: String,
}

/// New page creation payload
#[derive(Debug, Clone)]
pub struct NewPage {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub tagline: Option<String>,
    pub color_palette: Option<String>,
    pub theme: Option<String>,
    pub html_content: String,
    pub status: PageStatus,
}

/// Columns of `launch_pages` that a partial update may touch
///
/// Publication fields are deliberately absent: they only change through the
/// atomic publish operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageField {
    Name,
    Description,
    Tagline,
    HtmlContent,
    Status,
}

impl PageField {
    /// Storage column backing this field
    pub const fn column(self) -> &'static str {
        match self {
            PageField::Name => "name",
            PageField::Description => "description",
            PageField::Tagline => "tagline",
            PageField::HtmlContent => "html_content",
            PageField::Status => "status",
        }
    }
}

/// Page update payload; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tagline: Option<String>,
    pub html_content: Option<String>,
    pub status: Option<PageStatus>,
}

impl PageChanges {
    /// Status-only change, used when a page enters or leaves generation
    pub fn status(status: PageStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Terminal write of a generation attempt
    pub fn completed(status: PageStatus, html_content: String) -> Self {
        Self {
            status: Some(status),
            html_content: Some(html_content),
            ..Default::default()
        }
    }

    /// The supplied fields with their textual storage values, in column order
    pub fn assignments(&self) -> Vec<(PageField, String)> {
        let mut out = Vec::new();

        if let Some(name) = &self.name {
            out.push((PageField::Name, name.clone()));
        }
        if let Some(description) = &self.description {
            out.push((PageField::Description, description.clone()));
        }
        if let Some(tagline) = &self.tagline {
            out.push((PageField::Tagline, tagline.clone()));
        }
        if let Some(html) = &self.html_content {
            out.push((PageField::HtmlContent, html.clone()));
        }
        if let Some(status) = self.status {
            out.push((PageField::Status, status.as_str().to_string()));
        }

        out
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// Apply the change set to an in-memory page
    pub fn apply_to(&self, page: &mut Page) {
        if let Some(name) = &self.name {
            page.name = name.clone();
        }
        if let Some(description) = &self.description {
            page.description = Some(description.clone());
        }
        if let Some(tagline) = &self.tagline {
            page.tagline = Some(tagline.clone());
        }
        if let Some(html) = &self.html_content {
            page.html_content = html.clone();
        }
        if let Some(status) = self.status {
            page.status = status;
        }
    }
}
