//! API models for request and response payloads

use serde::{Deserialize, Serialize};

/// Request for page creation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tagline: Option<String>,
    pub color_palette: Option<String>,
    pub theme: Option<String>,
}

/// Request for a metadata edit
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePageRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tagline: Option<String>,
}

/// Request for publishing a page
#[derive(Debug, Default, Deserialize)]
pub struct PublishPageRequest {
    pub slug: Option<String>,
}

/// Success envelope shared by the JSON endpoints
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}
