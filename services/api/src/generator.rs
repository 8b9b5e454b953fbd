//! Content generation through the Gemini API
//!
//! The generator turns a page's descriptive attributes into a single prompt,
//! submits it once, and returns the HTML document with any Markdown code
//! fence removed. It never retries and never persists anything.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use common::models::Page;

const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Generation errors
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Generation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Generator answered {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Generator returned no content")]
    Empty,
}

/// Attributes a page is generated from
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub name: String,
    pub description: Option<String>,
    pub tagline: Option<String>,
    pub color_palette: Option<String>,
    pub theme: Option<String>,
}

impl From<&Page> for GenerationRequest {
    fn from(page: &Page) -> Self {
        Self {
            name: page.name.clone(),
            description: page.description.clone(),
            tagline: page.tagline.clone(),
            color_palette: page.color_palette.clone(),
            theme: page.theme.clone(),
        }
    }
}

/// Turns a generation request into an HTML document
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Gemini configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// No timeout when absent
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    /// Create a new GeminiConfig from environment variables
    ///
    /// # Environment Variables
    /// - `GEMINI_API_KEY`: API key; without it every generation fails
    /// - `GEMINI_MODEL`: Model name (default: gemini-2.0-flash-exp)
    /// - `GEMINI_BASE_URL`: API base URL (default: https://generativelanguage.googleapis.com)
    /// - `GEMINI_TIMEOUT_SECS`: Request timeout in seconds (default: none)
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse().ok())
            .map(Duration::from_secs);

        GeminiConfig {
            api_key,
            model,
            base_url,
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Generator backed by the Gemini `generateContent` endpoint
pub struct GeminiGenerator {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;

        let prompt = build_prompt(request);
        debug!("Requesting generation for '{}'", request.name);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini answered {} for '{}'", status, request.name);
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let html = strip_code_fences(&text);
        if html.is_empty() {
            return Err(GenerationError::Empty);
        }

        Ok(html.to_string())
    }
}

/// Build the generation prompt for a page
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut details = format!(
        "Project Name: {}\nDescription: {}\nTagline: {}\n",
        request.name,
        request.description.as_deref().unwrap_or("No description provided"),
        request.tagline.as_deref().unwrap_or("No tagline provided"),
    );
    if let Some(palette) = &request.color_palette {
        details.push_str(&format!("Color Palette: {}\n", palette));
    }
    if let Some(theme) = &request.theme {
        details.push_str(&format!("Theme: {}\n", theme));
    }

    format!(
        "Generate a complete, stunning, and modern launch page in a single HTML file for a project with the following details:

{details}
Requirements:
1. Create a complete HTML document with embedded CSS and minimal JavaScript
2. Design should be modern, professional, and visually appealing
3. Must be fully responsive for both mobile and desktop
4. Include the following sections:
   - Hero section with project name and tagline
   - About/Description section
   - Features section (create 3-4 relevant features based on the description)
   - Contact/CTA section
5. Use the requested color palette and theme when given, otherwise a modern color scheme
6. Include smooth animations and hover effects
7. Use modern fonts (Google Fonts)
8. Include proper meta tags for SEO
9. Make it production-ready

The HTML should be complete and ready to use. Do not include any markdown formatting or code blocks - just return the raw HTML content.

Make the design unique and tailored to the project name and description provided.
"
    )
}

/// Remove a Markdown code fence wrapped around the document
///
/// Only a leading fence (optionally tagged `html`, any case) and a trailing
/// fence are dropped; fences inside the document are left alone.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let rest = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("html") => &rest[4..],
            _ => rest,
        };
        text = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest);
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}
