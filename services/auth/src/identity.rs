//! External identity verification
//!
//! Google ID tokens are verified out-of-band against the provider's
//! token-introspection endpoint rather than by checking signatures locally.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Tokens shorter than this are rejected without asking the provider
const MIN_TOKEN_LENGTH: usize = 100;

const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Identity verification errors
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid identity token: {0}")]
    InvalidCredential(String),

    #[error("Identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Verified claims about an external identity
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentity {
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

/// Resolves a third-party identity token to verified claims
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity, IdentityError>;
}

/// Google verifier configuration
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Expected `aud` claim; unchecked when absent
    pub client_id: Option<String>,
    pub tokeninfo_url: String,
    pub timeout: Duration,
}

impl GoogleConfig {
    /// Create a new GoogleConfig from environment variables
    ///
    /// # Environment Variables
    /// - `GOOGLE_CLIENT_ID`: Expected audience (optional)
    /// - `GOOGLE_TOKENINFO_URL`: Introspection endpoint (default: Google's tokeninfo)
    pub fn from_env() -> Self {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());

        let tokeninfo_url = std::env::var("GOOGLE_TOKENINFO_URL")
            .unwrap_or_else(|_| DEFAULT_TOKENINFO_URL.to_string());

        GoogleConfig {
            client_id,
            tokeninfo_url,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    aud: Option<String>,
}

/// Verifies Google ID tokens through the tokeninfo endpoint
///
/// Google publishes no Rust client library, so there is no local signature
/// check to try first; tokeninfo validates the signature and expiry itself.
pub struct GoogleVerifier {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleVerifier {
    pub fn new(config: GoogleConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity, IdentityError> {
        if id_token.len() < MIN_TOKEN_LENGTH {
            return Err(IdentityError::InvalidCredential(
                "token is too short or missing".to_string(),
            ));
        }

        debug!("Verifying Google ID token ({} bytes)", id_token.len());

        let response = self
            .client
            .get(&self.config.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Google tokeninfo rejected token: {}", response.status());
            return Err(IdentityError::InvalidCredential(format!(
                "provider answered {}",
                response.status()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidCredential(e.to_string()))?;

        if let Some(expected) = &self.config.client_id {
            if info.aud.as_deref() != Some(expected.as_str()) {
                return Err(IdentityError::InvalidCredential(
                    "audience mismatch".to_string(),
                ));
            }
        }

        let external_id = info
            .sub
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IdentityError::InvalidCredential("missing subject".to_string()))?;
        let email = info
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| IdentityError::InvalidCredential("missing email".to_string()))?;

        Ok(ExternalIdentity {
            external_id,
            email,
            display_name: info.name.filter(|n| !n.is_empty()),
            avatar: info.picture.filter(|p| !p.is_empty()),
        })
    }
}
