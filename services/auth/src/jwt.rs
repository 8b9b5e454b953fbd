//! JWT service for token generation and validation
//!
//! Access and refresh tokens are HS256-signed with separate secrets and carry
//! their kind in the claims, so one can never stand in for the other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Token errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("JWT configuration error: {0}")]
    Configuration(String),

    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("Expected a {expected:?} token")]
    WrongType { expected: TokenType },

    #[error("System clock error: {0}")]
    Clock(String),
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub secret: String,
    /// Secret for signing refresh tokens
    pub refresh_secret: String,
    /// Access token expiration time in seconds (default: 7 days)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 30 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Secret for access tokens
    /// - `JWT_REFRESH_SECRET`: Secret for refresh tokens
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 604800)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 2592000)
    pub fn from_env() -> Result<Self, TokenError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| {
            TokenError::Configuration("JWT_SECRET environment variable not set".to_string())
        })?;

        let refresh_secret = std::env::var("JWT_REFRESH_SECRET").map_err(|_| {
            TokenError::Configuration(
                "JWT_REFRESH_SECRET environment variable not set".to_string(),
            )
        })?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "2592000".to_string()) // 30 days
            .parse()
            .unwrap_or(2592000);

        Ok(JwtConfig {
            secret,
            refresh_secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(TokenError::Configuration(
                "JWT secrets must not be empty".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Ok(JwtService {
            access_encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
            config,
        })
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.sign(
            user_id,
            TokenType::Access,
            self.config.access_token_expiry,
            &self.access_encoding,
        )
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.sign(
            user_id,
            TokenType::Refresh,
            self.config.refresh_token_expiry,
            &self.refresh_encoding,
        )
    }

    /// Generate a fresh access/refresh pair
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            token: self.generate_access_token(user_id)?,
            refresh_token: self.generate_refresh_token(user_id)?,
        })
    }

    /// Validate an access token and return the claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate(token, TokenType::Access, &self.access_decoding)
    }

    /// Validate a refresh token and return the claims
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate(token, TokenType::Refresh, &self.refresh_decoding)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }

    fn sign(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        expiry: u64,
        key: &EncodingKey,
    ) -> Result<String, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TokenError::Clock(e.to_string()))?
            .as_secs();

        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + expiry,
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, key).map_err(TokenError::Signing)
    }

    fn validate(
        &self,
        token: &str,
        expected: TokenType,
        key: &DecodingKey,
    ) -> Result<Claims, TokenError> {
        let token_data =
            decode::<Claims>(token, key, &self.validation).map_err(TokenError::Invalid)?;

        if token_data.claims.token_type != expected {
            return Err(TokenError::WrongType { expected });
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            access_token_expiry: 60,
            refresh_token_expiry: 120,
        })
        .unwrap()
    }

    #[test]
    fn access_token_round_trips() {
        let jwt = service();
        let user_id = Uuid::new_v4();

        let token = jwt.generate_access_token(user_id).unwrap();
        let claims = jwt.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn tokens_are_not_interchangeable() {
        let jwt = service();
        let pair = jwt.issue_pair(Uuid::new_v4()).unwrap();

        // Signed with a different secret, so the signature check fails first
        assert!(jwt.validate_refresh_token(&pair.token).is_err());
        assert!(jwt.validate_access_token(&pair.refresh_token).is_err());
        assert!(jwt.validate_refresh_token(&pair.refresh_token).is_ok());

        let shared = JwtService::new(JwtConfig {
            secret: "shared".to_string(),
            refresh_secret: "shared".to_string(),
            access_token_expiry: 60,
            refresh_token_expiry: 60,
        })
        .unwrap();
        let refresh = shared.generate_refresh_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            shared.validate_access_token(&refresh),
            Err(TokenError::WrongType {
                expected: TokenType::Access
            })
        ));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = JwtService::new(JwtConfig {
            secret: "someone-else".to_string(),
            refresh_secret: "someone-else-refresh".to_string(),
            access_token_expiry: 60,
            refresh_token_expiry: 60,
        })
        .unwrap();

        let token = other.generate_access_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            service().validate_access_token(&token),
            Err(TokenError::Invalid(_))
        ));
        assert!(service().validate_access_token("not-a-jwt").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = service();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now - 7200,
            exp: now - 3600,
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();

        assert!(jwt.validate_access_token(&token).is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let result = JwtService::new(JwtConfig {
            secret: String::new(),
            refresh_secret: "x".to_string(),
            access_token_expiry: 60,
            refresh_token_expiry: 60,
        });
        assert!(matches!(result, Err(TokenError::Configuration(_))));
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        unsafe {
            std::env::set_var("JWT_SECRET", "s1");
            std::env::set_var("JWT_REFRESH_SECRET", "s2");
            std::env::remove_var("JWT_ACCESS_TOKEN_EXPIRY");
            std::env::set_var("JWT_REFRESH_TOKEN_EXPIRY", "3600");
        }

        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.secret, "s1");
        assert_eq!(config.refresh_secret, "s2");
        assert_eq!(config.access_token_expiry, 604800);
        assert_eq!(config.refresh_token_expiry, 3600);

        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("JWT_REFRESH_SECRET");
            std::env::remove_var("JWT_REFRESH_TOKEN_EXPIRY");
        }
    }
}
