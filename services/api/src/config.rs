//! Server configuration

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// HTTP server settings, read from `SERVER_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `frame-ancestors` sources allowed to embed rendered pages
    pub frame_ancestors: String,
    /// Comma-separated browser origins allowed to call the API with credentials
    pub cors_origin: String,
}

impl ServerConfig {
    /// Load the server configuration
    ///
    /// # Environment Variables
    /// - `SERVER_HOST`: Bind address (default: 0.0.0.0)
    /// - `SERVER_PORT`: Bind port (default: 5000)
    /// - `SERVER_FRAME_ANCESTORS`: CSP frame ancestors (default: 'self' localhost:3000 localhost:5000)
    /// - `SERVER_CORS_ORIGIN`: Allowed CORS origins, comma-separated (default: http://localhost:3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000)?
            .set_default("frame_ancestors", "'self' localhost:3000 localhost:5000")?
            .set_default("cors_origin", "http://localhost:3000")?
            .add_source(Environment::with_prefix("SERVER"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured CORS origins, blanks removed
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origin
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_server_config_defaults() {
        unsafe {
            std::env::remove_var("SERVER_HOST");
            std::env::remove_var("SERVER_PORT");
            std::env::remove_var("SERVER_FRAME_ANCESTORS");
            std::env::remove_var("SERVER_CORS_ORIGIN");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.frame_ancestors, "'self' localhost:3000 localhost:5000");
        assert_eq!(config.cors_origins(), vec!["http://localhost:3000"]);
    }

    #[test]
    #[serial]
    fn test_server_config_from_env() {
        unsafe {
            std::env::set_var("SERVER_HOST", "127.0.0.1");
            std::env::set_var("SERVER_PORT", "8080");
            std::env::set_var("SERVER_FRAME_ANCESTORS", "'self'");
            std::env::set_var(
                "SERVER_CORS_ORIGIN",
                "https://launchit.app, http://localhost:3000,",
            );
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.frame_ancestors, "'self'");
        assert_eq!(
            config.cors_origins(),
            vec!["https://launchit.app", "http://localhost:3000"]
        );

        unsafe {
            std::env::remove_var("SERVER_HOST");
            std::env::remove_var("SERVER_PORT");
            std::env::remove_var("SERVER_FRAME_ANCESTORS");
            std::env::remove_var("SERVER_CORS_ORIGIN");
        }
    }
}
