//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub cloudflare: CloudflareConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Storage configuration (Cloudflare R2)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub media: MediaStorageConfig,
}

/// Media storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaStorageConfig {
    /// R2 bucket name for media
    pub bucket: String,
    /// Public URL for media (Custom Domain)
    /// e.g., "https://media.example.com"
    pub public_url: String,
}

/// Cloudflare credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareConfig {
    /// Cloudflare account ID
    pub account_id: String,
    /// R2 access key ID
    pub r2_access_key_id: String,
    /// R2 secret access key
    pub r2_secret_access_key: String,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token signing secret key (32+ bytes)
    pub session_secret: String,
    /// Token lifetime in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
}

/// Feed assembly configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Page size when the client does not send `limit` (default: 10)
    pub default_page_size: usize,
    /// Upper bound on client-requested `limit` (default: 50)
    pub max_page_size: usize,
    /// Number of most-recent comments embedded per feed post (default: 3)
    pub comment_preview_count: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (PARLOR_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/parlor.db")?
            .set_default("auth.session_max_age", 604_800)?
            .set_default("feed.default_page_size", 10)?
            .set_default("feed.max_page_size", 50)?
            .set_default("feed.comment_preview_count", 3)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (PARLOR_*)
            .add_source(
                Environment::with_prefix("PARLOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.feed.default_page_size == 0 || self.feed.max_page_size == 0 {
            return Err(crate::error::AppError::Config(
                "feed page sizes must be greater than 0".to_string(),
            ));
        }

        if self.feed.default_page_size > self.feed.max_page_size {
            return Err(crate::error::AppError::Config(
                "feed.default_page_size must not exceed feed.max_page_size".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/parlor-test.db"),
            },
            storage: StorageConfig {
                media: MediaStorageConfig {
                    bucket: "media".to_string(),
                    public_url: "https://media.example.com".to_string(),
                },
            },
            cloudflare: CloudflareConfig {
                account_id: "account".to_string(),
                r2_access_key_id: "access-key".to_string(),
                r2_secret_access_key: "secret-key".to_string(),
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 604_800,
            },
            feed: FeedConfig {
                default_page_size: 10,
                max_page_size: 50,
                comment_preview_count: 3,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = valid_config();
        config.feed.default_page_size = 0;

        let error = config.validate().expect_err("zero page size must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("feed page sizes")
        ));
    }

    #[test]
    fn validate_rejects_default_page_size_above_max() {
        let mut config = valid_config();
        config.feed.default_page_size = 100;
        config.feed.max_page_size = 50;

        let error = config
            .validate()
            .expect_err("default page size above max must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("feed.default_page_size")
        ));
    }
}
