//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/pganalytics/config.toml`,
//! overridable via `PGANALYTICS_CONFIG`). Deployment-specific secrets and
//! endpoints can also come from the environment: `DATABASE_URL`,
//! `REDIS_URL` and `JWT_SECRET` override their file counterparts.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub cache: CacheConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Default config file location (`~/.config/pganalytics/config.toml`)
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pganalytics")
        .join("config.toml")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "pganalytics".to_string(),
            user: "pganalytics".to_string(),
            password: "pganalytics123".to_string(),
        }
    }
}

impl DatabaseSettings {
    /// Connection URL, with `DATABASE_URL` taking precedence over the file.
    pub fn connection_url(&self) -> String {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Token cache backend: "redis", "memory" or "none"
    pub backend: String,
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "redis".to_string(),
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl CacheConfig {
    /// Connection URL, with `REDIS_URL` taking precedence over the file.
    pub fn connection_url(&self) -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| self.url.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            access_token_minutes: 30,
            refresh_token_days: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Bootstrap admin account, created on first start when the users table is
/// empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            email: "admin@pganalytics.local".to_string(),
            full_name: "Administrator".to_string(),
            password: "Admin123!".to_string(),
        }
    }
}
