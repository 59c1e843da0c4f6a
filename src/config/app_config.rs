use serde::Deserialize;

use crate::domain::user::{ValidationPolicy, STRICT_PATTERN};
use crate::domain::DomainError;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub validation: ValidationConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub jwt_expiration_hours: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Falls back to the DATABASE_URL environment variable
    pub database_url: Option<String>,
}

/// Character-set patterns for account fields
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub login_pattern: String,
    pub name_pattern: String,
    pub password_pattern: String,
}

/// Administrator seeded on startup when no account with that login exists
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_login: String,
    /// Seeding is skipped when unset
    pub admin_password: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            issuer: "users-directory".to_string(),
            audience: "users-directory-clients".to_string(),
            jwt_expiration_hours: 24,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            login_pattern: STRICT_PATTERN.to_string(),
            name_pattern: STRICT_PATTERN.to_string(),
            password_pattern: STRICT_PATTERN.to_string(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_login: "admin".to_string(),
            admin_password: None,
        }
    }
}

impl StorageConfig {
    /// Configured database URL, or DATABASE_URL from the environment
    pub fn database_url(&self) -> Result<String, DomainError> {
        self.database_url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .ok_or_else(|| {
                DomainError::configuration(
                    "storage.database_url or DATABASE_URL is required for the postgres backend",
                )
            })
    }
}

impl ValidationConfig {
    /// Compile the configured patterns
    pub fn to_policy(&self) -> Result<ValidationPolicy, DomainError> {
        ValidationPolicy::from_patterns(
            &self.login_pattern,
            &self.name_pattern,
            &self.password_pattern,
        )
        .map_err(|e| DomainError::configuration(e.to_string()))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
