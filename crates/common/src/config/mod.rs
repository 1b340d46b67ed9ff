//! Configuration management for SupplyBook
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! No credentials are compiled in; passwords must come from a config file
//! or the environment.

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Application database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Administrative connection used to create the role and database
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Full connection URL; overrides host/port/name/user/password when set
    pub url: Option<String>,

    /// Database server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Database server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application database name
    #[serde(default = "default_database_name")]
    pub name: String,

    /// Role owning the application database
    #[serde(default = "default_database_user")]
    pub user: String,

    /// Password of the owning role
    pub password: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    /// Maintenance database the administrator connects to
    #[serde(default = "default_admin_database")]
    pub admin_database: String,

    /// Administrative role
    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// Administrative password
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

// Default value functions
fn default_host() -> String { "localhost".to_string() }
fn default_port() -> u16 { 5432 }
fn default_database_name() -> String { "supply".to_string() }
fn default_database_user() -> String { "supply".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_admin_database() -> String { "postgres".to_string() }
fn default_admin_user() -> String { "postgres".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__PORT=5433
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific config file, still honouring APP__ overrides
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseConfig {
    /// Connection URL for the application database
    pub fn connection_url(&self) -> Result<String> {
        match self.url {
            Some(ref url) => Ok(url.clone()),
            None => postgres_url(
                &self.user,
                self.password.as_deref(),
                &self.host,
                self.port,
                &self.name,
            ),
        }
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Config for an isolated in-memory SQLite database.
    ///
    /// A single connection is kept alive for the lifetime of the pool since
    /// every SQLite memory connection is its own database.
    pub fn in_memory_sqlite() -> Self {
        Self {
            url: Some("sqlite::memory:".to_string()),
            max_connections: 1,
            min_connections: 1,
            ..Self::default()
        }
    }
}

impl BootstrapConfig {
    /// Connection URL for the administrative session, sharing the
    /// application database's host and port
    pub fn admin_url(&self, database: &DatabaseConfig) -> Result<String> {
        postgres_url(
            &self.admin_user,
            self.admin_password.as_deref(),
            &database.host,
            database.port,
            &self.admin_database,
        )
    }
}

/// Assemble a Postgres URL; user, password and database name are
/// percent-encoded so reserved characters cannot alter host or path
fn postgres_url(user: &str, password: Option<&str>, host: &str, port: u16, database: &str) -> Result<String> {
    let invalid = |part: &str| AppError::Configuration {
        message: format!("cannot build database URL: invalid {}", part),
    };

    let mut url = Url::parse(&format!("postgres://{}:{}", host, port)).map_err(|_| invalid("host"))?;
    url.set_username(user).map_err(|_| invalid("user"))?;
    url.set_password(password).map_err(|_| invalid("password"))?;
    url.set_path(&format!("/{}", database));

    Ok(url.into())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_host(),
            port: default_port(),
            name: default_database_name(),
            user: default_database_user(),
            password: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_database: default_admin_database(),
            admin_user: default_admin_user(),
            admin_password: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            bootstrap: BootstrapConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
