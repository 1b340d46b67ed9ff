//! Database layer for SupplyBook
//!
//! Provides:
//! - SeaORM entity models
//! - Schema provisioning and role/database bootstrap
//! - Repository pattern for record access
//! - Connection pool management

pub mod models;
mod repository;
pub mod schema;

pub use repository::{NewEnterprise, NewProduct, NewSupply, Repository};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!(
            host = %config.host,
            database = %config.name,
            "Connecting to application database..."
        );

        let conn = connect(&config.connection_url()?, config).await?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Wrap an already established connection
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}

/// Open a connection to `url` using the pool settings of `config`.
///
/// Connection failures (unreachable host, bad credentials) are reported as
/// [`AppError::DatabaseConnection`].
pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout())
        .idle_timeout(config.idle_timeout())
        .sqlx_logging(true);

    Database::connect(opts)
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("Failed to connect: {}", e),
        })
}
