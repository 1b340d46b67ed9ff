//! Schema provisioning and database bootstrap
//!
//! The table definitions are generated from the SeaORM entities, so the
//! entities in [`super::models`] are the only schema definition.

use crate::db::models::{EnterpriseEntity, ProductEntity, SupplyEntity};
use crate::errors::{is_duplicate_object, AppError, Result};
use crate::metrics;
use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Schema, TransactionTrait};
use tracing::{info, warn};

/// Tables managed by [`create_schema`], in creation order
pub const TABLES: [&str; 3] = ["enterprise", "product", "supply"];

/// Postgres identifiers are truncated beyond this many bytes
const MAX_IDENTIFIER_BYTES: usize = 63;

/// Outcome of [`bootstrap_database`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub role_created: bool,
    pub database_created: bool,
}

/// `CREATE TABLE IF NOT EXISTS` statements for all tables, parents first
pub fn table_statements(backend: DbBackend) -> Vec<TableCreateStatement> {
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(EnterpriseEntity),
        schema.create_table_from_entity(ProductEntity),
        schema.create_table_from_entity(SupplyEntity),
    ];
    for stmt in statements.iter_mut() {
        stmt.if_not_exists();
    }

    statements
}

/// Ensure the `enterprise`, `product` and `supply` tables exist.
///
/// All statements run in one transaction. Existing tables are left
/// untouched, so running this repeatedly is a no-op.
pub async fn create_schema(db: &DatabaseConnection) -> Result<()> {
    let backend = db.get_database_backend();

    let txn = db.begin().await.map_err(|e| AppError::DatabaseConnection {
        message: format!("Failed to open provisioning transaction: {}", e),
    })?;

    for stmt in table_statements(backend) {
        txn.execute(backend.build(&stmt)).await?;
    }

    txn.commit().await?;
    metrics::record_provisioning();

    info!(tables = ?TABLES, "Schema provisioned");
    Ok(())
}

/// Ensure the application role and database exist on a Postgres server.
///
/// `admin` must be connected to a maintenance database with rights to create
/// roles and databases. An existing role or database is logged and skipped.
pub async fn bootstrap_database(
    admin: &DatabaseConnection,
    database: &str,
    owner: &str,
    password: &str,
) -> Result<BootstrapOutcome> {
    if admin.get_database_backend() != DbBackend::Postgres {
        return Err(AppError::Configuration {
            message: "database bootstrap requires a Postgres server".to_string(),
        });
    }

    let owner_ident = quote_ident(owner)?;
    let database_ident = quote_ident(database)?;

    let role_created = execute_ignoring_duplicate(
        admin,
        &format!(
            "CREATE USER {} WITH PASSWORD {}",
            owner_ident,
            quote_literal(password)
        ),
        || info!(user = %owner, "User already exists"),
    )
    .await?;

    // CREATE DATABASE cannot run inside a transaction block
    let database_created = execute_ignoring_duplicate(
        admin,
        &format!("CREATE DATABASE {} OWNER {}", database_ident, owner_ident),
        || info!(database = %database, "Database already exists"),
    )
    .await?;

    info!(database = %database, owner = %owner, "Database ready");

    Ok(BootstrapOutcome {
        role_created,
        database_created,
    })
}

/// Returns `false` when the statement failed only because the object exists
async fn execute_ignoring_duplicate(
    db: &DatabaseConnection,
    sql: &str,
    on_duplicate: impl FnOnce(),
) -> Result<bool> {
    match db.execute_unprepared(sql).await {
        Ok(_) => Ok(true),
        Err(e) if is_duplicate_object(&e) => {
            on_duplicate();
            Ok(false)
        }
        Err(e) => {
            warn!(error = %e, "Bootstrap statement failed");
            Err(e.into())
        }
    }
}

/// Validate and double-quote a role or database name.
///
/// Only ASCII letters, digits and underscores are accepted and the name may
/// not start with a digit.
pub fn quote_ident(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_BYTES
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    if !valid {
        return Err(AppError::Configuration {
            message: format!("invalid identifier: {:?}", name),
        });
    }

    Ok(format!("\"{}\"", name))
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
