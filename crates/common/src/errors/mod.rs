//! Error types for SupplyBook
//!
//! Provides:
//! - Distinct error types for provisioning and record access failures
//! - Error codes for machine-readable identification
//! - Helpers for classifying raw storage errors

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Postgres SQLSTATE for `duplicate_object` (e.g. role already exists)
pub const SQLSTATE_DUPLICATE_OBJECT: &str = "42710";

/// Postgres SQLSTATE for `duplicate_database`
pub const SQLSTATE_DUPLICATE_DATABASE: &str = "42P04";

/// Postgres SQLSTATE for `foreign_key_violation`
pub const SQLSTATE_FOREIGN_KEY_VIOLATION: &str = "23503";

/// SQLite extended code `SQLITE_CONSTRAINT_FOREIGNKEY` (dangling reference on insert)
pub const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";

/// SQLite extended code `SQLITE_CONSTRAINT_TRIGGER`, raised by `ON DELETE RESTRICT`
pub const SQLITE_CONSTRAINT_TRIGGER: &str = "1811";

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Integrity errors (5xxx)
    ReferentialIntegrity,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::ReferentialIntegrity => 5001,
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Referential integrity violation: {reference} with id {id} does not exist")]
    ReferentialIntegrity { reference: String, id: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::ReferentialIntegrity { .. } => ErrorCode::ReferentialIntegrity,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Rejected writes caused by the caller's input, as opposed to
    /// infrastructure failures
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. } | AppError::ReferentialIntegrity { .. }
        )
    }

    /// Build a validation error for a specific field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

/// Extract the SQLSTATE code carried by a database-side error, if any
pub fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
        | DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(db_err))) => {
            db_err.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

/// Whether the error is a foreign key violation reported by the database
pub fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
        || sqlstate(err).is_some_and(|code| is_foreign_key_code(&code))
}

/// Whether the error is an "already exists" outcome of role or database creation
pub fn is_duplicate_object(err: &DbErr) -> bool {
    sqlstate(err).is_some_and(|code| is_duplicate_object_code(&code))
}

/// Foreign key codes across Postgres and SQLite
pub fn is_foreign_key_code(code: &str) -> bool {
    matches!(
        code,
        SQLSTATE_FOREIGN_KEY_VIOLATION | SQLITE_CONSTRAINT_FOREIGNKEY | SQLITE_CONSTRAINT_TRIGGER
    )
}

/// Postgres codes for a role or database that already exists
pub fn is_duplicate_object_code(code: &str) -> bool {
    matches!(code, SQLSTATE_DUPLICATE_OBJECT | SQLSTATE_DUPLICATE_DATABASE)
}
