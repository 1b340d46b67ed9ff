//! SupplyBook Common Library
//!
//! Shared code for the SupplyBook bookkeeping tools including:
//! - SeaORM entity models for enterprises, products and supplies
//! - Schema provisioning and database bootstrap
//! - Repository pattern for record access
//! - Error types and handling
//! - Configuration management
//! - Metrics

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, NewEnterprise, NewProduct, NewSupply, Repository};
pub use errors::{AppError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
