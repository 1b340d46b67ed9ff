//! SupplyBook Provisioning Tool
//!
//! Prepares a Postgres server for SupplyBook:
//! 1. `init-db`: creates the owning role and the application database
//! 2. `create-tables`: creates the enterprise, product and supply tables
//!
//! Both steps are safe to repeat.

use anyhow::Context;
use clap::{Parser, Subcommand};
use supplybook_common::{
    config::AppConfig,
    db::{self, schema, DbPool},
    metrics, AppError, VERSION,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "supplybook-provision")]
#[command(about = "SupplyBook - database provisioning", long_about = None)]
struct Cli {
    /// Config file to load instead of the config/ directory layering
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the application role and database (requires admin credentials)
    InitDb,
    /// Create the enterprise, product and supply tables
    CreateTables,
    /// Run init-db followed by create-tables
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config);
    metrics::register_metrics();

    info!("Starting SupplyBook provisioning v{}", VERSION);

    let result = match cli.command {
        Commands::InitDb => init_db(&config).await,
        Commands::CreateTables => create_tables(&config).await,
        Commands::All => match init_db(&config).await {
            Ok(()) => create_tables(&config).await,
            Err(e) => Err(e),
        },
    };

    if let Err(ref e) = result {
        error!(error = %e, code = ?e.code(), "Provisioning failed");
    }

    Ok(result?)
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the owning role and the application database
async fn init_db(config: &AppConfig) -> Result<(), AppError> {
    let password = config
        .database
        .password
        .as_deref()
        .ok_or_else(|| AppError::Configuration {
            message: "database.password is required to create the owning role".to_string(),
        })?;
    if config.bootstrap.admin_password.is_none() {
        return Err(AppError::Configuration {
            message: "bootstrap.admin_password is required for init-db".to_string(),
        });
    }

    info!(
        host = %config.database.host,
        admin_database = %config.bootstrap.admin_database,
        "Connecting as administrator..."
    );
    let admin = db::connect(&config.bootstrap.admin_url(&config.database)?, &config.database).await?;

    let outcome = schema::bootstrap_database(
        &admin,
        &config.database.name,
        &config.database.user,
        password,
    )
    .await;

    // Release the admin session before anything connects to the new database
    if let Err(e) = admin.close().await {
        tracing::warn!(error = %e, "Failed to close admin connection");
    }

    let outcome = outcome?;
    info!(
        role_created = outcome.role_created,
        database_created = outcome.database_created,
        "init-db complete"
    );
    Ok(())
}

/// Create the tables in the application database
async fn create_tables(config: &AppConfig) -> Result<(), AppError> {
    let pool = DbPool::new(&config.database).await?;
    schema::create_schema(pool.conn()).await?;
    info!("Tables created successfully");
    Ok(())
}
