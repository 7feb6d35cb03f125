//! Command implementations.

pub mod cart;
pub mod catalog;
pub mod migrate;

use atelier_storefront::catalog::CatalogError;
use atelier_storefront::config::{AtelierConfig, ConfigError};
use atelier_storefront::db::{RepositoryError, create_pool};
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository query failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Catalog could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Load configuration and connect to the storefront database.
async fn connect() -> Result<(AtelierConfig, PgPool), CliError> {
    let config = AtelierConfig::from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = create_pool(&config.database_url).await?;
    Ok((config, pool))
}
