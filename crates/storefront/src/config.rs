//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (PostgreSQL collaborators only)
//! - `ATELIER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `ATELIER_CART_KEY` - Namespaced key of the anonymous cart (default: `atelier.cart`)
//! - `ATELIER_NOTIFICATION_CAPACITY` - Buffered notifications per subscriber (default: 64)
//! - `ATELIER_CLEAR_ATTEMPTS` - Attempts to clear the anonymous cart after a merge (default: 3)
//! - `ATELIER_READ_ATTEMPTS` - Attempts to read the remote cart on sign-in (default: 3)
//! - `ATELIER_RETRY_DELAY_MS` - Delay between attempts in milliseconds (default: 100)
//! - `ATELIER_CATALOG_TTL_SECS` - Catalog snapshot cache lifetime (default: 300)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::models::session::keys;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart manager tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Key of the anonymous cart in local storage.
    pub storage_key: String,
    /// Capacity of the notification broadcast channel.
    pub notification_capacity: usize,
    /// Attempts made to delete the anonymous cart after a merge.
    pub clear_attempts: u32,
    /// Attempts made to read the remote cart on sign-in.
    pub read_attempts: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: keys::ANONYMOUS_CART.to_owned(),
            notification_capacity: 64,
            clear_attempts: 3,
            read_attempts: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Application configuration for binaries that talk to `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct AtelierConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Cart manager tuning
    pub cart: CartConfig,
    /// How long a loaded catalog snapshot is served from cache
    pub catalog_ttl: Duration,
}

impl AtelierConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("ATELIER_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("ATELIER_DATABASE_URL".to_string()))?;

        let cart = CartConfig::from_lookup(&lookup)?;
        let catalog_ttl = Duration::from_secs(parse_or_default(
            &lookup,
            "ATELIER_CATALOG_TTL_SECS",
            300,
        )?);

        Ok(Self {
            database_url,
            cart,
            catalog_ttl,
        })
    }
}

impl CartConfig {
    /// Cart tuning from a variable lookup, using defaults for anything unset.
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage_key = lookup("ATELIER_CART_KEY")
            .filter(|key| !key.trim().is_empty())
            .unwrap_or(defaults.storage_key);
        let notification_capacity = parse_or_default(
            lookup,
            "ATELIER_NOTIFICATION_CAPACITY",
            defaults.notification_capacity,
        )?;
        let clear_attempts =
            parse_or_default(lookup, "ATELIER_CLEAR_ATTEMPTS", defaults.clear_attempts)?;
        let read_attempts =
            parse_or_default(lookup, "ATELIER_READ_ATTEMPTS", defaults.read_attempts)?;
        let retry_delay =
            Duration::from_millis(parse_or_default(lookup, "ATELIER_RETRY_DELAY_MS", 100)?);

        if notification_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ATELIER_NOTIFICATION_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            storage_key,
            notification_capacity,
            clear_attempts: clear_attempts.max(1),
            read_attempts: read_attempts.max(1),
            retry_delay,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to a default when unset.
fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
