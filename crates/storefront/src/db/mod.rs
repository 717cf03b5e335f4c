//! Database operations for the shared Luna `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - role and shipping details (identity comes from the auth provider)
//! - `orders` - placed orders, denormalized lines in JSONB
//! - `promo_codes` - generic discount codes
//! - `campaigns` - influencer campaigns
//! - `tower_sessions` - session store (created by the session layer)
//!
//! Both binaries connect to the same database; orders, codes, and users are
//! joint domain state. Migrations live in `crates/storefront/migrations/`
//! and run via:
//! ```bash
//! cargo run -p luna-cli -- migrate
//! ```

pub mod orders;
pub mod promos;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use orders::OrderRepository;
pub use promos::PromoDirectory;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entity not found.
    #[error("not found")]
    NotFound,

    /// Uniqueness or state conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data failed to decode into a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Embedded migrations for the shared database.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
