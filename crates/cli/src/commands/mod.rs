//! CLI subcommand implementations.

pub mod migrate;
pub mod operator;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid role name.
    #[error("Invalid role: {0}. Valid roles: customer, admin, influencer, sales, fulfillment, digital_marketer")]
    InvalidRole(String),

    /// Invalid email address.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

/// Resolve the shared database URL from the environment.
///
/// # Errors
///
/// Returns `CommandError::MissingEnvVar` if neither `LUNA_DATABASE_URL`
/// nor `DATABASE_URL` is set.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("LUNA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("LUNA_DATABASE_URL"))
}
