//! Operator account management.
//!
//! Identity comes from the external auth provider; an operator account is
//! just a user row with a back-office role, which is what the admin
//! binary's login checks.

use secrecy::ExposeSecret;
use sqlx::PgPool;

use luna_core::{Email, UserRole};

use super::{CommandError, database_url};

/// Create a user with a back-office role, or promote an existing user.
///
/// # Errors
///
/// Returns an error for an invalid email or role, or if the database
/// operation fails.
pub async fn create(email: &str, name: &str, role: &str) -> Result<(), CommandError> {
    let email =
        Email::parse(email.trim()).map_err(|e| CommandError::InvalidEmail(e.to_string()))?;

    let role: UserRole = role
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;

    let url = database_url()?;
    let pool = PgPool::connect(url.expose_secret()).await?;

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) \
         ON CONFLICT (email) DO UPDATE SET role = $3, updated_at = now() \
         RETURNING id",
    )
    .bind(name)
    .bind(email.as_str())
    .bind(role.to_string())
    .fetch_one(&pool)
    .await?;

    tracing::info!(user_id = id, email = %email, role = %role, "Operator account ready");
    Ok(())
}
