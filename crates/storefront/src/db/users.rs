//! User repository for the storefront.
//!
//! The auth provider owns identity; this repository only maintains the local
//! projection (name, role, shipping address) keyed by email.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use luna_core::{Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::user::{ShippingAddress, User};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    role: String,
    shipping_address: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let role: UserRole = self
            .role
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid user role: {e}")))?;

        let shipping_address = self
            .shipping_address
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid shipping address: {e}"))
            })?;

        Ok(User {
            id: UserId::new(self.id),
            name: self.name,
            email,
            role,
            shipping_address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, role, shipping_address, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Find a user by email, creating a customer record on first sight.
    ///
    /// Called when the auth provider hands the storefront a verified
    /// `{name, email}` pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, name: &str, email: &Email) -> Result<User, RepositoryError> {
        let query = format!(
            "INSERT INTO users (name, email) VALUES ($1, $2) \
             ON CONFLICT (email) DO UPDATE SET updated_at = now() \
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(name)
            .bind(email.as_str())
            .fetch_one(self.pool)
            .await?;

        row.into_user()
    }

    /// Remember the shipping address entered at checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist,
    /// `RepositoryError::Database` for other database errors.
    pub async fn save_shipping_address(
        &self,
        user_id: UserId,
        address: &ShippingAddress,
    ) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(address).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize address: {e}"))
        })?;

        let result =
            sqlx::query("UPDATE users SET shipping_address = $1, updated_at = now() WHERE id = $2")
                .bind(&value)
                .bind(user_id.as_i64())
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
