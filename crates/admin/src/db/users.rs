//! User administration: listing, search, and role management.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use luna_core::{Email, UserId, UserRole};

use super::RepositoryError;

/// A user as the back office sees them. Shipping details stay in the
/// storefront; the admin panel cares about identity and role.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_admin_user(self) -> Result<AdminUser, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let role: UserRole = self
            .role
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid user role: {e}")))?;

        Ok(AdminUser {
            id: UserId::new(self.id),
            name: self.name,
            email,
            role,
            created_at: self.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, role, created_at";

/// Repository for user administration.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<AdminUser>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");

        let rows = sqlx::query_as::<_, UserRow>(&query)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(UserRow::into_admin_user).collect()
    }

    /// Search users by name or email, case-insensitive substring match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, term: &str) -> Result<Vec<AdminUser>, RepositoryError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE name ILIKE $1 OR email ILIKE $1 \
             ORDER BY created_at DESC"
        );

        let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));

        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(&pattern)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(UserRow::into_admin_user).collect()
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<AdminUser>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        row.map(UserRow::into_admin_user).transpose()
    }

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<AdminUser>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(UserRow::into_admin_user).transpose()
    }

    /// Replace a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist,
    /// `RepositoryError::Database` for other database errors.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<AdminUser, RepositoryError> {
        let query = format!(
            "UPDATE users SET role = $1, updated_at = now() WHERE id = $2 RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(role.to_string())
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.into_admin_user()
    }
}
