//! User administration routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use luna_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::db::users::AdminUser;
use crate::error::{AppError, Result};
use crate::middleware::RequireOperator;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Optional case-insensitive name/email search term.
    pub q: Option<String>,
}

/// List users, optionally filtered by a search term.
#[instrument(skip(state, auth))]
pub async fn list(
    State(state): State<AppState>,
    auth: RequireOperator,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AdminUser>>> {
    let RequireOperator(operator) = auth;
    if operator.role != UserRole::Admin {
        return Err(AppError::Forbidden("admin only".to_owned()));
    }

    let repo = UserRepository::new(state.pool());
    let users = match query.q.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => repo.search(term).await?,
        _ => repo.list().await?,
    };

    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleInput {
    pub role: UserRole,
}

/// Replace a user's role.
///
/// Admin only, and an admin cannot demote themselves; losing the last
/// admin would lock the panel.
#[instrument(skip(state, auth, input), fields(user_id = id))]
pub async fn set_role(
    State(state): State<AppState>,
    auth: RequireOperator,
    Path(id): Path<i64>,
    Json(input): Json<SetRoleInput>,
) -> Result<Json<AdminUser>> {
    let RequireOperator(operator) = auth;
    if operator.role != UserRole::Admin {
        return Err(AppError::Forbidden("admin only".to_owned()));
    }

    let target = UserId::new(id);
    if target == operator.id && input.role != UserRole::Admin {
        return Err(AppError::BadRequest(
            "cannot remove your own admin role".to_owned(),
        ));
    }

    let updated = UserRepository::new(state.pool())
        .set_role(target, input.role)
        .await?;

    tracing::info!(
        user_id = %updated.id,
        role = %updated.role,
        changed_by = %operator.email,
        "User role updated"
    );

    Ok(Json(updated))
}
