//! Session establishment.
//!
//! Authentication itself is the external provider's job; these routes only
//! project a verified `{name, email}` pair into a local user record and the
//! session. The token verification middleware upstream is what makes the
//! pair trustworthy.

use axum::extract::State;
use axum::{Json, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use luna_core::Email;

use crate::db::UserRepository;
use crate::error::{AppError, FieldError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Verified identity handed over by the auth provider.
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub name: String,
    pub email: String,
}

/// Establish a session for a verified identity.
///
/// Creates the local customer record on first sight and rotates the session
/// id so the pre-login session cannot be replayed as the shopper.
#[instrument(skip(state, session, input))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<LoginInput>,
) -> Result<Json<CurrentUser>> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "name",
            "is required",
        )]));
    }
    let email = Email::parse(input.email.trim())
        .map_err(|e| AppError::Validation(vec![FieldError::new("email", e.to_string())]))?;

    let user = UserRepository::new(state.pool())
        .get_or_create(name, &email)
        .await?;

    let current = CurrentUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    };

    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("failed to rotate session: {e}")))?;
    session
        .insert(session_keys::CURRENT_USER, &current)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist session user: {e}")))?;

    Ok(Json(current))
}

/// Who is logged in, if anyone.
#[instrument(skip(auth))]
pub async fn me(auth: RequireAuth) -> Json<CurrentUser> {
    let RequireAuth(user) = auth;
    Json(user)
}

/// End the session. The cart goes with it.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;
    Ok(StatusCode::NO_CONTENT)
}
