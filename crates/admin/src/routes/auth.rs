//! Operator session establishment.
//!
//! As on the storefront, identity is verified by the external auth
//! provider; the admin panel maps a verified email onto the local user
//! record and rejects anyone whose role is plain customer.

use axum::extract::State;
use axum::{Json, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use luna_core::Email;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::can_access_admin;
use crate::middleware::RequireOperator;
use crate::models::{CurrentOperator, session_keys};
use crate::state::AppState;

/// Verified identity handed over by the auth provider.
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
}

/// Establish an operator session for a verified identity.
#[instrument(skip(state, session, input))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<LoginInput>,
) -> Result<Json<CurrentOperator>> {
    let email = Email::parse(input.email.trim())
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;

    let user = UserRepository::new(state.pool())
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown user".to_owned()))?;

    if !can_access_admin(user.role) {
        tracing::warn!(email = %user.email, "Customer attempted admin login");
        return Err(AppError::Forbidden(
            "this account has no back-office access".to_owned(),
        ));
    }

    let operator = CurrentOperator {
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
        .insert(session_keys::CURRENT_OPERATOR, &operator)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist session operator: {e}")))?;

    tracing::info!(email = %operator.email, role = %operator.role, "Operator logged in");

    Ok(Json(operator))
}

/// Who is logged in.
#[instrument(skip(auth))]
pub async fn me(auth: RequireOperator) -> Json<CurrentOperator> {
    let RequireOperator(operator) = auth;
    Json(operator)
}

/// End the operator session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;
    Ok(StatusCode::NO_CONTENT)
}
