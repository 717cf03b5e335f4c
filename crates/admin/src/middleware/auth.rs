//! Role-gated authentication extractors for admin route handlers.
//!
//! Every extractor reads the [`CurrentOperator`] projected into the session
//! at login; the tiered variants additionally check the role capability.
//! Customers never get an admin session in the first place (rejected at
//! login), so [`RequireOperator`] only guards against no session at all.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use luna_core::UserRole;

use crate::models::{CurrentOperator, session_keys};

/// Why an extractor rejected the request.
pub enum AuthRejection {
    /// No operator attached to the session.
    Unauthorized,
    /// Logged in, but the role lacks the capability.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

async fn current_operator(parts: &mut Parts) -> Result<CurrentOperator, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    session
        .get(session_keys::CURRENT_OPERATOR)
        .await
        .ok()
        .flatten()
        .ok_or(AuthRejection::Unauthorized)
}

/// Extractor that requires any logged-in back-office user.
///
/// Influencers pass this gate too; routes that need more use the tiered
/// extractors below.
pub struct RequireOperator(pub CurrentOperator);

impl<S> FromRequestParts<S> for RequireOperator
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_operator(parts).await?))
    }
}

/// Extractor that requires a role allowed to manage orders
/// (admin, sales, fulfillment).
pub struct RequireOrderManager(pub CurrentOperator);

impl<S> FromRequestParts<S> for RequireOrderManager
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let operator = current_operator(parts).await?;
        if !operator.role.can_manage_orders() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(operator))
    }
}

/// Extractor that requires a role allowed to manage promos and campaigns
/// (admin, digital marketer).
pub struct RequireMarketer(pub CurrentOperator);

impl<S> FromRequestParts<S> for RequireMarketer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let operator = current_operator(parts).await?;
        if !operator.role.can_manage_marketing() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(operator))
    }
}

/// Whether a role is allowed into the admin panel at all.
///
/// Customers authenticate against the storefront only.
#[must_use]
pub fn can_access_admin(role: UserRole) -> bool {
    role != UserRole::Customer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customers_cannot_access_admin() {
        assert!(!can_access_admin(UserRole::Customer));
        assert!(can_access_admin(UserRole::Admin));
        assert!(can_access_admin(UserRole::Sales));
        assert!(can_access_admin(UserRole::Fulfillment));
        assert!(can_access_admin(UserRole::DigitalMarketer));
        assert!(can_access_admin(UserRole::Influencer));
    }
}
