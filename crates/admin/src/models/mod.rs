//! Admin domain models and session types.

use serde::{Deserialize, Serialize};

use luna_core::{Email, UserId, UserRole};

/// Session-stored back-office identity.
///
/// Identity is established by the external auth provider; the role comes
/// from the local user record at login time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentOperator {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

/// Session keys for admin state.
pub mod session_keys {
    /// Key for storing the current logged-in operator.
    pub const CURRENT_OPERATOR: &str = "current_operator";
}
