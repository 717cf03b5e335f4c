//! Middleware: sessions and role-gated authentication extractors.

pub mod auth;
pub mod session;

pub use auth::{RequireMarketer, RequireOperator, RequireOrderManager};
pub use session::create_session_layer;
