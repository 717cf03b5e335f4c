//! Primitive domain types shared across the workspace.

pub mod email;
pub mod id;
pub mod money;
pub mod status;
