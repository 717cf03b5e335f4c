//! External service clients for the admin binary.

pub mod mailer;
