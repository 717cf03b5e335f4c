//! External service clients: payment gateway and transactional mail.

pub mod mailer;
pub mod paystack;
