//! Transactional mail for the storefront.
//!
//! All sends are fire-and-forget from the caller's point of view: routes
//! spawn [`Mailer::send_order_confirmation`] and friends in a background
//! task and only log failures. Nothing here may fail a checkout.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error;

use luna_core::Order;

use crate::config::MailConfig;

/// Errors that can occur when sending mail.
#[derive(Debug, Error)]
pub enum MailerError {
    /// Recipient or sender address failed to parse.
    #[error("address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Message could not be built.
    #[error("message error: {0}")]
    Build(#[from] lettre::error::Error),

    /// SMTP transport failed.
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// SMTP-backed notifier.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    operator: Mailbox,
}

impl Mailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay host or addresses are invalid.
    pub fn new(config: &MailConfig) -> Result<Self, MailerError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from: config.from_address.parse()?,
            operator: config.operator_address.parse()?,
        })
    }

    /// Email the customer their order confirmation.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or sent.
    pub async fn send_order_confirmation(&self, order: &Order) -> Result<(), MailerError> {
        let to: Mailbox = order.user_email.as_str().parse()?;

        let mut body = format!(
            "Hi {},\n\nThank you for your order!\n\nReference: {}\n\n",
            order.user_name, order.reference
        );
        for line in &order.lines {
            body.push_str(&format!(
                "  {} ({}) x{} - {}\n",
                line.product_name, line.size, line.quantity, line.line_total()
            ));
        }
        body.push_str(&format!("\nTotal: {}\n", order.total));

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Your Luna Botanicals order {}", order.reference))
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }

    /// Alert the operator inbox that a new order landed.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or sent.
    pub async fn send_new_order_alert(&self, order: &Order) -> Result<(), MailerError> {
        let body = format!(
            "New order {} from {} <{}>\nItems: {}\nTotal: {}\n",
            order.reference,
            order.user_name,
            order.user_email,
            order.lines.len(),
            order.total
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(self.operator.clone())
            .subject(format!("New order {}", order.reference))
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Spawn a send in the background and log any failure.
///
/// Notification failures never propagate to the shopper and are never
/// retried here; reconciliation is an operational concern.
pub fn fire_and_forget<F>(what: &'static str, send: F)
where
    F: std::future::Future<Output = Result<(), MailerError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = send.await {
            tracing::error!(error = %e, "Failed to send {what} notification");
        }
    });
}
