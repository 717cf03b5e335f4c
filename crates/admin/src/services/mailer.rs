//! Transactional mail for the back office.
//!
//! Sends are fire-and-forget: routes spawn them in a background task and
//! log failures. A failed notification never rolls back the state change
//! that triggered it.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error;

use luna_core::promo::InfluencerCampaign;
use luna_core::{Email, Order};

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
}

impl Mailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay host or sender address is invalid.
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
        })
    }

    /// Email the customer that their order shipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or sent.
    pub async fn send_order_shipped(
        &self,
        order: &Order,
        tracking_number: &str,
    ) -> Result<(), MailerError> {
        let to: Mailbox = order.user_email.as_str().parse()?;

        let body = format!(
            "Hi {},\n\nYour order {} is on its way!\n\nTracking number: {}\n",
            order.user_name, order.reference, tracking_number
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Your order {} has shipped", order.reference))
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }

    /// Invite an influencer to accept their new campaign.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or sent.
    pub async fn send_campaign_invite(
        &self,
        campaign: &InfluencerCampaign,
        email: &Email,
    ) -> Result<(), MailerError> {
        let to: Mailbox = email.as_str().parse()?;

        let body = format!(
            "Hi {},\n\nYou have been invited to a Luna Botanicals campaign.\n\n\
             Your code: {}\nCommission rate: {}%\n\n\
             The code goes live once you accept the campaign.\n",
            campaign.influencer_name, campaign.promo_code, campaign.commission_rate
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Your Luna Botanicals campaign invite")
            .body(body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Spawn a send in the background and log any failure.
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
