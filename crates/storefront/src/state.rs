//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::mailer::{Mailer, MailerError};
use crate::services::paystack::{PaystackClient, PaystackError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment client: {0}")]
    Paystack(#[from] PaystackError),
    #[error("mailer: {0}")]
    Mailer(#[from] MailerError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; gives handlers the pool, configuration,
/// and external-service clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    paystack: PaystackClient,
    mailer: Mailer,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment or mail client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let paystack = PaystackClient::new(&config.paystack)?;
        let mailer = Mailer::new(&config.mail)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                paystack,
                mailer,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn paystack(&self) -> &PaystackClient {
        &self.inner.paystack
    }

    /// Get a reference to the transactional mailer.
    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }
}
