//! Paystack API client for payment initialization and verification.
//!
//! The gateway is treated as an opaque capability: checkout initializes a
//! transaction with an idempotency reference and an amount in minor units,
//! the shopper completes (or abandons) payment on the gateway's side, and
//! the callback verifies the reference before any order is created.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PaystackConfig;

/// Errors that can occur when interacting with the Paystack API.
#[derive(Debug, Error)]
pub enum PaystackError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Transaction exists but was not successfully paid.
    #[error("Payment not successful for reference {reference}: {status}")]
    NotSuccessful { reference: String, status: String },
}

/// Request to initialize a transaction.
#[derive(Debug, Clone, Serialize)]
pub struct InitializePayment {
    /// Amount in minor units (cents).
    pub amount: i64,
    pub currency: String,
    /// Caller-supplied idempotency/correlation token.
    pub reference: String,
    pub email: String,
    pub callback_url: String,
}

/// An initialized payment session the shopper is sent to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Outcome of verifying a transaction reference.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub reference: String,
    /// Amount actually charged, in minor units.
    pub amount: i64,
    pub currency: String,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    amount: i64,
    currency: String,
}

/// Paystack API client.
#[derive(Clone)]
pub struct PaystackClient {
    client: reqwest::Client,
    base_url: String,
}

impl PaystackClient {
    /// Create a new Paystack API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &PaystackConfig) -> Result<Self, PaystackError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PaystackError::Parse(format!("Invalid secret key format: {e}")))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Initialize a transaction and get the authorization URL for the shopper.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or is rejected.
    pub async fn initialize(
        &self,
        request: &InitializePayment,
    ) -> Result<PaymentSession, PaystackError> {
        let url = format!("{}/transaction/initialize", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaystackError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ApiResponse<PaymentSession> = response
            .json()
            .await
            .map_err(|e| PaystackError::Parse(e.to_string()))?;

        if !body.status {
            return Err(PaystackError::Api {
                status: status.as_u16(),
                message: body.message,
            });
        }

        body.data
            .ok_or_else(|| PaystackError::Parse("initialize response missing data".to_owned()))
    }

    /// Verify a transaction reference after the shopper returns.
    ///
    /// Only a transaction the gateway reports as `success` yields a
    /// [`VerifiedPayment`]; anything else (abandoned, failed, unknown) is an
    /// error and the checkout flow stops before order creation.
    ///
    /// # Errors
    ///
    /// Returns [`PaystackError::NotSuccessful`] for unpaid transactions and
    /// transport/API errors otherwise.
    pub async fn verify(&self, reference: &str) -> Result<VerifiedPayment, PaystackError> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.base_url,
            urlencode(reference)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaystackError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ApiResponse<VerifyData> = response
            .json()
            .await
            .map_err(|e| PaystackError::Parse(e.to_string()))?;

        let data = body
            .data
            .ok_or_else(|| PaystackError::Parse("verify response missing data".to_owned()))?;

        if data.status != "success" {
            return Err(PaystackError::NotSuccessful {
                reference: data.reference,
                status: data.status,
            });
        }

        Ok(VerifiedPayment {
            reference: data.reference,
            amount: data.amount,
            currency: data.currency,
        })
    }
}

/// Percent-encode a path segment. References are uuids in practice, but the
/// gateway echoes whatever the caller supplied at initialization.
fn urlencode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencode_passes_uuids_through() {
        let reference = "0c9e2f6a-7a44-4c2f-9b1e-3f8d2b1a5c70";
        assert_eq!(urlencode(reference), reference);
    }

    #[test]
    fn test_urlencode_escapes_reserved_characters() {
        assert_eq!(urlencode("a/b c"), "a%2Fb+c");
    }
}
