//! Adapter for the external payment processor.
//!
//! The processor speaks minor units (cents), so decimal prices are converted
//! exactly once, here, at the boundary. Processor rejections and timeouts
//! surface as `GatewayError` / `GatewayTimeout`, distinct from internal
//! failures.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::errors::ServiceError;

/// A payment authorization created with the processor. The client secret is
/// handed to the browser to complete payment out-of-band.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment authorization for `amount` in the given currency.
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentIntent, ServiceError>;
}

/// Converts a decimal currency amount to the processor's minor-unit
/// representation. Rejects non-positive amounts and amounts with sub-cent
/// precision rather than silently rounding money.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "amount must be positive".to_string(),
        ));
    }

    let minor = amount * Decimal::ONE_HUNDRED;
    if !minor.fract().is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "amount {amount} has sub-cent precision"
        )));
    }

    minor.trunc().to_i64().ok_or_else(|| {
        ServiceError::ValidationError(format!("amount {amount} out of range"))
    })
}

/// Stripe-backed gateway. Requests carry a bounded timeout so a slow
/// processor surfaces as `GatewayTimeout` instead of hanging the request.
pub struct StripeGateway {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(
        secret_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    client_secret: String,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self), fields(%amount, currency))]
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        let minor_units = to_minor_units(amount)?;

        let params = [
            ("amount", minor_units.to_string()),
            ("currency", currency.to_string()),
            ("payment_method_types[]", "card".to_string()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::GatewayTimeout
                } else {
                    ServiceError::GatewayError(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "payment processor rejected intent request");
            return Err(ServiceError::GatewayError(format!(
                "processor returned {status}: {body}"
            )));
        }

        let intent: IntentResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("malformed processor response: {e}")))?;

        Ok(PaymentIntent {
            client_secret: intent.client_secret,
        })
    }
}
