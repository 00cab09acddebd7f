//! HTTP client for the Stripe charges and refunds API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tessera_core::execution::{
    CaptureRequest, ChargeRequest, PaymentProcessor, ProcessorError, RefundRequest,
};
use tessera_core::plan::ProcessorReceipt;
use tessera_shared::config::ProcessorConfig;

use crate::wire::{self, ChargeObject, RefundObject};

/// Stripe-backed [`PaymentProcessor`].
#[derive(Debug, Clone)]
pub struct StripeProcessor {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeProcessor {
    /// Creates a processor client.
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// Builds a client from configuration.
    ///
    /// Returns `Ok(None)` when no secret key is configured; checkouts with a
    /// processor source then fail with `ProcessorNotConfigured`.
    pub fn from_config(config: &ProcessorConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(secret_key) = config.secret_key.as_deref() else {
            return Ok(None);
        };
        Self::new(
            config.api_base.as_str(),
            secret_key,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&'static str, String)],
        idempotency_key: &str,
    ) -> Result<T, ProcessorError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", idempotency_key)
            .form(form)
            .send()
            .await
            .map_err(|e| ProcessorError::Other {
                message: format!("request to {path} failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = wire::classify(status.as_u16(), &body);
            tracing::warn!(
                path,
                idempotency_key,
                status = status.as_u16(),
                code = error.error_code(),
                "processor request rejected"
            );
            return Err(error);
        }

        response.json::<T>().await.map_err(|e| ProcessorError::Other {
            message: format!("unreadable response from {path}: {e}"),
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn charge(&self, request: &ChargeRequest) -> Result<ProcessorReceipt, ProcessorError> {
        let charge: ChargeObject = self
            .post("/v1/charges", &wire::charge_form(request), &request.idempotency_key)
            .await?;
        Ok(charge.into())
    }

    async fn refund(&self, request: &RefundRequest) -> Result<ProcessorReceipt, ProcessorError> {
        let refund: RefundObject = self
            .post("/v1/refunds", &wire::refund_form(request), &request.idempotency_key)
            .await?;
        Ok(refund.into())
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<ProcessorReceipt, ProcessorError> {
        let path = format!("/v1/charges/{}/capture", request.charge_id);
        let charge: ChargeObject = self
            .post(&path, &wire::capture_form(request), &request.idempotency_key)
            .await?;
        Ok(charge.into())
    }
}
