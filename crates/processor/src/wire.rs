//! Request forms, response objects and error classification for the Stripe API.

use serde::Deserialize;
use tessera_core::execution::{CaptureRequest, ChargeRequest, ProcessorError, RefundRequest};
use tessera_core::plan::ProcessorReceipt;
use tessera_shared::types::Cents;

/// Form fields for `POST /v1/charges`.
#[must_use]
pub fn charge_form(request: &ChargeRequest) -> Vec<(&'static str, String)> {
    vec![
        ("amount", request.amount.to_string()),
        ("currency", request.currency.to_lowercase()),
        ("source", request.source.clone()),
        ("capture", request.capture.to_string()),
    ]
}

/// Form fields for `POST /v1/refunds`.
///
/// Stripe only accepts a fixed set of refund reasons, so ours travels as metadata.
#[must_use]
pub fn refund_form(request: &RefundRequest) -> Vec<(&'static str, String)> {
    vec![
        ("charge", request.charge_id.clone()),
        ("amount", request.amount.to_string()),
        ("metadata[reason]", request.reason.clone()),
    ]
}

/// Form fields for `POST /v1/charges/{id}/capture`.
#[must_use]
pub fn capture_form(request: &CaptureRequest) -> Vec<(&'static str, String)> {
    vec![("amount", request.amount.to_string())]
}

/// Charge object as returned by charge and capture.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeObject {
    /// Charge id (`ch_...`).
    pub id: String,
    /// Charged amount.
    pub amount: Cents,
}

impl From<ChargeObject> for ProcessorReceipt {
    fn from(charge: ChargeObject) -> Self {
        Self {
            charge_id: charge.id.clone(),
            id: charge.id,
            amount: charge.amount,
        }
    }
}

/// Refund object.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundObject {
    /// Refund id (`re_...`).
    pub id: String,
    /// Refunded charge.
    pub charge: String,
    /// Refunded amount.
    pub amount: Cents,
}

impl From<RefundObject> for ProcessorReceipt {
    fn from(refund: RefundObject) -> Self {
        Self {
            id: refund.id,
            charge_id: refund.charge,
            amount: refund.amount,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
    decline_code: Option<String>,
}

/// Maps a non-success response to a [`ProcessorError`].
#[must_use]
pub fn classify(status: u16, body: &str) -> ProcessorError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("processor responded with HTTP {status}"));

    if status == 429 {
        return ProcessorError::RateLimited { message };
    }

    match parsed.as_ref().and_then(|e| e.kind.as_deref()) {
        Some("card_error") => ProcessorError::CardDeclined {
            message,
            decline_code: parsed.and_then(|e| e.decline_code),
        },
        Some("invalid_request_error") => ProcessorError::InvalidRequest { message },
        _ => ProcessorError::Other { message },
    }
}
