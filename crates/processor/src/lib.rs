//! Card processor client for Tessera.
//!
//! [`StripeProcessor`] implements [`tessera_core::execution::PaymentProcessor`]
//! against the Stripe REST API: form-encoded requests, one `Idempotency-Key`
//! header per operation, and error bodies classified into
//! [`tessera_core::execution::ProcessorError`] variants.

pub mod client;
pub mod wire;

pub use client::StripeProcessor;
