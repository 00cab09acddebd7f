//! Shared types, rounding helpers, and configuration for Tessera.
//!
//! This crate provides common types used across all other crates:
//! - Typed string identifiers for tenants, values, contacts and transactions
//! - Integer-cents rounding (banker's rounding and round-half-up)
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
