//! Storefront Fulfillment
//!
//! Post-payment fulfillment pipeline for the storefront.
//!
//! ## Features
//! - Per-size stock decrement, one write per stock entity
//! - Cart reconciliation for purchased lines
//! - Admin-facing order snapshots with priority and package metrics
//! - Invoice notification by email
//! - Payment event normalization for online gateways and cash on delivery
//! - Processed-event ledger against duplicate fulfillment

pub mod adapters;
pub mod config;
pub mod domain;
pub mod fulfillment;
pub mod ledger;
pub mod shipping;
pub mod store;

use crate::adapters::AdapterError;
use crate::domain::aggregates::PaymentStatus;
use crate::ledger::LedgerError;
use thiserror::Error;

pub use config::{AppConfig, PipelineConfig};
pub use domain::aggregates::{PaymentEvent, PurchaseLine};
pub use fulfillment::{FulfillmentOrchestrator, FulfillmentOutcome};

// =============================================================================
// Error Types
// =============================================================================

/// Fatal errors. Raised before any side effect; everything that goes wrong
/// inside a phase is reported in [`FulfillmentOutcome`] instead.
#[derive(Error, Debug)]
pub enum FulfillmentError {
    #[error("No authenticated user on payment event")]
    MissingUser,

    #[error("Payment event has no purchased lines")]
    EmptyPurchase,

    #[error("Invalid line {line_id}: {reason}")]
    InvalidLine { line_id: String, reason: String },

    #[error("Payment not settled: {0:?}")]
    PaymentNotSettled(PaymentStatus),

    #[error("Payment event already processed: {0}")]
    AlreadyProcessed(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

pub type Result<T> = std::result::Result<T, FulfillmentError>;
