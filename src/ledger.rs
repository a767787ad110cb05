//! Processed payment event ledger
//!
//! Guards against running the pipeline twice for the same payment. An event
//! is identified by its provider and merchant transaction id; the first
//! `claim` wins, every later one is refused.

use crate::domain::aggregates::PaymentProvider;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[async_trait]
pub trait ProcessedEventLedger: Send + Sync {
    /// Returns `true` the first time the event is seen.
    async fn claim(&self, provider: PaymentProvider, merchant_txn_id: &str) -> Result<bool, LedgerError>;
}

pub struct PgEventLedger { pool: PgPool }

impl PgEventLedger {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ProcessedEventLedger for PgEventLedger {
    async fn claim(&self, provider: PaymentProvider, merchant_txn_id: &str) -> Result<bool, LedgerError> {
        let result = sqlx::query("INSERT INTO processed_payment_events (provider, merchant_txn_id, processed_at) VALUES ($1, $2, NOW()) ON CONFLICT (provider, merchant_txn_id) DO NOTHING")
            .bind(provider.as_str()).bind(merchant_txn_id)
            .execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Default)]
pub struct MemoryEventLedger { seen: Mutex<HashSet<(PaymentProvider, String)>> }

impl MemoryEventLedger {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ProcessedEventLedger for MemoryEventLedger {
    async fn claim(&self, provider: PaymentProvider, merchant_txn_id: &str) -> Result<bool, LedgerError> {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(seen.insert((provider, merchant_txn_id.to_string())))
    }
}
