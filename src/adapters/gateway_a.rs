//! Gateway A: redirect completion
//!
//! The gateway redirects back with a `data` query parameter holding a
//! base64-encoded JSON document.

use super::{parse_amount, AdapterError, CheckoutContext, PaymentAdapter};
use crate::domain::aggregates::{PaymentEvent, PaymentProvider, PaymentStatus};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct GatewayACompletion {
    pub transaction_uuid: String,
    #[serde(default)]
    pub transaction_code: Option<String>,
    pub status: String,
    pub total_amount: String,
}

impl GatewayACompletion {
    pub fn decode(data: &str) -> Result<Self, AdapterError> {
        let bytes = STANDARD.decode(data.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn status(&self) -> PaymentStatus {
        match self.status.as_str() {
            "COMPLETE" => PaymentStatus::Completed,
            "PENDING" | "AMBIGUOUS" => PaymentStatus::Pending,
            "FULL_REFUND" | "PARTIAL_REFUND" => PaymentStatus::Refunded,
            "CANCELED" => PaymentStatus::Canceled,
            _ => PaymentStatus::Failed,
        }
    }
}

impl PaymentAdapter for GatewayACompletion {
    fn into_event(self, context: CheckoutContext) -> Result<PaymentEvent, AdapterError> {
        if self.transaction_uuid.trim().is_empty() {
            return Err(AdapterError::MissingField("transaction_uuid"));
        }
        Ok(PaymentEvent {
            provider: PaymentProvider::GatewayA,
            amount: parse_amount(&self.total_amount)?,
            status: self.status(),
            merchant_txn_id: self.transaction_uuid,
            timestamp: Utc::now(),
            order_data: context.order_data,
            user_id: context.user_id,
        })
    }
}
