//! Gateway B: server-side status lookup
//!
//! Amounts are reported in minor units.

use super::{AdapterError, CheckoutContext, PaymentAdapter};
use crate::domain::aggregates::{PaymentEvent, PaymentProvider, PaymentStatus};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct GatewayBStatus {
    pub pidx: String,
    #[serde(default)]
    pub purchase_order_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub total_amount: i64,
    pub status: String,
}

impl GatewayBStatus {
    pub fn status(&self) -> PaymentStatus {
        match self.status.as_str() {
            "Completed" => PaymentStatus::Completed,
            "Pending" | "Initiated" => PaymentStatus::Pending,
            "Refunded" | "Partially Refunded" => PaymentStatus::Refunded,
            "User canceled" | "Expired" => PaymentStatus::Canceled,
            _ => PaymentStatus::Failed,
        }
    }

    /// The merchant's own order id when echoed back, else the gateway's payment id.
    fn merchant_txn_id(&self) -> Option<&str> {
        self.purchase_order_id.as_deref().filter(|id| !id.trim().is_empty())
            .or_else(|| Some(self.pidx.as_str()).filter(|id| !id.trim().is_empty()))
    }
}

impl PaymentAdapter for GatewayBStatus {
    fn into_event(self, context: CheckoutContext) -> Result<PaymentEvent, AdapterError> {
        let merchant_txn_id = self.merchant_txn_id().ok_or(AdapterError::MissingField("pidx"))?.to_string();
        if self.total_amount < 0 {
            return Err(AdapterError::Amount(self.total_amount.to_string()));
        }
        Ok(PaymentEvent {
            provider: PaymentProvider::GatewayB,
            merchant_txn_id,
            amount: Decimal::new(self.total_amount, 2),
            status: self.status(),
            timestamp: Utc::now(),
            order_data: context.order_data,
            user_id: context.user_id,
        })
    }
}
