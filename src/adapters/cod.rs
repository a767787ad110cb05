//! Cash on delivery
//!
//! Nothing is paid up front; placing the order is the completion signal.

use super::{parse_amount, AdapterError, CheckoutContext, PaymentAdapter};
use crate::domain::aggregates::{PaymentEvent, PaymentProvider, PaymentStatus};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodOrder {
    #[serde(default)]
    pub order_reference: Option<String>,
    pub amount: String,
}

impl PaymentAdapter for CodOrder {
    fn into_event(self, context: CheckoutContext) -> Result<PaymentEvent, AdapterError> {
        let merchant_txn_id = self.order_reference
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| format!("COD-{}", Uuid::new_v4()));
        Ok(PaymentEvent {
            provider: PaymentProvider::Cod,
            merchant_txn_id,
            amount: parse_amount(&self.amount)?,
            status: PaymentStatus::AwaitingCollection,
            timestamp: Utc::now(),
            order_data: context.order_data,
            user_id: context.user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::context;

    #[test]
    fn test_reference_generated_when_absent() {
        let event = CodOrder { order_reference: None, amount: "2,670".into() }.into_event(context()).unwrap();
        assert!(event.merchant_txn_id.starts_with("COD-"));
        assert_eq!(event.status, PaymentStatus::AwaitingCollection);
        assert!(event.status.is_fulfillable());

        let event = CodOrder { order_reference: Some("COD-42".into()), amount: "10".into() }.into_event(context()).unwrap();
        assert_eq!(event.merchant_txn_id, "COD-42");
    }
}
