//! Payment event adapters
//!
//! Each payment path reports completion in its own shape. Adapters turn those
//! payloads, together with the checkout context captured before the customer
//! left the storefront, into one [`PaymentEvent`].

mod cod;
mod gateway_a;
mod gateway_b;

pub use cod::CodOrder;
pub use gateway_a::GatewayACompletion;
pub use gateway_b::GatewayBStatus;

use crate::domain::aggregates::{OrderData, PaymentEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload could not be parsed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid amount: {0}")]
    Amount(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/// What the storefront knew about the purchase before handing off to the provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutContext {
    #[serde(default)]
    pub user_id: Option<String>,
    pub order_data: OrderData,
}

/// Provider payload that can be normalized into a [`PaymentEvent`].
pub trait PaymentAdapter {
    fn into_event(self, context: CheckoutContext) -> Result<PaymentEvent, AdapterError>;
}

/// Parses a decimal amount, tolerating thousands separators ("1,250.00").
pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, AdapterError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let amount = Decimal::from_str(&cleaned).map_err(|_| AdapterError::Amount(raw.to_string()))?;
    if amount.is_sign_negative() {
        return Err(AdapterError::Amount(raw.to_string()));
    }
    Ok(amount)
}

#[cfg(test)]
pub(crate) fn context() -> CheckoutContext {
    use crate::domain::aggregates::payment::sample_event;
    use crate::domain::aggregates::purchase::line;
    let event = sample_event(vec![line("l1", "P1", "M", 1)]);
    CheckoutContext { user_id: event.user_id, order_data: event.order_data }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,250.50").unwrap(), Decimal::new(125050, 2));
        assert_eq!(parse_amount(" 100 ").unwrap(), Decimal::from(100));
        assert!(matches!(parse_amount("ten"), Err(AdapterError::Amount(_))));
        assert!(matches!(parse_amount("-5"), Err(AdapterError::Amount(_))));
    }
}
