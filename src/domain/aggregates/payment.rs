//! Normalized payment events

use super::purchase::PurchaseLine;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentProvider {
    #[serde(rename = "gatewayA")] GatewayA,
    #[serde(rename = "gatewayB")] GatewayB,
    #[serde(rename = "cod")] Cod,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self { Self::GatewayA => "gatewayA", Self::GatewayB => "gatewayB", Self::Cod => "cod" }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentStatus { Completed, AwaitingCollection, Pending, Canceled, Refunded, Failed }

impl PaymentStatus {
    /// Paid online, or a cash-on-delivery order that was placed.
    pub fn is_fulfillable(&self) -> bool { matches!(self, Self::Completed | Self::AwaitingCollection) }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub country: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub address: ShippingAddress,
    /// Quoted at checkout; recomputed from package weight when absent.
    #[serde(default)]
    pub cost: Option<Decimal>,
}

/// Shipping and product summary captured at checkout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub customer: CustomerInfo,
    pub shipping: ShippingDetails,
    pub lines: Vec<PurchaseLine>,
}

/// A payment that reached a terminal state, whichever provider produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub provider: PaymentProvider,
    pub merchant_txn_id: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
    pub order_data: OrderData,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl PaymentEvent {
    pub fn lines(&self) -> &[PurchaseLine] { &self.order_data.lines }

    /// Authenticated user, if any. Blank ids count as missing.
    pub fn user(&self) -> Option<&str> { self.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty()) }
}

#[cfg(test)]
pub(crate) fn sample_event(lines: Vec<PurchaseLine>) -> PaymentEvent {
    use chrono::TimeZone;
    PaymentEvent {
        provider: PaymentProvider::GatewayA,
        merchant_txn_id: "TXN-1001".into(),
        amount: lines.iter().map(PurchaseLine::line_total).fold(Decimal::ZERO, |acc, t| acc.checked_add(t).unwrap_or(Decimal::MAX)),
        status: PaymentStatus::Completed,
        timestamp: Utc.with_ymd_and_hms(2026, 10, 1, 10, 0, 0).unwrap(),
        order_data: OrderData {
            customer: CustomerInfo { name: "Asha Rai".into(), email: Some("asha@example.com".into()), phone: None },
            shipping: ShippingDetails {
                address: ShippingAddress { full_name: "Asha Rai".into(), line1: "Jhamsikhel 4".into(), city: "Lalitpur".into(), country: "NP".into(), ..Default::default() },
                cost: None,
            },
            lines,
        },
        user_id: Some("u1".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::json!({
            "provider": "gatewayB",
            "merchantTxnId": "TXN-1",
            "amount": "4500",
            "status": "completed",
            "timestamp": "2026-10-01T10:00:00Z",
            "orderData": {
                "customer": {"name": "Asha", "email": "asha@example.com"},
                "shipping": {"address": {"fullName": "Asha", "line1": "Street 1", "city": "Kathmandu", "country": "NP"}},
                "lines": [{"lineId": "l1", "baseEntityId": "P1", "selectedSize": "M", "quantity": 1, "unitPrice": "4500", "title": "Kurta"}]
            },
            "userId": " "
        });
        let e: PaymentEvent = serde_json::from_value(json).unwrap();
        assert_eq!(e.provider, PaymentProvider::GatewayB);
        assert!(e.status.is_fulfillable());
        assert_eq!(e.lines().len(), 1);
        assert_eq!(e.user(), None);
        assert!(e.order_data.customer.validate().is_ok());
    }

    #[test]
    fn test_fulfillable_statuses() {
        assert!(PaymentStatus::AwaitingCollection.is_fulfillable());
        assert!(!PaymentStatus::Pending.is_fulfillable());
        assert!(!PaymentStatus::Refunded.is_fulfillable());
    }
}
