//! Order snapshot
//!
//! The admin-facing record of a fulfilled payment. Building it is a pure
//! function of the payment event, the fetched product metadata and the
//! pipeline configuration; the orchestrator writes it exactly once.

use super::payment::{CustomerInfo, PaymentEvent, PaymentProvider, PaymentStatus, ShippingAddress};
use super::product::{Dimensions, ProductDetails, DEFAULT_EDGE_CM, DEFAULT_WEIGHT_KG};
use super::purchase::{EntityKind, PurchaseLine};
use crate::config::PipelineConfig;
use crate::domain::value_objects::Money;
use crate::shipping::Destination;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Back-office lifecycle. The pipeline only ever writes `Pending`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderPriority { Normal, High, Urgent }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShippingMethod { DomesticCourier, InternationalExpress }

impl From<Destination> for ShippingMethod {
    fn from(d: Destination) -> Self {
        match d { Destination::Domestic => Self::DomesticCourier, Destination::International => Self::InternationalExpress }
    }
}

/// Order value thresholds, in the domestic currency.
#[derive(Clone, Debug, PartialEq)]
pub struct PriorityThresholds { pub high: Decimal, pub urgent: Decimal, pub quality_check: Decimal }

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self { high: Decimal::from(15_000), urgent: Decimal::from(50_000), quality_check: Decimal::from(10_000) }
    }
}

impl PriorityThresholds {
    pub fn classify(&self, total: Decimal) -> (OrderPriority, bool) {
        let priority = if total >= self.urgent { OrderPriority::Urgent } else if total >= self.high { OrderPriority::High } else { OrderPriority::Normal };
        (priority, total >= self.quality_check)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetrics { pub total_weight_kg: f64, pub total_volume_cm3: f64, pub item_count: u32 }

impl PackageMetrics {
    fn add(&mut self, weight_kg: f64, volume_cm3: f64, quantity: u32) {
        self.total_weight_kg += weight_kg * f64::from(quantity);
        self.total_volume_cm3 += volume_cm3 * f64::from(quantity);
        self.item_count = self.item_count.saturating_add(quantity);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingSummary {
    pub address: ShippingAddress,
    pub destination: Destination,
    pub method: ShippingMethod,
    pub cost: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub line_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub title: String,
    pub size: String,
    pub quantity: u32,
    pub original_price: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub line_total: Decimal,
}

impl ProductSummary {
    fn from_line(line: &PurchaseLine, list_price: Option<Decimal>) -> Self {
        let target = line.target();
        let original_price = list_price.filter(|p| *p > line.unit_price).unwrap_or(line.unit_price);
        let discount_percent = if original_price > Decimal::ZERO {
            ((original_price - line.unit_price) / original_price * Decimal::ONE_HUNDRED).round_dp(2)
        } else {
            Decimal::ZERO
        };
        Self {
            line_id: line.line_id.clone(),
            product_id: line.base_entity_id.clone(),
            variant_id: (target.kind == EntityKind::Variant).then_some(target.entity_id),
            title: line.title.clone(),
            size: line.selected_size.clone(),
            quantity: line.quantity,
            original_price,
            unit_price: line.unit_price,
            discount_percent,
            line_total: line.line_total(),
        }
    }

    fn discount_amount(&self) -> Decimal {
        (self.original_price - self.unit_price).checked_mul(Decimal::from(self.quantity)).unwrap_or(Decimal::MAX)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub order_id: String,
    pub merchant_txn_id: String,
    pub provider: PaymentProvider,
    pub payment_status: PaymentStatus,
    pub user_id: String,
    pub customer: CustomerInfo,
    pub shipping: ShippingSummary,
    pub package: PackageMetrics,
    pub products: Vec<ProductSummary>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub priority: OrderPriority,
    pub requires_quality_check: bool,
    pub admin_status: AdminStatus,
    pub placed_at: DateTime<Utc>,
}

impl OrderSnapshot {
    /// Product metadata is looked up by base entity id; missing entries use defaults.
    pub fn build(order_id: &str, event: &PaymentEvent, details: &HashMap<String, ProductDetails>, config: &PipelineConfig) -> Self {
        let currency = config.currency.domestic.as_str();
        let mut package = PackageMetrics::default();
        let products: Vec<ProductSummary> = event.lines().iter().map(|line| {
            let detail = details.get(&line.base_entity_id);
            let weight = detail.map_or(DEFAULT_WEIGHT_KG, ProductDetails::weight_kg);
            let dimensions = detail.map_or_else(|| Dimensions::cube(DEFAULT_EDGE_CM), ProductDetails::dimensions);
            package.add(weight, dimensions.volume(), line.quantity);
            ProductSummary::from_line(line, detail.and_then(|d| d.price))
        }).collect();

        let address = event.order_data.shipping.address.clone();
        let destination = Destination::classify(&address.country, &config.home_country);
        let shipping_cost = event.order_data.shipping.cost
            .or_else(|| config.shipping.quote(package.total_weight_kg, destination))
            .unwrap_or(Decimal::ZERO);

        let subtotal = saturating_sum(products.iter().map(|p| p.line_total));
        let discount = saturating_sum(products.iter().map(ProductSummary::discount_amount));
        let total = saturating_sum([subtotal, shipping_cost]);
        let (priority, requires_quality_check) = config.priority.classify(total);

        Self {
            order_id: order_id.to_string(),
            merchant_txn_id: event.merchant_txn_id.clone(),
            provider: event.provider,
            payment_status: event.status,
            user_id: event.user().unwrap_or_default().to_string(),
            customer: event.order_data.customer.clone(),
            shipping: ShippingSummary { address, destination, method: destination.into(), cost: Money::new(shipping_cost, currency) },
            package,
            products,
            subtotal: Money::new(subtotal, currency),
            discount_total: Money::new(discount, currency),
            total: Money::new(total, currency),
            amount_paid: Money::new(event.amount, currency),
            priority,
            requires_quality_check,
            admin_status: AdminStatus::Pending,
            placed_at: event.timestamp,
        }
    }
}

fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, |acc, v| acc.checked_add(v).unwrap_or(Decimal::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::payment::sample_event;
    use crate::domain::aggregates::purchase::{line, VariantRef};

    fn details(id: &str, price: i64, weight: f64) -> (String, ProductDetails) {
        (id.to_string(), ProductDetails { id: id.into(), price: Some(Decimal::from(price)), weight: Some(weight), dimensions: Some(Dimensions { length: 20.0, width: 10.0, height: 5.0 }) })
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let event = sample_event(vec![line("l1", "P1", "M", 2)]);
        let d: HashMap<_, _> = [details("P1", 1250, 0.5)].into_iter().collect();
        let config = PipelineConfig::default();
        assert_eq!(OrderSnapshot::build("ORD-1", &event, &d, &config), OrderSnapshot::build("ORD-1", &event, &d, &config));
    }

    #[test]
    fn test_pricing_breakdown_and_totals() {
        let mut l2 = line("l2", "P2", "S", 1);
        l2.variant_ref = Some(VariantRef { entity_id: Some("V2".into()), is_variant: true });
        let event = sample_event(vec![line("l1", "P1", "M", 2), l2]);
        let d: HashMap<_, _> = [details("P1", 1250, 0.5)].into_iter().collect();
        let s = OrderSnapshot::build("ORD-1", &event, &d, &PipelineConfig::default());

        assert_eq!(s.products[0].original_price, Decimal::from(1250));
        assert_eq!(s.products[0].discount_percent, Decimal::from(20));
        assert_eq!(s.products[1].variant_id.as_deref(), Some("V2"));
        assert_eq!(s.products[1].discount_percent, Decimal::ZERO);
        assert_eq!(s.subtotal.amount(), Decimal::from(3000));
        assert_eq!(s.discount_total.amount(), Decimal::from(500));
        // 2 × 0.5 kg + 1 kg default = 2 kg domestic
        assert_eq!(s.package.total_weight_kg, 2.0);
        assert_eq!(s.package.total_volume_cm3, 2.0 * 1000.0 + 1000.0);
        assert_eq!(s.shipping.method, ShippingMethod::DomesticCourier);
        assert_eq!(s.shipping.cost.amount(), Decimal::from(350));
        assert_eq!(s.total.amount(), Decimal::from(3350));
        assert_eq!(s.admin_status, AdminStatus::Pending);
        assert_eq!(s.priority, OrderPriority::Normal);
        assert!(!s.requires_quality_check);
    }

    #[test]
    fn test_quoted_shipping_and_priority() {
        let mut event = sample_event(vec![line("l1", "P1", "M", 12)]);
        event.order_data.shipping.cost = Some(Decimal::from(500));
        event.order_data.shipping.address.country = "AU".into();
        let s = OrderSnapshot::build("ORD-2", &event, &HashMap::new(), &PipelineConfig::default());
        assert_eq!(s.shipping.destination, Destination::International);
        assert_eq!(s.shipping.cost.amount(), Decimal::from(500));
        assert_eq!(s.total.amount(), Decimal::from(12_500));
        assert_eq!(s.priority, OrderPriority::Normal);
        assert!(s.requires_quality_check);
    }

    #[test]
    fn test_oversized_lines_do_not_overflow() {
        let mut big = line("l1", "P1", "M", 3_000_000_000);
        big.unit_price = Decimal::MAX;
        let event = sample_event(vec![big.clone(), line("l2", "P1", "L", 3_000_000_000)]);
        let s = OrderSnapshot::build("ORD-3", &event, &HashMap::new(), &PipelineConfig::default());
        assert_eq!(s.package.item_count, u32::MAX);
        assert_eq!(s.subtotal.amount(), Decimal::MAX);
        assert_eq!(s.total.amount(), Decimal::MAX);
        assert_eq!(s.priority, OrderPriority::Urgent);
    }

    #[test]
    fn test_priority_thresholds() {
        let t = PriorityThresholds::default();
        assert_eq!(t.classify(Decimal::from(15_000)), (OrderPriority::High, true));
        assert_eq!(t.classify(Decimal::from(50_000)), (OrderPriority::Urgent, true));
        assert_eq!(t.classify(Decimal::from(9_999)), (OrderPriority::Normal, false));
    }
}
