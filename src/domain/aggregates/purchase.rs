//! Purchase lines and their stock addressing
//!
//! A purchased line points either at a base product or at one of its
//! variants. Each of those owns its own per-size stock, so before touching
//! inventory the lines are resolved to a [`StockTarget`] and grouped so that
//! every entity sees exactly one read-modify-write cycle per checkout.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use validator::{Validate, ValidationError};

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    #[validate(length(min = 1))]
    pub line_id: String,
    #[validate(length(min = 1))]
    pub base_entity_id: String,
    #[serde(default)]
    pub variant_ref: Option<VariantRef>,
    #[validate(length(min = 1))]
    pub selected_size: String,
    #[validate(range(min = 1, max = 10_000))]
    pub quantity: u32,
    #[validate(custom = "validate_unit_price")]
    pub unit_price: Decimal,
    pub title: String,
}

/// Highest accepted unit price, in the domestic currency.
pub const MAX_UNIT_PRICE: i64 = 100_000_000;

fn validate_unit_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || *price > Decimal::from(MAX_UNIT_PRICE) {
        return Err(ValidationError::new("unit_price_out_of_range"));
    }
    Ok(())
}

/// Variant reference data attached to a line by the product picker.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRef {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub is_variant: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind { Product, Variant }

impl EntityKind {
    /// Document type of the entity in the content store.
    pub fn document_type(&self) -> &'static str {
        match self { Self::Product => "product", Self::Variant => "productVariant" }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.document_type()) }
}

/// The stock-bearing entity a line decrements.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTarget {
    pub kind: EntityKind,
    pub entity_id: String,
}

impl PurchaseLine {
    /// Resolves the entity whose stock this line decrements.
    ///
    /// Variant data wins when it carries either a document id or the explicit
    /// variant marker. A marker without an id keeps the base id but still
    /// addresses the variant collection.
    pub fn target(&self) -> StockTarget {
        let variant = self.variant_ref.as_ref().and_then(|v| {
            let id = v.entity_id.as_deref().filter(|id| !id.is_empty());
            match (id, v.is_variant) {
                (Some(id), _) => Some(id.to_string()),
                (None, true) => Some(self.base_entity_id.clone()),
                (None, false) => None,
            }
        });
        match variant {
            Some(entity_id) => StockTarget { kind: EntityKind::Variant, entity_id },
            None => StockTarget { kind: EntityKind::Product, entity_id: self.base_entity_id.clone() },
        }
    }

    pub fn line_total(&self) -> Decimal { self.unit_price.checked_mul(Decimal::from(self.quantity)).unwrap_or(Decimal::MAX) }
}

/// All lines of one checkout that decrement the same entity.
#[derive(Clone, Debug)]
pub struct LineGroup {
    pub target: StockTarget,
    pub lines: Vec<PurchaseLine>,
}

/// Groups lines by target entity, keeping first-seen order for both groups and lines.
pub fn group_by_target(lines: &[PurchaseLine]) -> Vec<LineGroup> {
    let mut index: HashMap<StockTarget, usize> = HashMap::new();
    let mut groups: Vec<LineGroup> = Vec::new();
    for line in lines {
        let target = line.target();
        match index.get(&target) {
            Some(&i) => groups[i].lines.push(line.clone()),
            None => {
                index.insert(target.clone(), groups.len());
                groups.push(LineGroup { target, lines: vec![line.clone()] });
            }
        }
    }
    groups
}

#[cfg(test)]
pub(crate) fn line(id: &str, base: &str, size: &str, quantity: u32) -> PurchaseLine {
    PurchaseLine {
        line_id: id.into(), base_entity_id: base.into(), variant_ref: None,
        selected_size: size.into(), quantity, unit_price: Decimal::new(1000, 0), title: format!("Item {}", base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_product_target() {
        let l = line("l1", "P1", "M", 1);
        assert_eq!(l.target(), StockTarget { kind: EntityKind::Product, entity_id: "P1".into() });
    }

    #[test]
    fn test_variant_targets() {
        let mut l = line("l1", "P1", "M", 1);
        l.variant_ref = Some(VariantRef { entity_id: Some("V9".into()), is_variant: false });
        assert_eq!(l.target(), StockTarget { kind: EntityKind::Variant, entity_id: "V9".into() });

        l.variant_ref = Some(VariantRef { entity_id: None, is_variant: true });
        assert_eq!(l.target(), StockTarget { kind: EntityKind::Variant, entity_id: "P1".into() });

        l.variant_ref = Some(VariantRef { entity_id: Some(String::new()), is_variant: false });
        assert_eq!(l.target().kind, EntityKind::Product);
    }

    #[test]
    fn test_grouping_merges_same_entity() {
        let mut v = line("l3", "P1", "S", 1);
        v.variant_ref = Some(VariantRef { entity_id: Some("V1".into()), is_variant: true });
        let lines = vec![line("l1", "P1", "M", 2), v, line("l2", "P1", "L", 1), line("l4", "P2", "M", 1)];
        let groups = group_by_target(&lines);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].target.entity_id, "P1");
        assert_eq!(groups[0].lines.iter().map(|l| l.line_id.as_str()).collect::<Vec<_>>(), vec!["l1", "l2"]);
        assert_eq!(groups[1].target.kind, EntityKind::Variant);
        assert_eq!(groups[2].target.entity_id, "P2");
    }

    #[test]
    fn test_quantity_validation() {
        let mut l = line("l1", "P1", "M", 0);
        assert!(l.validate().is_err());
        l.quantity = 1;
        assert!(l.validate().is_ok());
        assert_eq!(l.line_total(), Decimal::new(1000, 0));

        l.quantity = 10_001;
        assert!(l.validate().is_err());
        l.quantity = 10_000;
        assert!(l.validate().is_ok());
    }

    #[test]
    fn test_unit_price_bounds() {
        let mut l = line("l1", "P1", "M", 1);
        l.unit_price = Decimal::new(-1, 0);
        assert!(l.validate().is_err());
        l.unit_price = Decimal::from(MAX_UNIT_PRICE) + Decimal::ONE;
        assert!(l.validate().is_err());
        l.unit_price = Decimal::from(MAX_UNIT_PRICE);
        assert!(l.validate().is_ok());
    }

    #[test]
    fn test_line_total_saturates() {
        let mut l = line("l1", "P1", "M", 3_000_000_000);
        l.unit_price = Decimal::MAX;
        assert_eq!(l.line_total(), Decimal::MAX);
    }
}
