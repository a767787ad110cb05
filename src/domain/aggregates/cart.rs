//! Persisted cart rows and their matching against purchased lines

use super::purchase::{EntityKind, PurchaseLine};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A cart document owned by one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRow {
    #[serde(rename = "_id")]
    pub document_id: String,
    #[serde(default)]
    pub user_id: String,
    /// Missing on rows saved before sizes were tracked; such rows never match.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl CartRow {
    /// Size must match. A variant reference must equal the line's variant
    /// target, a product reference the line's base entity; rows without
    /// references fall back to size alone.
    pub fn matches(&self, line: &PurchaseLine) -> bool {
        if self.size.as_deref() != Some(line.selected_size.as_str()) { return false; }
        let non_empty = |r: &Option<String>| r.as_deref().filter(|r| !r.is_empty()).map(str::to_owned);
        match (non_empty(&self.variant_id), non_empty(&self.product_id)) {
            (Some(variant), _) => {
                let target = line.target();
                target.kind == EntityKind::Variant && target.entity_id == variant
            }
            (None, Some(product)) => product == line.base_entity_id,
            (None, None) => true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CartMatch {
    /// Rows to delete, each at most once, in cart order.
    pub rows: Vec<CartRow>,
    /// Lines without any matching row.
    pub skipped_lines: Vec<String>,
}

pub fn match_rows(rows: &[CartRow], lines: &[PurchaseLine]) -> CartMatch {
    let mut hit: HashSet<&str> = HashSet::new();
    let mut skipped_lines = Vec::new();
    for line in lines {
        let mut found = false;
        for row in rows.iter().filter(|r| r.matches(line)) {
            found = true;
            hit.insert(row.document_id.as_str());
        }
        if !found { skipped_lines.push(line.line_id.clone()); }
    }
    let rows = rows.iter().filter(|r| hit.contains(r.document_id.as_str())).cloned().collect();
    CartMatch { rows, skipped_lines }
}

#[cfg(test)]
pub(crate) fn row(id: &str, size: &str) -> CartRow {
    CartRow { document_id: id.into(), user_id: "u1".into(), size: Some(size.into()), product_id: None, variant_id: None, quantity: Some(1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::purchase::{line, VariantRef};

    #[test]
    fn test_size_only_rows_match_iff_size_equal() {
        let rows = vec![row("c1", "M"), row("c2", "L"), row("c3", "S")];
        let lines = vec![line("l1", "P1", "M", 1), line("l2", "P2", "L", 1), line("l3", "P3", "XL", 1)];
        let m = match_rows(&rows, &lines);
        assert_eq!(m.rows.iter().map(|r| r.document_id.as_str()).collect::<Vec<_>>(), vec!["c1", "c2"]);
        assert_eq!(m.skipped_lines, vec!["l3".to_string()]);
    }

    #[test]
    fn test_duplicate_matches_deleted_once() {
        let rows = vec![row("c1", "M")];
        let lines = vec![line("l1", "P1", "M", 1), line("l2", "P2", "M", 1)];
        assert_eq!(match_rows(&rows, &lines).rows.len(), 1);
    }

    #[test]
    fn test_entity_reference_disambiguates_same_size() {
        let mut red = row("c1", "M");
        red.product_id = Some("P1".into());
        red.variant_id = Some("V-red".into());
        let mut blue = row("c2", "M");
        blue.variant_id = Some("V-blue".into());
        let mut l = line("l1", "P1", "M", 1);
        l.variant_ref = Some(VariantRef { entity_id: Some("V-blue".into()), is_variant: true });
        let m = match_rows(&[red, blue], &[l]);
        assert_eq!(m.rows.len(), 1);
        assert_eq!(m.rows[0].document_id, "c2");
    }

    #[test]
    fn test_rows_without_size_are_listed_but_never_matched() {
        let rows: Vec<CartRow> = serde_json::from_value(serde_json::json!([
            {"_id": "c1", "userId": "u1", "size": null, "productId": "P1", "variantId": null, "quantity": 1},
            {"_id": "c2", "userId": "u1", "size": "M", "productId": "P1", "variantId": null, "quantity": null},
            {"_id": "c3", "userId": "u1"},
        ])).unwrap();
        assert_eq!(rows.len(), 3);
        let m = match_rows(&rows, &[line("l1", "P1", "M", 1)]);
        assert_eq!(m.rows.iter().map(|r| r.document_id.as_str()).collect::<Vec<_>>(), vec!["c2"]);
    }

    #[test]
    fn test_product_reference_matches_base_entity() {
        let mut r = row("c1", "M");
        r.product_id = Some("P1".into());
        assert!(r.matches(&line("l1", "P1", "M", 1)));
        assert!(!r.matches(&line("l1", "P2", "M", 1)));
    }
}
