//! Catalog records read from the content store

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weight assumed for products without physical metadata.
pub const DEFAULT_WEIGHT_KG: f64 = 1.0;
/// Edge of the cube assumed for products without dimensions.
pub const DEFAULT_EDGE_CM: f64 = 10.0;

/// A product or variant document as far as stock is concerned.
///
/// `size_stock` is kept raw: the store holds it either as a serialized
/// string or as a structured object, and decoding happens once in
/// [`SizeStockMap::decode`](super::stock::SizeStockMap::decode).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockEntity {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(rename = "sizeStock", default)]
    pub size_stock: Option<serde_json::Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions { pub length: f64, pub width: f64, pub height: f64 }

impl Dimensions {
    pub fn cube(edge: f64) -> Self { Self { length: edge, width: edge, height: edge } }
    pub fn volume(&self) -> f64 { self.length * self.width * self.height }
}

/// Pricing and physical metadata of a base product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

impl ProductDetails {
    pub fn weight_kg(&self) -> f64 {
        self.weight.filter(|w| w.is_finite() && *w > 0.0).unwrap_or(DEFAULT_WEIGHT_KG)
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
            .filter(|d| d.volume().is_finite() && d.volume() > 0.0)
            .unwrap_or_else(|| Dimensions::cube(DEFAULT_EDGE_CM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_metadata() {
        let d = ProductDetails { id: "P1".into(), ..Default::default() };
        assert_eq!(d.weight_kg(), 1.0);
        assert_eq!(d.dimensions().volume(), 1000.0);
    }

    #[test]
    fn test_store_document_shape() {
        let json = serde_json::json!({"_id": "P1", "price": "2500", "weight": 0.4, "dimensions": {"length": 30.0, "width": 20.0, "height": 5.0}});
        let d: ProductDetails = serde_json::from_value(json).unwrap();
        assert_eq!(d.price, Some(Decimal::new(2500, 0)));
        assert_eq!(d.weight_kg(), 0.4);
        assert_eq!(d.dimensions().volume(), 3000.0);

        let e: StockEntity = serde_json::from_value(serde_json::json!({"_id": "V1", "_type": "productVariant"})).unwrap();
        assert!(e.size_stock.is_none());
    }
}
