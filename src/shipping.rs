//! Shipping rate lookup
//!
//! Domestic parcels pay a base price for the first kilogram plus a flat
//! increment for every whole kilogram reached. International parcels are
//! priced from a weight-bracket table. Brackets are half-open `[min, max)`,
//! so a weight sitting exactly on an edge belongs to the higher bracket;
//! weights outside the table clamp to the nearest bracket.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Destination { Domestic, International }

impl Destination {
    pub fn classify(country: &str, home_country: &str) -> Self {
        if country.trim().eq_ignore_ascii_case(home_country.trim()) { Self::Domestic } else { Self::International }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeightBracket { pub min_kg: f64, pub max_kg: f64, pub price: Decimal }

impl WeightBracket {
    pub fn contains(&self, weight_kg: f64) -> bool { self.min_kg <= weight_kg && weight_kg < self.max_kg }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShippingRates {
    pub domestic_base: Decimal,
    pub domestic_per_kg: Decimal,
    /// Sorted by `min_kg`, contiguous.
    pub international: Vec<WeightBracket>,
}

impl Default for ShippingRates {
    fn default() -> Self {
        let mut international: Vec<WeightBracket> = (1..20u32)
            .map(|step| WeightBracket {
                min_kg: f64::from(step) * 0.5,
                max_kg: f64::from(step + 1) * 0.5,
                price: Decimal::from(2_500 + 450 * (step - 1)),
            })
            .collect();
        for (min_kg, max_kg, price) in [(10.0, 20.0, 14_500), (20.0, 30.0, 21_000), (30.0, 50.0, 32_000), (50.0, 70.0, 47_500)] {
            international.push(WeightBracket { min_kg, max_kg, price: Decimal::from(price) });
        }
        Self { domestic_base: Decimal::from(150), domestic_per_kg: Decimal::from(100), international }
    }
}

impl ShippingRates {
    /// Price for a parcel; `None` only when the international table is empty.
    pub fn quote(&self, weight_kg: f64, destination: Destination) -> Option<Decimal> {
        let weight_kg = if weight_kg.is_finite() { weight_kg.max(0.0) } else { 0.0 };
        match destination {
            Destination::Domestic => Some(self.domestic_base + self.domestic_per_kg * Decimal::from(weight_kg.floor() as u64)),
            Destination::International => self.bracket_for(weight_kg).map(|b| b.price),
        }
    }

    pub fn bracket_for(&self, weight_kg: f64) -> Option<&WeightBracket> {
        let first = self.international.first()?;
        let last = self.international.last()?;
        if weight_kg < first.min_kg { return Some(first); }
        if weight_kg >= last.max_kg { return Some(last); }
        // Gaps in a custom table resolve upward.
        self.international.iter().find(|b| b.contains(weight_kg) || weight_kg < b.min_kg)
    }
}
