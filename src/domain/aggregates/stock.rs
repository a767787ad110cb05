//! Per-size stock ledger
//!
//! The content store keeps each entity's stock as a size → quantity map,
//! sometimes as a serialized JSON string and sometimes as a structured
//! object. [`SizeStockMap::decode`] turns either form into one canonical
//! map and remembers which form it came from so the write goes back in
//! the same shape.
//!
//! [`plan_group`] is the in-memory half of a group update: it applies every
//! line of a [`LineGroup`] to the decoded map, sequentially, and stages the
//! result. A staged success only becomes final once the store confirms the
//! write; otherwise [`GroupPlan::invalidate`] flips it back to failed.

use super::product::StockEntity;
use super::purchase::{EntityKind, LineGroup, PurchaseLine};
use crate::domain::value_objects::Quantity;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockEncoding { Serialized, Structured }

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SizeStockMap(BTreeMap<String, Quantity>);

impl SizeStockMap {
    pub fn new(entries: impl IntoIterator<Item = (String, u32)>) -> Self {
        Self(entries.into_iter().map(|(size, qty)| (size, Quantity::new(qty))).collect())
    }

    pub fn decode(raw: Option<&Value>) -> Result<(Self, StockEncoding), StockFailure> {
        let invalid = |e: serde_json::Error| StockFailure::InvalidStockFormat(e.to_string());
        match raw {
            None | Some(Value::Null) => Err(StockFailure::NoStockField),
            Some(Value::String(encoded)) => serde_json::from_str::<BTreeMap<String, Quantity>>(encoded)
                .map(|m| (Self(m), StockEncoding::Serialized))
                .map_err(invalid),
            Some(value @ Value::Object(_)) => serde_json::from_value::<BTreeMap<String, Quantity>>(value.clone())
                .map(|m| (Self(m), StockEncoding::Structured))
                .map_err(invalid),
            Some(other) => Err(StockFailure::InvalidStockFormat(format!("unsupported stock value {}", other))),
        }
    }

    pub fn encode(&self, encoding: StockEncoding) -> Value {
        let object: Map<String, Value> = self.0.iter().map(|(size, qty)| (size.clone(), Value::from(qty.value()))).collect();
        match encoding {
            StockEncoding::Structured => Value::Object(object),
            StockEncoding::Serialized => Value::String(Value::Object(object).to_string()),
        }
    }

    pub fn get(&self, size: &str) -> Option<Quantity> { self.0.get(size).copied() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Takes `quantity` units of `size`, floored at zero. Returns (old, new).
    pub fn take(&mut self, size: &str, quantity: u32) -> Result<(Quantity, Quantity), StockFailure> {
        let current = self.0.get_mut(size).ok_or_else(|| StockFailure::SizeNotInStock(size.to_string()))?;
        if current.is_zero() {
            return Err(StockFailure::OutOfStock(size.to_string()));
        }
        let old = *current;
        *current = old.subtract_floor(quantity);
        Ok((old, *current))
    }
}

/// Why a single purchase line could not decrement stock.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum StockFailure {
    #[error("entity not found")]
    EntityNotFound,
    #[error("entity fetch failed: {0}")]
    FetchFailed(String),
    #[error("no stock field found")]
    NoStockField,
    #[error("invalid stock format: {0}")]
    InvalidStockFormat(String),
    #[error("size {0} not in stock")]
    SizeNotInStock(String),
    #[error("size {0} out of stock")]
    OutOfStock(String),
    #[error("update request failed: {0}")]
    UpdateRequestFailed(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LineOutcome {
    #[serde(rename_all = "camelCase")]
    Updated { old_quantity: u32, new_quantity: u32, quantity_decreased: u32 },
    Failed { error: StockFailure },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateResult {
    pub line_id: String,
    pub entity_id: String,
    pub entity_type: EntityKind,
    pub size: String,
    pub requested: u32,
    #[serde(flatten)]
    pub outcome: LineOutcome,
}

impl StockUpdateResult {
    fn new(group: &LineGroup, line: &PurchaseLine, outcome: LineOutcome) -> Self {
        Self {
            line_id: line.line_id.clone(),
            entity_id: group.target.entity_id.clone(),
            entity_type: group.target.kind,
            size: line.selected_size.clone(),
            requested: line.quantity,
            outcome,
        }
    }

    pub fn failed(group: &LineGroup, line: &PurchaseLine, error: StockFailure) -> Self {
        Self::new(group, line, LineOutcome::Failed { error })
    }

    pub fn is_success(&self) -> bool { matches!(self.outcome, LineOutcome::Updated { .. }) }

    pub fn error(&self) -> Option<&StockFailure> {
        match &self.outcome { LineOutcome::Failed { error } => Some(error), LineOutcome::Updated { .. } => None }
    }
}

/// Outcome of applying one group to its decoded map, before the write.
#[derive(Clone, Debug)]
pub struct GroupPlan {
    pub results: Vec<StockUpdateResult>,
    /// Map to persist, present only when at least one line was staged.
    pub staged: Option<(SizeStockMap, StockEncoding)>,
}

impl GroupPlan {
    pub fn failed(group: &LineGroup, error: StockFailure) -> Self {
        let results = group.lines.iter().map(|l| StockUpdateResult::failed(group, l, error.clone())).collect();
        Self { results, staged: None }
    }

    /// The write was not confirmed: every staged success becomes a failure.
    pub fn invalidate(&mut self, reason: &str) {
        for result in self.results.iter_mut().filter(|r| r.is_success()) {
            result.outcome = LineOutcome::Failed { error: StockFailure::UpdateRequestFailed(reason.to_string()) };
        }
        self.staged = None;
    }
}

/// Applies the lines of `group` to the stock held by `entity`, one after another.
pub fn plan_group(group: &LineGroup, entity: &StockEntity) -> GroupPlan {
    let (mut map, encoding) = match SizeStockMap::decode(entity.size_stock.as_ref()) {
        Ok(decoded) => decoded,
        Err(error) => return GroupPlan::failed(group, error),
    };
    let mut staged_any = false;
    let results = group.lines.iter().map(|line| {
        let outcome = match map.take(&line.selected_size, line.quantity) {
            Ok((old, new)) => {
                staged_any = true;
                LineOutcome::Updated { old_quantity: old.value(), new_quantity: new.value(), quantity_decreased: old.value() - new.value() }
            }
            Err(error) => LineOutcome::Failed { error },
        };
        StockUpdateResult::new(group, line, outcome)
    }).collect();
    GroupPlan { results, staged: staged_any.then_some((map, encoding)) }
}

/// Aggregate of phase 1.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateSummary {
    pub success: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub details: Vec<StockUpdateResult>,
}

impl StockUpdateSummary {
    pub fn from_results(details: Vec<StockUpdateResult>) -> Self {
        let success_count = details.iter().filter(|r| r.is_success()).count();
        let failure_count = details.len() - success_count;
        Self { success: failure_count == 0, success_count, failure_count, details }
    }
}
