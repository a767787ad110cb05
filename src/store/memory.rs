//! In-process content store
//!
//! Used when no store URL is configured and as the store double in tests.
//! Failures can be injected per entity, per cart row, or for order creation.

use super::{ContentStore, StoreError, StoreResult};
use crate::domain::aggregates::{CartRow, OrderSnapshot, ProductDetails, StockEntity, StockTarget};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct State {
    entities: HashMap<StockTarget, StockEntity>,
    details: HashMap<String, ProductDetails>,
    cart_rows: Vec<CartRow>,
    orders: Vec<(String, OrderSnapshot)>,
    failing_writes: HashSet<String>,
    silent_writes: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_creates: bool,
    fetch_delays: HashMap<String, Duration>,
    write_calls: usize,
}

#[derive(Default)]
pub struct MemoryStore { state: Mutex<State> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn state(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    pub fn with_entity(self, target: StockTarget, size_stock: Option<Value>) -> Self {
        let entity = StockEntity { id: target.entity_id.clone(), document_type: Some(target.kind.document_type().to_string()), size_stock };
        self.state().entities.insert(target, entity);
        self
    }

    pub fn with_details(self, details: ProductDetails) -> Self {
        self.state().details.insert(details.id.clone(), details);
        self
    }

    pub fn with_cart_row(self, row: CartRow) -> Self {
        self.state().cart_rows.push(row);
        self
    }

    /// Writes to this entity fail with a transport-style error.
    pub fn fail_writes_for(self, entity_id: &str) -> Self {
        self.state().failing_writes.insert(entity_id.to_string());
        self
    }

    /// Writes to this entity succeed at transport level but return no document.
    pub fn empty_writes_for(self, entity_id: &str) -> Self {
        self.state().silent_writes.insert(entity_id.to_string());
        self
    }

    pub fn fail_deletes_for(self, document_id: &str) -> Self {
        self.state().failing_deletes.insert(document_id.to_string());
        self
    }

    /// Fetches of this entity take `delay` before answering.
    pub fn delay_fetches_for(self, entity_id: &str, delay: Duration) -> Self {
        self.state().fetch_delays.insert(entity_id.to_string(), delay);
        self
    }

    pub fn fail_order_creates(self) -> Self {
        self.state().failing_creates = true;
        self
    }

    pub fn size_stock(&self, target: &StockTarget) -> Option<Value> {
        self.state().entities.get(target).and_then(|e| e.size_stock.clone())
    }

    pub fn write_calls(&self) -> usize { self.state().write_calls }

    pub fn cart_rows(&self, user_id: &str) -> Vec<CartRow> {
        self.state().cart_rows.iter().filter(|r| r.user_id == user_id).cloned().collect()
    }

    pub fn orders(&self) -> Vec<(String, OrderSnapshot)> { self.state().orders.clone() }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch_stock_entity(&self, target: &StockTarget) -> StoreResult<Option<StockEntity>> {
        let delay = self.state().fetch_delays.get(&target.entity_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state().entities.get(target).cloned())
    }

    async fn replace_size_stock(&self, target: &StockTarget, size_stock: Value) -> StoreResult<Option<StockEntity>> {
        let mut state = self.state();
        state.write_calls += 1;
        if state.failing_writes.contains(&target.entity_id) {
            return Err(StoreError::Unavailable(format!("connection reset writing {}", target.entity_id)));
        }
        if state.silent_writes.contains(&target.entity_id) {
            return Ok(None);
        }
        Ok(state.entities.get_mut(target).map(|entity| {
            entity.size_stock = Some(size_stock);
            entity.clone()
        }))
    }

    async fn fetch_product_details(&self, product_id: &str) -> StoreResult<Option<ProductDetails>> {
        Ok(self.state().details.get(product_id).cloned())
    }

    async fn list_cart_rows(&self, user_id: &str) -> StoreResult<Vec<CartRow>> {
        Ok(self.cart_rows(user_id))
    }

    async fn delete_cart_row(&self, document_id: &str) -> StoreResult<()> {
        let mut state = self.state();
        if state.failing_deletes.contains(document_id) {
            return Err(StoreError::Status { status: 500, body: format!("delete {} failed", document_id) });
        }
        state.cart_rows.retain(|r| r.document_id != document_id);
        Ok(())
    }

    async fn create_order_snapshot(&self, snapshot: &OrderSnapshot) -> StoreResult<String> {
        let mut state = self.state();
        if state.failing_creates {
            return Err(StoreError::Unavailable("order collection unreachable".to_string()));
        }
        let id = Uuid::new_v4().to_string();
        state.orders.push((id.clone(), snapshot.clone()));
        Ok(id)
    }
}
