//! Fulfillment orchestrator
//!
//! Runs the four phases for one payment event, strictly in order:
//! stock update, cart clearing, snapshot write, invoice notification.
//! Phase failures are folded into [`FulfillmentOutcome`]; only precondition
//! violations (and a ledger that cannot be consulted) abort the run, and
//! they do so before any side effect.

use super::cart::{CartClearSummary, CartReconciler};
use super::notify::{InvoiceDispatcher, InvoiceSink, NotifySummary};
use super::snapshot::{SnapshotWriteSummary, SnapshotWriter};
use super::stock::StockUpdater;
use crate::config::PipelineConfig;
use crate::domain::aggregates::{PaymentEvent, StockUpdateSummary};
use crate::domain::events::{FulfillmentEvent, FulfillmentPhase, PhaseLog, PhaseTransition};
use crate::ledger::ProcessedEventLedger;
use crate::store::ContentStore;
use crate::{FulfillmentError, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Composite result of one invocation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentOutcome {
    pub order_id: String,
    pub merchant_txn_id: String,
    pub stock_update: StockUpdateSummary,
    pub cart_clear: CartClearSummary,
    pub snapshot_write: SnapshotWriteSummary,
    pub notify: NotifySummary,
    pub phases: Vec<PhaseTransition>,
}

impl FulfillmentOutcome {
    /// Stock failures are the only ones an operator has to reconcile by hand.
    pub fn needs_manual_reconciliation(&self) -> bool { !self.stock_update.success }

    pub fn event(&self) -> FulfillmentEvent {
        FulfillmentEvent::Completed {
            order_id: self.order_id.clone(),
            merchant_txn_id: self.merchant_txn_id.clone(),
            stock_failures: self.stock_update.failure_count,
            snapshot_written: self.snapshot_write.success,
            notified: self.notify.success,
        }
    }
}

pub struct FulfillmentOrchestrator {
    ledger: Arc<dyn ProcessedEventLedger>,
    stock: StockUpdater,
    cart: CartReconciler,
    snapshots: SnapshotWriter,
    notifier: InvoiceDispatcher,
}

impl FulfillmentOrchestrator {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn ProcessedEventLedger>,
        sink: Arc<dyn InvoiceSink>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            ledger,
            stock: StockUpdater::new(store.clone()),
            cart: CartReconciler::new(store.clone()),
            snapshots: SnapshotWriter::new(store, config.clone()),
            notifier: InvoiceDispatcher::new(sink, config.currency.clone()),
        }
    }

    /// Fulfills a payment event once. A repeated event is refused before any side effect.
    #[instrument(skip_all, fields(provider = %event.provider, merchant_txn_id = %event.merchant_txn_id))]
    pub async fn process(&self, event: &PaymentEvent) -> Result<FulfillmentOutcome> {
        let user_id = check_preconditions(event)?;
        if !self.ledger.claim(event.provider, &event.merchant_txn_id).await? {
            tracing::warn!("Payment event already processed");
            return Err(FulfillmentError::AlreadyProcessed(event.merchant_txn_id.clone()));
        }
        Ok(self.run(event, user_id).await)
    }

    /// Emergency path: runs the whole pipeline again regardless of the ledger.
    /// Stock is decremented a second time; use only after manual review.
    #[instrument(skip_all, fields(provider = %event.provider, merchant_txn_id = %event.merchant_txn_id))]
    pub async fn reprocess(&self, event: &PaymentEvent) -> Result<FulfillmentOutcome> {
        let user_id = check_preconditions(event)?;
        tracing::warn!("Forcing reprocess of payment event");
        if let Err(e) = self.ledger.claim(event.provider, &event.merchant_txn_id).await {
            tracing::warn!(error = %e, "Could not record reprocessed event");
        }
        Ok(self.run(event, user_id).await)
    }

    async fn run(&self, event: &PaymentEvent, user_id: &str) -> FulfillmentOutcome {
        let order_id = format!("ORD-{}", Uuid::now_v7().simple()).to_uppercase();
        let mut phases = PhaseLog::start();
        tracing::info!(order_id = %order_id, lines = event.lines().len(), "Fulfillment started");

        phases.advance();
        let stock_update = self.stock.apply(event.lines()).await;
        tracing::info!(success_count = stock_update.success_count, failure_count = stock_update.failure_count, "Stock phase finished");

        phases.advance();
        let cart_clear = self.cart.clear(user_id, event.lines()).await;

        phases.advance();
        let (snapshot, snapshot_write) = self.snapshots.write(&order_id, event).await;

        phases.advance();
        let notify = self.notifier.dispatch(&snapshot).await;

        let done = phases.advance();
        debug_assert_eq!(done, FulfillmentPhase::Done);
        tracing::info!(
            order_id = %order_id,
            stock_ok = stock_update.success,
            cart_ok = cart_clear.success,
            snapshot_ok = snapshot_write.success,
            notify_ok = notify.success,
            "Fulfillment finished"
        );

        FulfillmentOutcome {
            order_id,
            merchant_txn_id: event.merchant_txn_id.clone(),
            stock_update,
            cart_clear,
            snapshot_write,
            notify,
            phases: phases.into_transitions(),
        }
    }
}

fn check_preconditions(event: &PaymentEvent) -> Result<&str> {
    let user_id = event.user().ok_or(FulfillmentError::MissingUser)?;
    if event.lines().is_empty() {
        return Err(FulfillmentError::EmptyPurchase);
    }
    if !event.status.is_fulfillable() {
        return Err(FulfillmentError::PaymentNotSettled(event.status));
    }
    for line in event.lines() {
        line.validate().map_err(|e| FulfillmentError::InvalidLine { line_id: line.line_id.clone(), reason: e.to_string() })?;
    }
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::row;
    use crate::domain::aggregates::payment::sample_event;
    use crate::domain::aggregates::purchase::{line, VariantRef};
    use crate::domain::aggregates::{EntityKind, LineOutcome, PaymentStatus, StockFailure, StockTarget};
    use crate::fulfillment::notify::tests::RecordingSink;
    use crate::ledger::MemoryEventLedger;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn product(id: &str) -> StockTarget { StockTarget { kind: EntityKind::Product, entity_id: id.into() } }

    fn orchestrator(store: Arc<MemoryStore>, sink: Arc<RecordingSink>) -> FulfillmentOrchestrator {
        FulfillmentOrchestrator::new(PipelineConfig::default(), store, Arc::new(MemoryEventLedger::new()), sink)
    }

    #[tokio::test]
    async fn test_two_sizes_of_one_product() {
        let store = Arc::new(
            MemoryStore::new()
                .with_entity(product("P1"), Some(json!({"M": 5, "L": 0})))
                .with_cart_row(row("c1", "M"))
                .with_cart_row(row("c2", "L")),
        );
        let sink = Arc::new(RecordingSink::default());
        let event = sample_event(vec![line("l1", "P1", "M", 2), line("l2", "P1", "L", 1)]);
        let outcome = orchestrator(store.clone(), sink.clone()).process(&event).await.unwrap();

        let details = &outcome.stock_update.details;
        assert_eq!(details[0].outcome, LineOutcome::Updated { old_quantity: 5, new_quantity: 3, quantity_decreased: 2 });
        assert_eq!(details[1].error(), Some(&StockFailure::OutOfStock("L".into())));
        assert_eq!(store.write_calls(), 1);
        assert_eq!(store.size_stock(&product("P1")), Some(json!({"M": 3, "L": 0})));
        assert_eq!(outcome.cart_clear.total_deleted, 2);
        assert!(outcome.snapshot_write.success);
        assert!(outcome.notify.success);
        assert!(outcome.needs_manual_reconciliation());
    }

    #[tokio::test]
    async fn test_unparsable_variant_stock_keeps_later_phases() {
        let variant = StockTarget { kind: EntityKind::Variant, entity_id: "V1".into() };
        let store = Arc::new(MemoryStore::new().with_entity(variant, Some(json!("{M: 3"))).with_cart_row(row("c1", "S")));
        let sink = Arc::new(RecordingSink::default());
        let mut l = line("l1", "P1", "S", 1);
        l.variant_ref = Some(VariantRef { entity_id: Some("V1".into()), is_variant: true });
        let outcome = orchestrator(store.clone(), sink.clone()).process(&sample_event(vec![l])).await.unwrap();

        assert!(matches!(outcome.stock_update.details[0].error(), Some(StockFailure::InvalidStockFormat(_))));
        assert_eq!(store.write_calls(), 0);
        assert_eq!(outcome.cart_clear.total_deleted, 1);
        assert_eq!(store.orders().len(), 1);
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_flips_whole_group() {
        let store = Arc::new(MemoryStore::new().with_entity(product("P1"), Some(json!({"S": 4, "M": 4, "L": 4}))).fail_writes_for("P1"));
        let event = sample_event(vec![line("l1", "P1", "S", 1), line("l2", "P1", "M", 1), line("l3", "P1", "L", 1)]);
        let outcome = orchestrator(store.clone(), Arc::new(RecordingSink::default())).process(&event).await.unwrap();

        assert_eq!((outcome.stock_update.success_count, outcome.stock_update.failure_count), (0, 3));
        assert!(outcome.stock_update.details.iter().all(|d| matches!(d.error(), Some(StockFailure::UpdateRequestFailed(_)))));
        assert_eq!(store.size_stock(&product("P1")), Some(json!({"S": 4, "M": 4, "L": 4})));
    }

    #[tokio::test]
    async fn test_snapshot_and_notify_failures_do_not_affect_earlier_phases() {
        let store = Arc::new(MemoryStore::new().with_entity(product("P1"), Some(json!({"M": 5}))).with_cart_row(row("c1", "M")).fail_order_creates());
        let sink = Arc::new(RecordingSink { refuse: true, ..Default::default() });
        let outcome = orchestrator(store, sink).process(&sample_event(vec![line("l1", "P1", "M", 1)])).await.unwrap();

        assert!(outcome.stock_update.success);
        assert!(outcome.cart_clear.success);
        assert!(!outcome.snapshot_write.success);
        assert!(!outcome.notify.success);
        assert!(!outcome.needs_manual_reconciliation());
        let phases: Vec<_> = outcome.phases.iter().map(|p| p.phase).collect();
        assert_eq!(phases, vec![
            FulfillmentPhase::Received, FulfillmentPhase::StockUpdating, FulfillmentPhase::CartClearing,
            FulfillmentPhase::SnapshotWriting, FulfillmentPhase::NotifyDispatching, FulfillmentPhase::Done,
        ]);
    }

    #[tokio::test]
    async fn test_preconditions_abort_before_side_effects() {
        let store = Arc::new(MemoryStore::new().with_entity(product("P1"), Some(json!({"M": 5}))));
        let o = orchestrator(store.clone(), Arc::new(RecordingSink::default()));

        let mut no_user = sample_event(vec![line("l1", "P1", "M", 1)]);
        no_user.user_id = None;
        assert!(matches!(o.process(&no_user).await, Err(FulfillmentError::MissingUser)));

        assert!(matches!(o.process(&sample_event(vec![])).await, Err(FulfillmentError::EmptyPurchase)));

        let mut pending = sample_event(vec![line("l1", "P1", "M", 1)]);
        pending.status = PaymentStatus::Pending;
        assert!(matches!(o.process(&pending).await, Err(FulfillmentError::PaymentNotSettled(PaymentStatus::Pending))));

        let zero = sample_event(vec![line("l1", "P1", "M", 0)]);
        assert!(matches!(o.process(&zero).await, Err(FulfillmentError::InvalidLine { .. })));

        let oversized = sample_event(vec![line("l1", "P1", "M", 3_000_000_000), line("l2", "P1", "M", 3_000_000_000)]);
        assert!(matches!(o.process(&oversized).await, Err(FulfillmentError::InvalidLine { line_id, .. }) if line_id == "l1"));

        let mut negative = line("l1", "P1", "M", 1);
        negative.unit_price = rust_decimal::Decimal::new(-500, 0);
        assert!(matches!(o.process(&sample_event(vec![negative])).await, Err(FulfillmentError::InvalidLine { .. })));

        assert_eq!(store.write_calls(), 0);
        assert_eq!(store.size_stock(&product("P1")), Some(json!({"M": 5})));
        assert!(store.orders().is_empty());

        // Rejected events are not claimed, so a corrected resubmission still goes through.
        o.process(&sample_event(vec![line("l1", "P1", "M", 1)])).await.unwrap();
        assert_eq!(store.size_stock(&product("P1")), Some(json!({"M": 4})));
    }

    #[tokio::test]
    async fn test_duplicate_event_refused_unless_reprocessed() {
        let store = Arc::new(MemoryStore::new().with_entity(product("P1"), Some(json!({"M": 5}))));
        let o = orchestrator(store.clone(), Arc::new(RecordingSink::default()));
        let event = sample_event(vec![line("l1", "P1", "M", 1)]);

        o.process(&event).await.unwrap();
        assert!(matches!(o.process(&event).await, Err(FulfillmentError::AlreadyProcessed(_))));
        assert_eq!(store.size_stock(&product("P1")), Some(json!({"M": 4})));

        o.reprocess(&event).await.unwrap();
        assert_eq!(store.size_stock(&product("P1")), Some(json!({"M": 3})));
        assert_eq!(store.orders().len(), 2);
    }
}
