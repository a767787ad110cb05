//! Phase 3: write the order snapshot

use crate::config::PipelineConfig;
use crate::domain::aggregates::{OrderSnapshot, PaymentEvent, ProductDetails};
use crate::store::ContentStore;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotWriteSummary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SnapshotWriter {
    store: Arc<dyn ContentStore>,
    config: Arc<PipelineConfig>,
}

impl SnapshotWriter {
    pub fn new(store: Arc<dyn ContentStore>, config: Arc<PipelineConfig>) -> Self { Self { store, config } }

    /// Builds the snapshot and writes it once. The snapshot is returned even
    /// when the write fails so later phases can still use it.
    #[instrument(skip_all, fields(order_id = %order_id))]
    pub async fn write(&self, order_id: &str, event: &PaymentEvent) -> (OrderSnapshot, SnapshotWriteSummary) {
        let details = self.fetch_details(event).await;
        let snapshot = OrderSnapshot::build(order_id, event, &details, &self.config);
        let summary = match self.store.create_order_snapshot(&snapshot).await {
            Ok(document_id) => {
                tracing::info!(document_id = %document_id, priority = ?snapshot.priority, "Order snapshot written");
                SnapshotWriteSummary { success: true, document_id: Some(document_id), error: None }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Order snapshot write failed");
                SnapshotWriteSummary { success: false, document_id: None, error: Some(e.to_string()) }
            }
        };
        (snapshot, summary)
    }

    /// Metadata per distinct base product, fetched concurrently. Failures fall back to defaults.
    async fn fetch_details(&self, event: &PaymentEvent) -> HashMap<String, ProductDetails> {
        let ids: BTreeSet<&str> = event.lines().iter().map(|l| l.base_entity_id.as_str()).collect();
        let fetched = join_all(ids.into_iter().map(|id| async move { (id, self.store.fetch_product_details(id).await) })).await;
        fetched.into_iter().filter_map(|(id, result)| match result {
            Ok(Some(details)) => Some((id.to_string(), details)),
            Ok(None) => {
                tracing::debug!(product_id = %id, "No product metadata, using defaults");
                None
            }
            Err(e) => {
                tracing::warn!(product_id = %id, error = %e, "Product metadata fetch failed, using defaults");
                None
            }
        }).collect()
    }
}
