//! Phase 1: stock decrement
//!
//! Lines are grouped per stock entity. Groups run concurrently; inside a
//! group the lines are applied one after another to a single decoded map,
//! which is then persisted in one write. A group's successes only count
//! once that write is confirmed.

use crate::domain::aggregates::{group_by_target, plan_group, GroupPlan, LineGroup, PurchaseLine, StockFailure, StockUpdateResult, StockUpdateSummary};
use crate::store::ContentStore;
use futures::future::join_all;
use std::sync::Arc;
use tracing::instrument;

pub struct StockUpdater { store: Arc<dyn ContentStore> }

impl StockUpdater {
    pub fn new(store: Arc<dyn ContentStore>) -> Self { Self { store } }

    pub async fn apply(&self, lines: &[PurchaseLine]) -> StockUpdateSummary {
        let groups = group_by_target(lines);
        let results = join_all(groups.iter().map(|group| self.apply_group(group))).await;
        StockUpdateSummary::from_results(results.into_iter().flatten().collect())
    }

    #[instrument(skip_all, fields(entity_id = %group.target.entity_id, entity_type = %group.target.kind, lines = group.lines.len()))]
    async fn apply_group(&self, group: &LineGroup) -> Vec<StockUpdateResult> {
        let entity = match self.store.fetch_stock_entity(&group.target).await {
            Ok(Some(entity)) => entity,
            Ok(None) => return fail_group(group, StockFailure::EntityNotFound),
            Err(e) => return fail_group(group, StockFailure::FetchFailed(e.to_string())),
        };

        let mut plan = plan_group(group, &entity);
        log_lines(&plan);
        let Some((map, encoding)) = plan.staged.take() else {
            tracing::debug!("Nothing staged for entity, skipping write");
            return plan.results;
        };

        match self.store.replace_size_stock(&group.target, map.encode(encoding)).await {
            Ok(Some(_)) => {
                tracing::info!(sizes = map.len(), "Stock written");
            }
            Ok(None) => {
                tracing::warn!("Stock write returned no document, invalidating group");
                plan.invalidate("store returned no document");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stock write failed, invalidating group");
                plan.invalidate(&e.to_string());
            }
        }
        plan.results
    }
}

fn fail_group(group: &LineGroup, error: StockFailure) -> Vec<StockUpdateResult> {
    tracing::warn!(error = %error, "Stock group failed");
    GroupPlan::failed(group, error).results
}

fn log_lines(plan: &GroupPlan) {
    for result in &plan.results {
        match result.error() {
            None => tracing::debug!(line_id = %result.line_id, size = %result.size, "Line staged"),
            Some(error) => tracing::warn!(line_id = %result.line_id, size = %result.size, error = %error, "Line failed"),
        }
    }
}
