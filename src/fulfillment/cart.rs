//! Phase 2: remove purchased lines from the persisted cart

use crate::domain::aggregates::{match_rows, CartRow, PurchaseLine};
use crate::store::ContentStore;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRowResult {
    pub document_id: String,
    pub size: String,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartClearSummary {
    pub success: bool,
    pub total_deleted: usize,
    pub total_failed: usize,
    /// Lines with no cart row, e.g. a direct "buy now" checkout.
    pub skipped_lines: Vec<String>,
    pub details: Vec<CartRowResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct CartReconciler { store: Arc<dyn ContentStore> }

impl CartReconciler {
    pub fn new(store: Arc<dyn ContentStore>) -> Self { Self { store } }

    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: &str, lines: &[PurchaseLine]) -> CartClearSummary {
        let rows = match self.store.list_cart_rows(user_id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Could not list cart rows");
                return CartClearSummary { error: Some(e.to_string()), ..Default::default() };
            }
        };

        let matched = match_rows(&rows, lines);
        for line_id in &matched.skipped_lines {
            tracing::info!(line_id = %line_id, "No cart row for line, skipping");
        }

        let details = join_all(matched.rows.iter().map(|row| self.delete(row))).await;
        let total_deleted = details.iter().filter(|d| d.deleted).count();
        let total_failed = details.len() - total_deleted;
        tracing::info!(total_deleted, total_failed, "Cart reconciled");
        CartClearSummary { success: total_failed == 0, total_deleted, total_failed, skipped_lines: matched.skipped_lines, details, error: None }
    }

    async fn delete(&self, row: &CartRow) -> CartRowResult {
        let result = self.store.delete_cart_row(&row.document_id).await;
        if let Err(e) = &result {
            tracing::warn!(document_id = %row.document_id, error = %e, "Cart row delete failed");
        }
        CartRowResult { document_id: row.document_id.clone(), size: row.size.clone().unwrap_or_default(), deleted: result.is_ok(), error: result.err().map(|e| e.to_string()) }
    }
}
