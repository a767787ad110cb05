//! Post-payment fulfillment phases and the orchestrator running them.

pub mod cart;
pub mod invoice;
pub mod notify;
pub mod orchestrator;
pub mod snapshot;
pub mod stock;

pub use cart::{CartClearSummary, CartReconciler, CartRowResult};
pub use invoice::{render_invoice, InvoiceBuilder, INVOICE_WIDTH};
pub use notify::{HttpInvoiceSink, InvoiceDispatcher, InvoiceSink, NotifyError, NotifySummary};
pub use orchestrator::{FulfillmentOrchestrator, FulfillmentOutcome};
pub use snapshot::{SnapshotWriteSummary, SnapshotWriter};
pub use stock::StockUpdater;
