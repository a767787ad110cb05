//! Aggregates module
pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
pub mod purchase;
pub mod stock;

pub use cart::{match_rows, CartMatch, CartRow};
pub use order::{AdminStatus, OrderPriority, OrderSnapshot, PriorityThresholds, ProductSummary, ShippingMethod};
pub use payment::{CustomerInfo, OrderData, PaymentEvent, PaymentProvider, PaymentStatus, ShippingAddress, ShippingDetails};
pub use product::{Dimensions, ProductDetails, StockEntity};
pub use purchase::{group_by_target, EntityKind, LineGroup, PurchaseLine, StockTarget, VariantRef};
pub use stock::{plan_group, GroupPlan, LineOutcome, SizeStockMap, StockEncoding, StockFailure, StockUpdateResult, StockUpdateSummary};
