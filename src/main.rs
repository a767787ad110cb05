//! Storefront Fulfillment - post-payment fulfillment service

use anyhow::Result;
use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storefront_fulfillment::adapters::{AdapterError, CheckoutContext, CodOrder, GatewayACompletion, GatewayBStatus, PaymentAdapter};
use storefront_fulfillment::fulfillment::{HttpInvoiceSink, InvoiceSink};
use storefront_fulfillment::ledger::{MemoryEventLedger, PgEventLedger, ProcessedEventLedger};
use storefront_fulfillment::store::{ContentStore, HttpContentStore, MemoryStore};
use storefront_fulfillment::{AppConfig, FulfillmentError, FulfillmentOrchestrator, FulfillmentOutcome, PaymentEvent};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)] pub struct AppState { pub orchestrator: Arc<FulfillmentOrchestrator>, pub nats: Option<async_nats::Client> }

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env();

    let ledger: Arc<dyn ProcessedEventLedger> = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Arc::new(PgEventLedger::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, processed events are only remembered in memory");
            Arc::new(MemoryEventLedger::new())
        }
    };

    let store: Arc<dyn ContentStore> = if config.store.base_url.is_some() {
        Arc::new(HttpContentStore::new(&config.store)?)
    } else {
        tracing::warn!("STORE_BASE_URL not set, using in-memory content store");
        Arc::new(MemoryStore::new())
    };

    if config.mail.endpoint.is_none() {
        tracing::warn!("MAIL_ENDPOINT not set, invoices will not be sent");
    }
    let sink: Arc<dyn InvoiceSink> = Arc::new(HttpInvoiceSink::new(config.mail.clone())?);

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS connection failed, fulfillment events will not be published");
                None
            }
        },
        None => None,
    };

    let orchestrator = Arc::new(FulfillmentOrchestrator::new(config.pipeline.clone(), store, ledger, sink));
    let state = AppState { orchestrator, nats };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-fulfillment"})) }))
        .route("/api/v1/payments/gateway-a/complete", post(gateway_a_complete))
        .route("/api/v1/payments/gateway-b/status", post(gateway_b_status))
        .route("/api/v1/orders/cod", post(place_cod_order))
        .route("/api/v1/admin/payments/reprocess", post(reprocess))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state);

    tracing::info!("Storefront fulfillment listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)] pub struct GatewayACompleteRequest { pub data: String, pub context: CheckoutContext }
#[derive(Debug, Deserialize)] pub struct GatewayBStatusRequest { pub lookup: GatewayBStatus, pub context: CheckoutContext }
#[derive(Debug, Deserialize)] pub struct CodOrderRequest { pub order: CodOrder, pub context: CheckoutContext }

type ApiResult = std::result::Result<Json<FulfillmentOutcome>, (StatusCode, String)>;

async fn gateway_a_complete(State(s): State<AppState>, Json(r): Json<GatewayACompleteRequest>) -> ApiResult {
    let event = GatewayACompletion::decode(&r.data).and_then(|c| c.into_event(r.context)).map_err(reject_adapter)?;
    fulfill(&s, event).await
}

async fn gateway_b_status(State(s): State<AppState>, Json(r): Json<GatewayBStatusRequest>) -> ApiResult {
    let event = r.lookup.into_event(r.context).map_err(reject_adapter)?;
    fulfill(&s, event).await
}

async fn place_cod_order(State(s): State<AppState>, Json(r): Json<CodOrderRequest>) -> ApiResult {
    let event = r.order.into_event(r.context).map_err(reject_adapter)?;
    fulfill(&s, event).await
}

async fn reprocess(State(s): State<AppState>, Json(event): Json<PaymentEvent>) -> ApiResult {
    let outcome = s.orchestrator.reprocess(&event).await.map_err(reject)?;
    publish(&s, &outcome).await;
    Ok(Json(outcome))
}

async fn fulfill(s: &AppState, event: PaymentEvent) -> ApiResult {
    let outcome = s.orchestrator.process(&event).await.map_err(reject)?;
    if outcome.needs_manual_reconciliation() {
        tracing::warn!(order_id = %outcome.order_id, failures = outcome.stock_update.failure_count, "Stock needs manual reconciliation");
    }
    publish(s, &outcome).await;
    Ok(Json(outcome))
}

async fn publish(s: &AppState, outcome: &FulfillmentOutcome) {
    let Some(client) = &s.nats else { return };
    let event = outcome.event();
    let payload = match serde_json::to_vec(&event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Could not encode fulfillment event");
            return;
        }
    };
    if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
        tracing::warn!(error = %e, subject = event.subject(), "Fulfillment event publish failed");
    }
}

fn reject_adapter(e: AdapterError) -> (StatusCode, String) { reject(e.into()) }

fn reject(e: FulfillmentError) -> (StatusCode, String) {
    let status = match &e {
        FulfillmentError::MissingUser => StatusCode::UNAUTHORIZED,
        FulfillmentError::EmptyPurchase | FulfillmentError::InvalidLine { .. } | FulfillmentError::Adapter(_) => StatusCode::BAD_REQUEST,
        FulfillmentError::PaymentNotSettled(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FulfillmentError::AlreadyProcessed(_) => StatusCode::CONFLICT,
        FulfillmentError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "Fulfillment aborted");
    } else {
        tracing::warn!(error = %e, "Fulfillment refused");
    }
    (status, e.to_string())
}
