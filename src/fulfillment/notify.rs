//! Phase 4: invoice notification
//!
//! Best-effort. Nothing here can fail the pipeline; every problem ends up in
//! [`NotifySummary`].

use super::invoice::render_invoice;
use crate::config::{CurrencyConfig, MailConfig};
use crate::domain::aggregates::OrderSnapshot;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use validator::Validate;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("customer has no email address")]
    MissingRecipient,

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("mail endpoint not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Delivers a rendered invoice to a customer.
#[async_trait]
pub trait InvoiceSink: Send + Sync {
    async fn send_invoice(&self, recipient_email: &str, display_name: &str, order_id: &str, document: Vec<u8>) -> Result<(), NotifyError>;
}

/// Sends invoices through a transactional mail HTTP API
pub struct HttpInvoiceSink {
    client: Client,
    config: MailConfig,
}

impl HttpInvoiceSink {
    pub fn new(config: MailConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout)).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl InvoiceSink for HttpInvoiceSink {
    async fn send_invoice(&self, recipient_email: &str, display_name: &str, order_id: &str, document: Vec<u8>) -> Result<(), NotifyError> {
        let endpoint = self.config.endpoint.as_deref().ok_or(NotifyError::NotConfigured)?;
        let body = json!({
            "from": { "email": self.config.from_address, "name": self.config.from_name },
            "to": [{ "email": recipient_email, "name": display_name }],
            "subject": format!("Your order {}", order_id),
            "text": format!("Hi {},\n\nThank you for your order. Your invoice is attached.\n", display_name),
            "attachments": [{
                "filename": format!("invoice-{}.txt", order_id),
                "contentType": "text/plain",
                "content": STANDARD.encode(document),
            }],
        });
        let mut request = self.client.post(endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status: status.as_u16(), body });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifySummary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct InvoiceDispatcher {
    sink: Arc<dyn InvoiceSink>,
    currency: CurrencyConfig,
}

impl InvoiceDispatcher {
    pub fn new(sink: Arc<dyn InvoiceSink>, currency: CurrencyConfig) -> Self { Self { sink, currency } }

    #[instrument(skip_all, fields(order_id = %snapshot.order_id))]
    pub async fn dispatch(&self, snapshot: &OrderSnapshot) -> NotifySummary {
        let recipient = snapshot.customer.email.clone().filter(|e| !e.trim().is_empty());
        match self.send(snapshot, recipient.as_deref()).await {
            Ok(()) => {
                tracing::info!("Invoice sent");
                NotifySummary { success: true, recipient, error: None }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invoice not sent");
                NotifySummary { success: false, recipient, error: Some(e.to_string()) }
            }
        }
    }

    async fn send(&self, snapshot: &OrderSnapshot, recipient: Option<&str>) -> Result<(), NotifyError> {
        let recipient = recipient.ok_or(NotifyError::MissingRecipient)?;
        snapshot.customer.validate().map_err(|e| NotifyError::InvalidRecipient(e.to_string()))?;
        let document = render_invoice(snapshot, &self.currency)?;
        self.sink.send_invoice(recipient, &snapshot.customer.name, &snapshot.order_id, document).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::domain::aggregates::payment::sample_event;
    use crate::domain::aggregates::purchase::line;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records what would have been sent; optionally refuses everything.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub sent: Mutex<Vec<(String, String, usize)>>,
        pub refuse: bool,
    }

    #[async_trait]
    impl InvoiceSink for RecordingSink {
        async fn send_invoice(&self, recipient_email: &str, _display_name: &str, order_id: &str, document: Vec<u8>) -> Result<(), NotifyError> {
            if self.refuse {
                return Err(NotifyError::Status { status: 503, body: "mail relay down".into() });
            }
            self.sent.lock().unwrap().push((recipient_email.to_string(), order_id.to_string(), document.len()));
            Ok(())
        }
    }

    fn snapshot() -> OrderSnapshot {
        OrderSnapshot::build("ORD-1", &sample_event(vec![line("l1", "P1", "M", 1)]), &HashMap::new(), &PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_dispatch_sends_rendered_invoice() {
        let sink = Arc::new(RecordingSink::default());
        let summary = InvoiceDispatcher::new(sink.clone(), CurrencyConfig::default()).dispatch(&snapshot()).await;
        assert!(summary.success);
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent[0].0, "asha@example.com");
        assert_eq!(sent[0].1, "ORD-1");
        assert!(sent[0].2 > 0);
    }

    #[tokio::test]
    async fn test_missing_email_and_transport_errors_are_reported() {
        let mut s = snapshot();
        s.customer.email = None;
        let sink = Arc::new(RecordingSink::default());
        let summary = InvoiceDispatcher::new(sink.clone(), CurrencyConfig::default()).dispatch(&s).await;
        assert!(!summary.success);
        assert_eq!(summary.error.as_deref(), Some("customer has no email address"));

        let refusing = Arc::new(RecordingSink { refuse: true, ..Default::default() });
        let summary = InvoiceDispatcher::new(refusing, CurrencyConfig::default()).dispatch(&snapshot()).await;
        assert!(!summary.success);
        assert!(summary.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_email_not_sent() {
        let mut s = snapshot();
        s.customer.email = Some("asha.example.com".into());
        let sink = Arc::new(RecordingSink::default());
        let summary = InvoiceDispatcher::new(sink.clone(), CurrencyConfig::default()).dispatch(&s).await;
        assert!(!summary.success);
        assert!(summary.error.unwrap().starts_with("invalid recipient"));
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_sink_without_endpoint() {
        let config = MailConfig { endpoint: None, api_key: None, from_address: "orders@localhost".into(), from_name: "Shop".into(), timeout: 5 };
        let sink = HttpInvoiceSink::new(config).unwrap();
        let result = sink.send_invoice("a@b.c", "A", "ORD-1", vec![1]).await;
        assert!(matches!(result, Err(NotifyError::NotConfigured)));
    }
}
