//! HTTP client for the hosted content store

use super::{ContentStore, StoreError, StoreResult};
use crate::config::StoreConfig;
use crate::domain::aggregates::{CartRow, OrderSnapshot, ProductDetails, StockEntity, StockTarget};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const STOCK_QUERY: &str = "*[_type == $type && _id == $id][0]{_id, _type, sizeStock}";
const DETAILS_QUERY: &str = "*[_type == \"product\" && _id == $id][0]{_id, price, weight, dimensions}";
const CART_QUERY: &str = "*[_type == \"cartItem\" && userId == $userId]{_id, userId, size, \"productId\": product._ref, \"variantId\": variant._ref, quantity}";
const ORDER_TYPE: &str = "order";

#[derive(Deserialize)]
struct QueryResponse<T> { result: T }

#[derive(Deserialize)]
struct MutateResponse {
    #[serde(default)]
    results: Vec<MutationResult>,
}

#[derive(Deserialize)]
struct MutationResult {
    id: String,
    #[serde(default)]
    document: Option<Value>,
}

/// Store backed by the query and mutation endpoints of the hosted content API
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    client: Client,
    base_url: String,
    dataset: String,
    api_version: String,
    token: Option<String>,
}

impl HttpContentStore {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let base_url = config.base_url.clone()
            .ok_or_else(|| StoreError::Unavailable("store base URL not configured".to_string()))?;
        let client = Client::builder().timeout(Duration::from_secs(config.timeout)).build()?;
        Ok(Self {
            client,
            base_url,
            dataset: config.dataset.clone(),
            api_version: config.api_version.clone(),
            token: config.token.clone(),
        })
    }

    fn url(&self, action: &str) -> String {
        format!("{}/v{}/data/{}/{}", self.base_url.trim_end_matches('/'), self.api_version, action, self.dataset)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Run a query; string parameters are passed JSON-encoded as `$name`.
    async fn query<T: DeserializeOwned>(&self, query: &str, params: &[(&str, &str)]) -> StoreResult<T> {
        let mut pairs = vec![("query".to_string(), query.to_string())];
        pairs.extend(params.iter().map(|(k, v)| (format!("${}", k), Value::from(*v).to_string())));
        let request = self.authorize(self.client.get(self.url("query")).query(&pairs));
        let response: QueryResponse<T> = Self::handle_response(request.send().await?).await?;
        Ok(response.result)
    }

    async fn mutate(&self, mutations: Vec<Value>) -> StoreResult<MutateResponse> {
        let request = self.client
            .post(self.url("mutate"))
            .query(&[("returnDocuments", "true")])
            .json(&json!({ "mutations": mutations }));
        Self::handle_response(self.authorize(request).send().await?).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> StoreResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status: status.as_u16(), body });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(Into::into)
    }
}

fn stock_patch(target: &StockTarget, size_stock: Value) -> Value {
    json!({ "patch": { "id": target.entity_id, "set": { "sizeStock": size_stock } } })
}

fn order_create(snapshot: &OrderSnapshot) -> StoreResult<Value> {
    let mut document = serde_json::to_value(snapshot)?;
    match document.as_object_mut() {
        Some(fields) => { fields.insert("_type".to_string(), Value::from(ORDER_TYPE)); }
        None => return Err(StoreError::InvalidResponse("order snapshot is not an object".to_string())),
    }
    Ok(json!({ "create": document }))
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn fetch_stock_entity(&self, target: &StockTarget) -> StoreResult<Option<StockEntity>> {
        self.query(STOCK_QUERY, &[("type", target.kind.document_type()), ("id", target.entity_id.as_str())]).await
    }

    async fn replace_size_stock(&self, target: &StockTarget, size_stock: Value) -> StoreResult<Option<StockEntity>> {
        let response = self.mutate(vec![stock_patch(target, size_stock)]).await?;
        match response.results.into_iter().find(|r| r.id == target.entity_id).and_then(|r| r.document) {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    async fn fetch_product_details(&self, product_id: &str) -> StoreResult<Option<ProductDetails>> {
        self.query(DETAILS_QUERY, &[("id", product_id)]).await
    }

    async fn list_cart_rows(&self, user_id: &str) -> StoreResult<Vec<CartRow>> {
        self.query(CART_QUERY, &[("userId", user_id)]).await
    }

    async fn delete_cart_row(&self, document_id: &str) -> StoreResult<()> {
        self.mutate(vec![json!({ "delete": { "id": document_id } })]).await?;
        Ok(())
    }

    async fn create_order_snapshot(&self, snapshot: &OrderSnapshot) -> StoreResult<String> {
        let response = self.mutate(vec![order_create(snapshot)?]).await?;
        response.results.into_iter().next()
            .map(|r| r.id)
            .ok_or_else(|| StoreError::InvalidResponse("create returned no document id".to_string()))
    }
}
