//! HTTP catalog client with rate limiting
//!
//! One `reqwest::Client` carries the authorization header for every call.
//! Calls are spaced by a minimum interval because the service enforces a
//! per-institution request quota.

use crate::catalog::error::CatalogError;
use crate::catalog::{
    ALL_HOLDINGS, CatalogService, DEFAULT_BASE_URL, HoldingDisposition, Result,
};
use crate::model::{Item, ItemPage};
use crate::security::SecureString;
use async_trait::async_trait;
use log::{debug, trace};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const JSON: &str = "application/json";
const XML: &str = "application/xml";

/// Catalog client configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// API root without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Minimum delay between two requests
    pub min_request_interval: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            min_request_interval: Duration::from_millis(100),
        }
    }
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait_if_needed(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                trace!("Rate limiter: waiting {wait_time:?}");
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Catalog service backed by the REST API
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl HttpCatalogClient {
    /// Create a client that authenticates every request with `api_key`
    pub fn new(config: CatalogConfig, api_key: &SecureString) -> Result<Self> {
        let key = api_key
            .to_str()
            .map_err(|_| CatalogError::transport("API key is not valid UTF-8"))?;

        let mut authorization = HeaderValue::from_str(&format!("apikey {}", key.trim()))
            .map_err(|_| CatalogError::transport("API key contains invalid header characters"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        headers.insert(AUTHORIZATION, authorization);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| CatalogError::transport(format!("Failed to build HTTP client: {e}")))?;

        debug!("Catalog client created for {}", config.base_url);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(config.min_request_interval),
        })
    }

    fn holding_url(&self, bib_id: &str, holding_id: &str) -> String {
        format!("{}/bibs/{bib_id}/holdings/{holding_id}", self.base_url)
    }

    fn items_url(&self, bib_id: &str, holding_id: &str) -> String {
        format!("{}/items", self.holding_url(bib_id, holding_id))
    }

    /// Send a request and turn any non-success status into a decoded error
    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        self.rate_limiter.wait_if_needed().await;

        let response = request.send().await?;
        let status = response.status();
        debug!("{operation}: {status}");

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(CatalogError::from_response(status.as_u16(), &body))
        }
    }
}

#[async_trait]
impl CatalogService for HttpCatalogClient {
    async fn fetch_holding(&self, bib_id: &str, holding_id: &str) -> Result<String> {
        let request = self
            .http
            .get(self.holding_url(bib_id, holding_id))
            .header(ACCEPT, XML);

        let response = self.send(request, "GET holding").await?;
        Ok(response.text().await?)
    }

    async fn fetch_items(&self, bib_id: &str, offset: usize, limit: usize) -> Result<ItemPage> {
        let request = self
            .http
            .get(self.items_url(bib_id, ALL_HOLDINGS))
            .query(&[("limit", limit), ("offset", offset)]);

        let response = self.send(request, "GET items").await?;
        response
            .json::<ItemPage>()
            .await
            .map_err(|e| CatalogError::decode("item page", e.to_string()))
    }

    async fn delete_item(&self, item: &Item, holdings: HoldingDisposition) -> Result<()> {
        let request = self
            .http
            .delete(&item.link)
            .query(&[("holdings", holdings.as_query())]);

        let response = self.send(request, "DELETE item").await?;
        if response.status() != StatusCode::NO_CONTENT {
            debug!(
                "DELETE item {} answered {} instead of 204",
                item.barcode(),
                response.status()
            );
        }
        Ok(())
    }

    async fn update_item(&self, item: &Item) -> Result<Item> {
        let request = self.http.put(&item.link).json(item);

        let response = self.send(request, "PUT item").await?;
        response
            .json::<Item>()
            .await
            .map_err(|e| CatalogError::decode("updated item", e.to_string()))
    }

    async fn create_item(&self, bib_id: &str, holding_id: &str, item: &Item) -> Result<Item> {
        let request = self.http.post(self.items_url(bib_id, holding_id)).json(item);

        let response = self.send(request, "POST item").await?;
        response
            .json::<Item>()
            .await
            .map_err(|e| CatalogError::decode("created item", e.to_string()))
    }
}
