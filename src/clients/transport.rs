use crate::config::HttpSettings;
use crate::{Error, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use http::Extensions;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, error};

/// One page of an upstream response: `{ data: object | object[], pagination?: {..} }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u64>,
    #[serde(default)]
    pub has_more: bool,
}

impl ApiPage {
    /// Lists are used as-is, a single object becomes a one-element list,
    /// absent (or null) data is empty.
    pub fn into_items(self) -> Vec<Value> {
        match self.data {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(item) => vec![item],
        }
    }

    pub fn has_more(&self) -> bool {
        self.pagination.as_ref().is_some_and(|p| p.has_more)
    }
}

/// The seam between the paginated fetcher and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET and decode the page. Non-success statuses are errors.
    async fn get(&self, url: &str) -> Result<ApiPage>;
}

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Waits for a rate-limit permit before every attempt that reaches the network.
struct RateLimitMiddleware {
    limiter: Arc<DirectRateLimiter>,
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.limiter.until_ready().await;
        next.run(req, extensions).await
    }
}

/// Retry sits outside the limiter so each retried attempt spends a permit.
fn layered_client(
    base_client: reqwest::Client,
    retry_policy: ExponentialBackoff,
    limiter: Arc<DirectRateLimiter>,
) -> ClientWithMiddleware {
    ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(RateLimitMiddleware { limiter })
        .build()
}

pub struct HttpTransport {
    client: ClientWithMiddleware,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let base_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()?;

        // Transient failures (connect errors, timeouts, 429, 5xx) back off here;
        // anything that survives the retries is fatal to the fetch.
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(
                std::time::Duration::from_secs(2),
                std::time::Duration::from_secs(60),
            )
            .build_with_max_retries(settings.max_retries);

        let per_minute = NonZeroU32::new(settings.requests_per_minute).ok_or_else(|| {
            Error::Validation("http.requests_per_minute must be at least 1".to_string())
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Ok(Self {
            client: layered_client(base_client, retry_policy, rate_limiter),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<ApiPage> {
        // Request urls carry the api token, keep them out of error messages
        let response = self.client.get(url).send().await.map_err(|e| match e {
            reqwest_middleware::Error::Reqwest(e) => Error::Http(e.without_url()),
            other => Error::Middleware(other),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| Error::Http(e.without_url()))?;
            error!("Upstream API error: {} - {}", status, text);
            return Err(Error::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        debug!("Upstream response: {} bytes", text.len());

        let deserializer = &mut serde_json::Deserializer::from_str(&text);
        let page: ApiPage = serde_path_to_error::deserialize(deserializer)
            .map_err(|e| Error::Json(e.into_inner()))?;

        Ok(page)
    }
}
