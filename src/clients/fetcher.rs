use super::endpoint::EndpointBuilder;
use super::transport::Transport;
use crate::{Error, Result};
use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument, Span};

/// Paginated fetcher bound to one API base.
///
/// Pages are requested strictly in sequence; each page's `has_more` flag
/// gates the next request. Any transport error or non-success status
/// aborts the whole fetch.
pub struct ApiFetcher<T: Transport> {
    endpoints: EndpointBuilder,
    transport: Arc<T>,
    span: Span,
}

impl<T: Transport> Clone for ApiFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            endpoints: self.endpoints.clone(),
            transport: Arc::clone(&self.transport),
            span: self.span.clone(),
        }
    }
}

impl<T: Transport> ApiFetcher<T> {
    pub fn new(name: &'static str, endpoints: EndpointBuilder, transport: Arc<T>) -> Self {
        let span = info_span!("api", api = name, base_url = endpoints.base_url());
        Self {
            endpoints,
            transport,
            span,
        }
    }

    /// Lazily yields one normalized page of items at a time, in page order.
    pub fn pages<'a>(
        &'a self,
        entity_path: &'a str,
        includes: &'a [&'a str],
        unique_id: Option<i64>,
    ) -> impl Stream<Item = Result<Vec<Value>>> + 'a {
        stream::try_unfold(Some(1u32), move |next_page| async move {
            let Some(page) = next_page else {
                return Ok::<_, Error>(None);
            };

            let url = self.endpoints.build(entity_path, unique_id, includes, page);
            debug!(entity_path, ?unique_id, page, "fetching page");

            let response = self
                .transport
                .get(&url)
                .instrument(self.span.clone())
                .await?;
            let has_more = response.has_more();
            let items = response.into_items();

            debug!(entity_path, page, count = items.len(), has_more, "fetched page");

            Ok(Some((items, has_more.then_some(page + 1))))
        })
    }

    /// Collects every item across every page.
    pub async fn fetch_all(
        &self,
        entity_path: &str,
        includes: &[&str],
        unique_id: Option<i64>,
    ) -> Result<Vec<Value>> {
        let items: Vec<Value> = self
            .pages(entity_path, includes, unique_id)
            .try_concat()
            .instrument(self.span.clone())
            .await?;

        info!(
            parent: &self.span,
            entity_path,
            ?unique_id,
            count = items.len(),
            "fetch complete"
        );
        Ok(items)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clients::transport::ApiPage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory upstream: responses keyed by `path[/id]` then page number.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub responses: Mutex<HashMap<(String, u32), ApiPage>>,
        pub failures: Mutex<HashMap<(String, u32), u16>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn respond(&self, resource: &str, page: u32, body: Value) {
            let page_body: ApiPage = serde_json::from_value(body).unwrap();
            self.responses
                .lock()
                .unwrap()
                .insert((resource.to_string(), page), page_body);
        }

        pub fn fail(&self, resource: &str, page: u32, status: u16) {
            self.failures
                .lock()
                .unwrap()
                .insert((resource.to_string(), page), status);
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn parse(url: &str) -> (String, u32) {
            let (path, query) = url.split_once('?').unwrap_or((url, ""));
            let resource = path
                .split("/v3/")
                .nth(1)
                .map(|p| p.split_once('/').map(|(_, rest)| rest).unwrap_or(p))
                .unwrap_or(path)
                .to_string();
            let page = query
                .split('&')
                .find_map(|kv| kv.strip_prefix("page="))
                .and_then(|p| p.parse().ok())
                .unwrap_or(1);
            (resource, page)
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, url: &str) -> Result<ApiPage> {
            self.requests.lock().unwrap().push(url.to_string());
            let key = Self::parse(url);

            if let Some(status) = self.failures.lock().unwrap().get(&key) {
                return Err(Error::Api {
                    status: *status,
                    message: format!("fake failure for {}", key.0),
                });
            }

            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn fetcher(transport: Arc<FakeTransport>) -> ApiFetcher<FakeTransport> {
        ApiFetcher::new(
            "football",
            EndpointBuilder::new("https://api.test/v3/football/", "tok"),
            transport,
        )
    }

    #[tokio::test]
    async fn follows_pagination_until_exhausted() {
        let transport = Arc::new(FakeTransport::default());
        let pages = 4;
        let per_page = 3;
        for page in 1..=pages {
            let items: Vec<Value> = (0..per_page)
                .map(|i| json!({"id": page * 100 + i}))
                .collect();
            transport.respond(
                "types",
                page,
                json!({"data": items, "pagination": {"has_more": page < pages}}),
            );
        }

        let items = fetcher(transport.clone())
            .fetch_all("types", &[], None)
            .await
            .unwrap();

        assert_eq!(items.len(), (pages * per_page) as usize);
        assert_eq!(transport.request_count(), pages as usize);

        let ids: Vec<i64> = items.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted, "items must arrive in page order");
    }

    #[tokio::test]
    async fn single_object_payload_is_wrapped() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond("players/42", 1, json!({"data": {"id": 42, "name": "A"}}));

        let items = fetcher(transport.clone())
            .fetch_all("players", &["statistics"], Some(42))
            .await
            .unwrap();

        assert_eq!(items, vec![json!({"id": 42, "name": "A"})]);
        assert!(transport.requests.lock().unwrap()[0].contains("includes=statistics"));
    }

    #[tokio::test]
    async fn failing_page_aborts_the_fetch() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(
            "leagues",
            1,
            json!({"data": [{"id": 1}], "pagination": {"has_more": true}}),
        );
        transport.fail("leagues", 2, 500);

        let result = fetcher(transport.clone()).fetch_all("leagues", &[], None).await;

        assert!(matches!(result, Err(Error::Api { status: 500, .. })));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn pages_stream_can_be_consumed_incrementally() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(
            "countries",
            1,
            json!({"data": [{"id": 1}], "pagination": {"has_more": true}}),
        );
        transport.respond("countries", 2, json!({"data": [{"id": 2}, {"id": 3}]}));

        let fetcher = fetcher(transport.clone());
        let pages: Vec<Vec<Value>> = fetcher
            .pages("countries", &[], None)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].len(), 2);
    }
}
