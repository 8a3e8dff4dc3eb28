use crate::db::{Collection, Document, UpsertOutcome};
use crate::Result;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Counters for one `save_entities` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub fetched: usize,
    pub fetch_failures: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl SaveReport {
    pub fn stored(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for SaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fetched, {} inserted, {} updated, {} skipped, {} failed fetches",
            self.fetched, self.inserted, self.updated, self.skipped, self.fetch_failures
        )
    }
}

/// Fetch, map and upsert for any entity type.
///
/// Bulk mode (`ids == None`) issues one fetch and propagates its error.
/// Per-id mode fetches every id with bounded concurrency; a failed id is
/// logged and skipped. In both modes a bad item never aborts its siblings.
#[derive(Debug, Clone)]
pub struct SaveEngine {
    max_in_flight: usize,
}

impl SaveEngine {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub async fn save_entities<R, D, F, Fut, M>(
        &self,
        collection: &Collection<D>,
        unique_key: &str,
        fetch_one: F,
        map_to_schema: M,
        ids: Option<&[i64]>,
    ) -> Result<SaveReport>
    where
        R: DeserializeOwned,
        D: Document,
        F: Fn(Option<i64>) -> Fut,
        Fut: Future<Output = Result<Vec<Value>>>,
        M: Fn(R) -> Result<D>,
    {
        let mut report = SaveReport::default();

        match ids {
            None => {
                let items = fetch_one(None).await?;
                report.fetched = items.len();

                for item in items {
                    store_item::<R, D, M>(collection, unique_key, &map_to_schema, item, &mut report);
                }
            }
            Some([]) => {
                warn!("No ids supplied for {}, nothing to fetch", collection.name());
            }
            Some(ids) => {
                info!(
                    "Fetching {} {} individually ({} in flight)",
                    ids.len(),
                    collection.name(),
                    self.max_in_flight
                );

                let mut results = stream::iter(ids.iter().copied())
                    .map(|id| {
                        let fetch = fetch_one(Some(id));
                        async move { (id, fetch.await) }
                    })
                    .buffer_unordered(self.max_in_flight);

                while let Some((id, result)) = results.next().await {
                    match result {
                        Ok(items) => {
                            report.fetched += items.len();
                            for item in items {
                                store_item::<R, D, M>(collection, unique_key, &map_to_schema, item, &mut report);
                            }
                        }
                        Err(e) => {
                            report.fetch_failures += 1;
                            error!("Failed to fetch {} {}: {}", collection.name(), id, e);
                        }
                    }
                }
            }
        }

        info!("Saved {}: {}", collection.name(), report);
        Ok(report)
    }
}

fn store_item<R, D, M>(
    collection: &Collection<D>,
    unique_key: &str,
    map_to_schema: &M,
    item: Value,
    report: &mut SaveReport,
) where
    R: DeserializeOwned,
    D: Document,
    M: Fn(R) -> Result<D>,
{
    let Some(key) = item.get(unique_key).and_then(Value::as_i64) else {
        warn!(
            "Skipping {} item without a numeric '{}'",
            collection.name(),
            unique_key
        );
        report.skipped += 1;
        return;
    };

    let raw: R = match serde_path_to_error::deserialize(item) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                "Skipping {} {}: malformed field '{}': {}",
                collection.name(),
                key,
                e.path(),
                e.inner()
            );
            report.skipped += 1;
            return;
        }
    };

    let document = match map_to_schema(raw) {
        Ok(document) => document,
        Err(e) => {
            warn!("Skipping {} {}: {}", collection.name(), key, e);
            report.skipped += 1;
            return;
        }
    };

    match collection.upsert(unique_key, key, &document) {
        Ok(UpsertOutcome::Inserted) => report.inserted += 1,
        Ok(UpsertOutcome::Updated) => report.updated += 1,
        Err(e) => {
            error!("Failed to store {} {}: {}", collection.name(), key, e);
            report.skipped += 1;
        }
    }
    debug!("Processed {} {}", collection.name(), key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::models::RawCountry;
    use crate::db::Country;
    use crate::sync::mappers::map_country;
    use crate::Error;
    use serde_json::json;
    use std::future::ready;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn countries() -> (tempfile::TempDir, fjall::Keyspace, Collection<Country>) {
        let dir = tempfile::tempdir().unwrap();
        let keyspace = fjall::Config::new(dir.path()).open().unwrap();
        let collection = Collection::open(&keyspace).unwrap();
        (dir, keyspace, collection)
    }

    fn country(id: i64) -> Value {
        json!({"id": id, "name": format!("Country {}", id), "iso3": "XXX"})
    }

    fn fetch_by_id(id: Option<i64>) -> Result<Vec<Value>> {
        match id {
            Some(3) => Err(Error::Api {
                status: 500,
                message: "boom".to_string(),
            }),
            Some(id) => Ok(vec![country(id)]),
            None => Ok((1..=5).map(country).collect()),
        }
    }

    #[tokio::test]
    async fn failing_id_does_not_abort_the_rest() {
        let (_dir, _keyspace, collection) = countries();
        let engine = SaveEngine::new(2);

        let report = engine
            .save_entities(
                &collection,
                "id",
                |id| ready(fetch_by_id(id)),
                map_country,
                Some(&[1, 2, 3, 4, 5]),
            )
            .await
            .unwrap();

        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.inserted, 4);
        assert_eq!(collection.len().unwrap(), 4);
        assert!(collection.get(3).unwrap().is_none());
    }

    #[tokio::test]
    async fn rerunning_is_idempotent() {
        let (_dir, _keyspace, collection) = countries();
        let engine = SaveEngine::new(4);

        for _ in 0..2 {
            engine
                .save_entities(&collection, "id", |id| ready(fetch_by_id(id)), map_country, None)
                .await
                .unwrap();
        }

        let report = engine
            .save_entities(&collection, "id", |id| ready(fetch_by_id(id)), map_country, None)
            .await
            .unwrap();

        assert_eq!(report.updated, 5);
        assert_eq!(report.inserted, 0);
        assert_eq!(collection.len().unwrap(), 5);
    }

    #[tokio::test]
    async fn mapping_and_decoding_failures_are_isolated() {
        let (_dir, _keyspace, collection) = countries();
        let engine = SaveEngine::new(1);

        let items = vec![
            country(1),
            country(2),
            json!({"id": 3, "name": 42}),
            json!({"name": "no id"}),
        ];

        let report = engine
            .save_entities(
                &collection,
                "id",
                |_| ready(Ok(items.clone())),
                |raw: RawCountry| {
                    if raw.id == 2 {
                        Err(Error::mapping(Some(raw.id), "rejected"))
                    } else {
                        map_country(raw)
                    }
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(report.fetched, 4);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 3);
        assert!(collection.get(1).unwrap().is_some());
    }

    #[tokio::test]
    async fn bulk_fetch_error_propagates() {
        let (_dir, _keyspace, collection) = countries();
        let engine = SaveEngine::new(1);

        let result = engine
            .save_entities(
                &collection,
                "id",
                |_| {
                    ready(Err(Error::Api {
                        status: 401,
                        message: "unauthorized".to_string(),
                    }))
                },
                map_country,
                None,
            )
            .await;

        assert!(matches!(result, Err(Error::Api { status: 401, .. })));
        assert!(collection.is_empty().unwrap());
    }

    #[tokio::test]
    async fn empty_id_list_fetches_nothing() {
        let (_dir, _keyspace, collection) = countries();
        let calls = AtomicUsize::new(0);

        let report = SaveEngine::new(4)
            .save_entities(
                &collection,
                "id",
                |id| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    ready(fetch_by_id(id))
                },
                map_country,
                Some(&[]),
            )
            .await
            .unwrap();

        assert_eq!(report, SaveReport::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn per_id_fetches_run_concurrently() {
        let (_dir, _keyspace, collection) = countries();
        // Every fetch parks until all three are in flight at once.
        let barrier = std::sync::Arc::new(tokio::sync::Barrier::new(3));

        let engine = SaveEngine::new(3);
        let save = engine.save_entities(
            &collection,
            "id",
            |id| {
                let barrier = barrier.clone();
                async move {
                    barrier.wait().await;
                    fetch_by_id(id)
                }
            },
            map_country,
            Some(&[1, 2, 4]),
        );

        let report = tokio::time::timeout(std::time::Duration::from_secs(5), save)
            .await
            .expect("fetches were serialized")
            .unwrap();

        assert_eq!(report.inserted, 3);
        assert_eq!(report.fetch_failures, 0);
    }
}
