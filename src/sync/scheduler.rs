use super::engine::SaveReport;
use super::entity::EntityType;
use crate::db::StatusStore;
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Freshness of one entity type relative to the refresh interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    NeverSynced,
    Stale { age: Duration },
    Fresh { age: Duration },
}

impl SyncState {
    pub fn evaluate(
        last_synced_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Self {
        match last_synced_at {
            None => SyncState::NeverSynced,
            Some(last) => {
                let age = now - last;
                if age < interval {
                    SyncState::Fresh { age }
                } else {
                    SyncState::Stale { age }
                }
            }
        }
    }

    pub fn needs_sync(&self) -> bool {
        !matches!(self, SyncState::Fresh { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    SkippedNoIds,
    SkippedFresh,
    Synced(SaveReport),
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

/// Gates each entity's save on its stored sync timestamp.
///
/// Dependent entities resolve their ids first; an empty set skips the
/// entity without touching its status. Only a successful save advances
/// `last_synced_at`.
#[derive(Clone)]
pub struct SyncScheduler {
    status: StatusStore,
    interval: Duration,
    clock: Clock,
}

impl SyncScheduler {
    pub fn new(status: StatusStore, interval: Duration) -> Self {
        Self {
            status,
            interval,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn state(&self, entity: EntityType) -> Result<SyncState> {
        let record = self.status.ensure(entity)?;
        Ok(SyncState::evaluate(
            record.last_synced_at,
            self.now(),
            self.interval,
        ))
    }

    /// Runs `save` for an entity fetched in bulk.
    pub async fn handle<S, Fut>(&self, entity: EntityType, force: bool, save: S) -> SyncOutcome
    where
        S: FnOnce(Option<Vec<i64>>) -> Fut,
        Fut: Future<Output = Result<SaveReport>>,
    {
        self.run(entity, force, None, save)
            .instrument(info_span!("sync", entity = %entity))
            .await
    }

    /// Runs `save` over the ids `id_getter` discovers from upstream collections.
    pub async fn handle_with_ids<G, S, Fut>(
        &self,
        entity: EntityType,
        force: bool,
        id_getter: G,
        save: S,
    ) -> SyncOutcome
    where
        G: FnOnce() -> Result<BTreeSet<i64>>,
        S: FnOnce(Option<Vec<i64>>) -> Fut,
        Fut: Future<Output = Result<SaveReport>>,
    {
        async move {
            let ids: Vec<i64> = match id_getter() {
                Ok(ids) if ids.is_empty() => {
                    warn!("No {} ids found, skipping sync", entity);
                    return SyncOutcome::SkippedNoIds;
                }
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    error!("Failed to collect {} ids: {}", entity, e);
                    return SyncOutcome::Failed(e.to_string());
                }
            };

            self.run(entity, force, Some(ids), save).await
        }
        .instrument(info_span!("sync", entity = %entity))
        .await
    }

    async fn run<S, Fut>(
        &self,
        entity: EntityType,
        force: bool,
        ids: Option<Vec<i64>>,
        save: S,
    ) -> SyncOutcome
    where
        S: FnOnce(Option<Vec<i64>>) -> Fut,
        Fut: Future<Output = Result<SaveReport>>,
    {
        if force {
            info!("Forced sync of {}", entity);
        } else {
            match self.state(entity) {
                Ok(SyncState::Fresh { age }) => {
                    info!(
                        "{} synced {} hours ago, skipping",
                        entity,
                        age.num_hours()
                    );
                    return SyncOutcome::SkippedFresh;
                }
                Ok(state) => info!("{} needs sync: {:?}", entity, state),
                Err(e) => warn!("Could not read sync status for {}, syncing anyway: {}", entity, e),
            }
        }

        let saved = AssertUnwindSafe(async move { save(ids).await })
            .catch_unwind()
            .await;

        match saved {
            Ok(Ok(report)) => {
                if let Err(e) = self.status.mark_synced(entity, self.now()) {
                    error!("Failed to record sync time for {}: {}", entity, e);
                }
                info!("✅ Synced {}: {}", entity, report);
                SyncOutcome::Synced(report)
            }
            Ok(Err(e)) => {
                error!("❌ Failed to sync {}: {}", entity, e);
                SyncOutcome::Failed(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("❌ Sync of {} panicked: {}", entity, message);
                SyncOutcome::Failed(format!("panicked: {}", message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
