use super::engine::{SaveEngine, SaveReport};
use super::entity::EntityType;
use super::mappers::{self, ClubContext, PlayerContext};
use super::recurring;
use super::scheduler::{SyncOutcome, SyncScheduler};
use crate::clients::models::{RawPlayer, RawTeam};
use crate::clients::{ApiFetcher, EndpointBuilder, HttpTransport, Transport};
use crate::config::AppConfig;
use crate::db::Database;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

const LEAGUE_INCLUDES: &[&str] = &["currentSeason"];
const SEASON_INCLUDES: &[&str] = &["teams", "fixtures"];
const CLUB_INCLUDES: &[&str] = &["players"];
const FIXTURE_INCLUDES: &[&str] = &["lineups", "participants"];
const PLAYER_INCLUDES: &[&str] = &["country", "teams", "statistics.details"];

/// What happened to each entity type during one sweep, in sync order.
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub outcomes: Vec<(EntityType, SyncOutcome)>,
}

impl SyncSummary {
    pub fn outcome(&self, entity: EntityType) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(entity, _)| *entity)
    }

    pub fn stored(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                SyncOutcome::Synced(report) => report.stored(),
                _ => 0,
            })
            .sum()
    }
}

/// Drives the dependency-ordered sweep across every entity type.
pub struct SyncOrchestrator<T: Transport = HttpTransport> {
    pub database: Database,
    football: ApiFetcher<T>,
    core: ApiFetcher<T>,
    scheduler: SyncScheduler,
    engine: SaveEngine,
    league_sub_type: Option<String>,
}

impl SyncOrchestrator<HttpTransport> {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let database = Database::open(config.database_path()?)?;
        let transport = Arc::new(HttpTransport::new(&config.http)?);

        Ok(Self::with_transport(config, database, transport))
    }
}

impl<T: Transport> SyncOrchestrator<T> {
    pub fn with_transport(config: &AppConfig, database: Database, transport: Arc<T>) -> Self {
        let football = ApiFetcher::new(
            "football",
            EndpointBuilder::new(&config.football_api_url, &config.api_token),
            Arc::clone(&transport),
        );
        let core = ApiFetcher::new(
            "core",
            EndpointBuilder::new(&config.core_api_url, &config.api_token),
            transport,
        );
        let scheduler = SyncScheduler::new(database.status.clone(), config.sync.interval());

        Self {
            database,
            football,
            core,
            scheduler,
            engine: SaveEngine::new(config.sync.max_in_flight),
            league_sub_type: config.sync.league_sub_type.clone(),
        }
    }

    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.scheduler = self.scheduler.with_clock(clock);
        self
    }

    pub async fn run_full_sync(&self, force: bool) -> Result<SyncSummary> {
        self.run_entities(&EntityType::SYNC_ORDER, force).await
    }

    /// Syncs the selected entity types in dependency order. A failure in
    /// one entity is recorded and the sweep moves on.
    pub async fn run_entities(&self, selection: &[EntityType], force: bool) -> Result<SyncSummary> {
        let entities = EntityType::in_sync_order(selection);
        info!(
            "Starting sync of {} entity types{}",
            entities.len(),
            if force { " (forced)" } else { "" }
        );

        let mut summary = SyncSummary::default();
        for entity in entities {
            let outcome = self.sync_entity(entity, force).await;
            summary.outcomes.push((entity, outcome));
        }

        self.database.flush()?;

        let failures: Vec<EntityType> = summary.failures().collect();
        if failures.is_empty() {
            info!("Sync completed: {} documents stored", summary.stored());
        } else {
            warn!(
                "Sync completed with failures in {:?}: {} documents stored",
                failures,
                summary.stored()
            );
        }

        Ok(summary)
    }

    pub async fn sync_entity(&self, entity: EntityType, force: bool) -> SyncOutcome {
        let db = &self.database;
        let scheduler = &self.scheduler;

        match entity {
            EntityType::Leagues => {
                scheduler
                    .handle(entity, force, |_| self.save_leagues())
                    .await
            }
            EntityType::Seasons => {
                scheduler
                    .handle_with_ids(
                        entity,
                        force,
                        || db.leagues.extract_ids("season_id", false),
                        |ids| self.save_seasons(ids),
                    )
                    .await
            }
            EntityType::Clubs => {
                scheduler
                    .handle_with_ids(
                        entity,
                        force,
                        || db.seasons.extract_ids("club_ids", true),
                        |ids| self.save_clubs(ids),
                    )
                    .await
            }
            EntityType::Fixtures => {
                scheduler
                    .handle_with_ids(
                        entity,
                        force,
                        || db.seasons.extract_ids("fixture_ids", true),
                        |ids| self.save_fixtures(ids),
                    )
                    .await
            }
            EntityType::Players => {
                scheduler
                    .handle_with_ids(
                        entity,
                        force,
                        || db.clubs.extract_ids("roster", true),
                        |ids| self.save_players(ids),
                    )
                    .await
            }
            EntityType::Types => scheduler.handle(entity, force, |_| self.save_types()).await,
            EntityType::Countries => {
                scheduler
                    .handle(entity, force, |_| self.save_countries())
                    .await
            }
        }
    }

    /// Runs the gated startup sweep, then forced refreshes on each calendar
    /// trigger until Ctrl-C.
    pub async fn watch(&self, force: bool) -> Result<()> {
        self.run_full_sync(force).await?;

        while let Some(class) = recurring::wait_for_next_trigger(self.scheduler.now()).await {
            info!("🔄 Running {} refresh", class);
            if let Err(e) = self.run_entities(class.entities(), true).await {
                error!("❌ {} refresh failed: {}", class, e);
            }
        }

        info!("Shutdown signal received, stopping watch");
        Ok(())
    }

    async fn save_leagues(&self) -> Result<SaveReport> {
        let football = &self.football;
        let sub_type = self.league_sub_type.as_deref();

        self.engine
            .save_entities(
                &self.database.leagues,
                "id",
                move |_| async move {
                    let leagues: Vec<Value> = football
                        .fetch_all("leagues", LEAGUE_INCLUDES, None)
                        .await?
                        .into_iter()
                        .filter(|league| matches_sub_type(league, sub_type))
                        .collect();
                    Ok::<_, Error>(leagues)
                },
                mappers::map_league,
                None,
            )
            .await
    }

    async fn save_seasons(&self, ids: Option<Vec<i64>>) -> Result<SaveReport> {
        let football = &self.football;

        self.engine
            .save_entities(
                &self.database.seasons,
                "id",
                move |id| football.fetch_all("seasons", SEASON_INCLUDES, id),
                mappers::map_season,
                ids.as_deref(),
            )
            .await
    }

    async fn save_clubs(&self, ids: Option<Vec<i64>>) -> Result<SaveReport> {
        let football = &self.football;
        let context = ClubContext::from_seasons(&self.database.seasons.all()?);

        self.engine
            .save_entities(
                &self.database.clubs,
                "id",
                move |id| football.fetch_all("teams", CLUB_INCLUDES, id),
                |raw: RawTeam| context.map(raw),
                ids.as_deref(),
            )
            .await
    }

    async fn save_fixtures(&self, ids: Option<Vec<i64>>) -> Result<SaveReport> {
        let football = &self.football;

        self.engine
            .save_entities(
                &self.database.fixtures,
                "id",
                move |id| football.fetch_all("fixtures", FIXTURE_INCLUDES, id),
                mappers::map_fixture,
                ids.as_deref(),
            )
            .await
    }

    fn player_context(&self) -> Result<PlayerContext> {
        let db = &self.database;

        Ok(PlayerContext {
            now: self.scheduler.now(),
            current_season_ids: db.leagues.extract_ids("season_id", false)?,
            known_clubs: db.clubs.extract_ids("id", false)?.into_iter().collect(),
            types: db
                .types
                .all()?
                .into_iter()
                .map(|definition| (definition.id, definition))
                .collect(),
        })
    }

    async fn save_players(&self, ids: Option<Vec<i64>>) -> Result<SaveReport> {
        let football = &self.football;
        let context = self.player_context()?;

        self.engine
            .save_entities(
                &self.database.players,
                "id",
                move |id| football.fetch_all("players", PLAYER_INCLUDES, id),
                |raw: RawPlayer| context.map(raw),
                ids.as_deref(),
            )
            .await
    }

    async fn save_types(&self) -> Result<SaveReport> {
        let core = &self.core;

        self.engine
            .save_entities(
                &self.database.types,
                "id",
                move |_| core.fetch_all("types", &[], None),
                mappers::map_type,
                None,
            )
            .await
    }

    async fn save_countries(&self) -> Result<SaveReport> {
        let core = &self.core;

        self.engine
            .save_entities(
                &self.database.countries,
                "id",
                move |_| core.fetch_all("countries", &[], None),
                mappers::map_country,
                None,
            )
            .await
    }
}

fn matches_sub_type(league: &Value, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => league
            .get("sub_type")
            .and_then(Value::as_str)
            .is_some_and(|sub_type| sub_type.eq_ignore_ascii_case(wanted)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fetcher::tests::FakeTransport;
    use chrono::TimeZone;
    use serde_json::json;

    fn orchestrator(
        transport: Arc<FakeTransport>,
    ) -> (tempfile::TempDir, SyncOrchestrator<FakeTransport>) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(dir.path().join("football.db")).unwrap();

        let mut config = AppConfig::template();
        config.api_token = "test-token".to_string();
        config.football_api_url = "https://api.test/v3/football/".to_string();
        config.core_api_url = "https://api.test/v3/core/".to_string();

        let orchestrator = SyncOrchestrator::with_transport(&config, database, transport)
            .with_clock(|| Utc.with_ymd_and_hms(2025, 5, 12, 3, 0, 0).unwrap());
        (dir, orchestrator)
    }

    #[test]
    fn sub_type_filter() {
        let domestic = json!({"id": 1, "sub_type": "domestic"});
        let cup = json!({"id": 2, "sub_type": "cup_international"});
        assert!(matches_sub_type(&domestic, Some("domestic")));
        assert!(!matches_sub_type(&cup, Some("domestic")));
        assert!(matches_sub_type(&cup, None));
        assert!(!matches_sub_type(&json!({"id": 3}), Some("domestic")));
    }

    #[tokio::test]
    async fn leagues_are_filtered_and_dependents_skip_without_ids() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(
            "leagues",
            1,
            json!({"data": [
                {"id": 8, "name": "Premier League", "sub_type": "domestic", "currentseason": {"id": 23614}},
                {"id": 2, "name": "Champions League", "sub_type": "cup_international", "currentseason": {"id": 23619}}
            ]}),
        );

        let (_dir, orchestrator) = orchestrator(transport.clone());
        let summary = orchestrator
            .run_entities(&[EntityType::Leagues, EntityType::Clubs], false)
            .await
            .unwrap();

        assert!(matches!(
            summary.outcome(EntityType::Leagues),
            Some(SyncOutcome::Synced(SaveReport { inserted: 1, .. }))
        ));
        assert_eq!(
            summary.outcome(EntityType::Clubs),
            Some(&SyncOutcome::SkippedNoIds)
        );
        assert!(orchestrator.database.leagues.get(2).unwrap().is_none());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn second_run_within_interval_is_skipped() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond("types", 1, json!({"data": [{"id": 52, "name": "Goals"}]}));

        let (_dir, orchestrator) = orchestrator(transport.clone());
        orchestrator
            .run_entities(&[EntityType::Types], false)
            .await
            .unwrap();
        let second = orchestrator
            .run_entities(&[EntityType::Types], false)
            .await
            .unwrap();

        assert_eq!(
            second.outcome(EntityType::Types),
            Some(&SyncOutcome::SkippedFresh)
        );
        assert_eq!(transport.request_count(), 1);

        let forced = orchestrator
            .run_entities(&[EntityType::Types], true)
            .await
            .unwrap();
        assert!(matches!(
            forced.outcome(EntityType::Types),
            Some(SyncOutcome::Synced(_))
        ));
    }

    #[tokio::test]
    async fn upstream_failure_is_recorded_and_sweep_continues() {
        let transport = Arc::new(FakeTransport::default());
        transport.fail("types", 1, 500);
        transport.respond("countries", 1, json!({"data": [{"id": 462, "name": "England"}]}));

        let (_dir, orchestrator) = orchestrator(transport);
        let summary = orchestrator
            .run_entities(&[EntityType::Countries, EntityType::Types], false)
            .await
            .unwrap();

        assert_eq!(summary.failures().collect::<Vec<_>>(), vec![EntityType::Types]);
        assert!(matches!(
            summary.outcome(EntityType::Countries),
            Some(SyncOutcome::Synced(_))
        ));
        assert!(orchestrator
            .database
            .status
            .get(EntityType::Types)
            .unwrap()
            .unwrap()
            .last_synced_at
            .is_none());
    }
}
