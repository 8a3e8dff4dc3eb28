pub mod models;
pub mod status;
pub mod store;

use crate::Result;
use fjall::{Keyspace, PersistMode};
use std::path::Path;
use tracing::info;

pub use models::{
    Club, Country, Fixture, League, Player, PlayerStatistics, Season, StatisticDetail,
    TypeDefinition, TypeInfo,
};
pub use status::{StatusStore, SyncStatusRecord};
pub use store::{Collection, Document, UpsertOutcome};

pub struct Database {
    keyspace: Keyspace,
    pub leagues: Collection<League>,
    pub seasons: Collection<Season>,
    pub clubs: Collection<Club>,
    pub fixtures: Collection<Fixture>,
    pub players: Collection<Player>,
    pub types: Collection<TypeDefinition>,
    pub countries: Collection<Country>,
    pub status: StatusStore,
}

impl Database {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();

        // Create the database directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = fjall::Config::new(db_path).open()?;

        let database = Self {
            leagues: Collection::open(&keyspace)?,
            seasons: Collection::open(&keyspace)?,
            clubs: Collection::open(&keyspace)?,
            fixtures: Collection::open(&keyspace)?,
            players: Collection::open(&keyspace)?,
            types: Collection::open(&keyspace)?,
            countries: Collection::open(&keyspace)?,
            status: StatusStore::open(&keyspace)?,
            keyspace,
        };

        info!("Opened database at {}", db_path.display());
        Ok(database)
    }

    pub fn flush(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    /// Document counts per collection, in sync order.
    pub fn collection_sizes(&self) -> Result<Vec<(&'static str, usize)>> {
        Ok(vec![
            (self.leagues.name(), self.leagues.len()?),
            (self.seasons.name(), self.seasons.len()?),
            (self.clubs.name(), self.clubs.len()?),
            (self.fixtures.name(), self.fixtures.len()?),
            (self.players.name(), self.players.len()?),
            (self.types.name(), self.types.len()?),
            (self.countries.name(), self.countries.len()?),
        ])
    }
}
