//! Normalized documents persisted by the sync engine.
//!
//! Every document is keyed by its upstream numeric `id`. Derived arrays
//! (season club/fixture ids, club roster, fixture lineup) are rebuilt in
//! full whenever the owning entity syncs.

use super::store::Document;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: i64,
    pub country_id: Option<i64>,
    pub name: String,
    pub short_code: Option<String>,
    pub logo: Option<String>,
    /// Snapshot of the league's current season, overwritten on every sync.
    pub season_id: Option<i64>,
    pub season_name: Option<String>,
    pub season_start: Option<NaiveDate>,
    pub season_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: i64,
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub league_id: Option<i64>,
    #[serde(default)]
    pub club_ids: Vec<i64>,
    #[serde(default)]
    pub fixture_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    pub id: i64,
    pub country_id: Option<i64>,
    pub name: String,
    pub short_code: Option<String>,
    pub logo: Option<String>,
    pub league_id: Option<i64>,
    #[serde(default)]
    pub roster: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: i64,
    pub name: Option<String>,
    pub league_id: Option<i64>,
    pub season_id: Option<i64>,
    pub stage_id: Option<i64>,
    pub round_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    #[serde(default)]
    pub lineups: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub type_id: Option<i64>,
    pub position_id: Option<i64>,
    pub position_name: String,
    pub detailed_position_id: Option<i64>,
    pub detailed_position_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub common_name: Option<String>,
    pub display_name: Option<String>,
    pub photo: Option<String>,
    pub country_id: Option<i64>,
    pub country_name: Option<String>,
    pub country_flag: Option<String>,
    pub country_fifa_name: Option<String>,
    pub country_iso3: Option<String>,
    /// Statistics for the first currently active season the player has entries for.
    pub statistics: Option<PlayerStatistics>,
    /// Stored club the player is at on the sync's reference date.
    pub club_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatistics {
    pub id: Option<i64>,
    pub season_id: i64,
    pub team_id: Option<i64>,
    pub details: Vec<StatisticDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticDetail {
    pub id: Option<i64>,
    pub type_id: i64,
    pub value: serde_json::Value,
    /// Human-readable label from the Type table, `None` when the type is unknown.
    pub type_info: Option<TypeInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub code: Option<String>,
    pub developer_name: Option<String>,
    pub stat_group: Option<String>,
}

/// Generic lookup row labelling position and statistic type ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub developer_name: Option<String>,
    pub model_type: Option<String>,
    pub stat_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: i64,
    pub name: Option<String>,
    pub fifa_name: Option<String>,
    pub iso3: Option<String>,
    pub flag: Option<String>,
}

impl TypeDefinition {
    pub fn info(&self) -> TypeInfo {
        TypeInfo {
            name: self.name.clone(),
            code: self.code.clone(),
            developer_name: self.developer_name.clone(),
            stat_group: self.stat_group.clone(),
        }
    }
}

macro_rules! document {
    ($ty:ty, $collection:literal) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> i64 {
                self.id
            }
        }
    };
}

document!(League, "leagues");
document!(Season, "seasons");
document!(Club, "clubs");
document!(Fixture, "fixtures");
document!(Player, "players");
document!(TypeDefinition, "types");
document!(Country, "countries");
