//! Raw upstream payload shapes, as returned by the football and core APIs.
//!
//! Only the fields the mappers read are modelled; everything else in the
//! payload is ignored. Include-dependent fields are optional because they
//! only appear when the matching `includes` entry was requested.

use serde::{Deserialize, Serialize};

/// Fields that arrive either as a single object or as a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLeague {
    pub id: i64,
    pub country_id: Option<i64>,
    pub name: String,
    pub short_code: Option<String>,
    pub image_path: Option<String>,
    pub sub_type: Option<String>,
    #[serde(alias = "currentSeason")]
    pub currentseason: Option<RawSeasonSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSeasonSummary {
    pub id: i64,
    pub name: Option<String>,
    pub starting_at: Option<String>,
    pub ending_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSeason {
    pub id: i64,
    pub name: Option<String>,
    pub league_id: Option<i64>,
    pub starting_at: Option<String>,
    pub ending_at: Option<String>,
    pub teams: Option<Vec<RawIdRef>>,
    pub fixtures: Option<Vec<RawIdRef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIdRef {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTeam {
    pub id: i64,
    pub country_id: Option<i64>,
    pub name: String,
    pub short_code: Option<String>,
    pub image_path: Option<String>,
    pub players: Option<Vec<RawPlayerRef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayerRef {
    pub player_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFixture {
    pub id: i64,
    pub name: Option<String>,
    pub league_id: Option<i64>,
    pub season_id: Option<i64>,
    pub stage_id: Option<i64>,
    pub round_id: Option<i64>,
    pub starting_at: Option<String>,
    pub participants: Option<Vec<RawParticipant>>,
    pub lineups: Option<Vec<RawPlayerRef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawParticipant {
    pub id: i64,
    pub meta: Option<RawParticipantMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawParticipantMeta {
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayer {
    pub id: i64,
    pub position_id: Option<i64>,
    pub detailed_position_id: Option<i64>,
    pub type_id: Option<i64>,
    pub country_id: Option<i64>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub name: Option<String>,
    pub common_name: Option<String>,
    pub display_name: Option<String>,
    pub image_path: Option<String>,
    pub country: Option<RawCountry>,
    pub statistics: Option<Vec<RawPlayerStatistic>>,
    pub teams: Option<Vec<RawTeamSpell>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayerStatistic {
    pub id: Option<i64>,
    pub season_id: i64,
    pub team_id: Option<i64>,
    pub details: Option<OneOrMany<RawStatisticDetail>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStatisticDetail {
    pub id: Option<i64>,
    pub type_id: i64,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// One entry of a player's time-ranged team history.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTeamSpell {
    pub team_id: i64,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCountry {
    pub id: i64,
    pub name: Option<String>,
    pub fifa_name: Option<String>,
    pub iso3: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawType {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub developer_name: Option<String>,
    pub model_type: Option<String>,
    pub stat_group: Option<String>,
}
