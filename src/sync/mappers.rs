//! Pure transformations from raw upstream payloads to stored documents.
//!
//! Lookups a mapper needs (current season ids, stored clubs, type labels,
//! the reference "now") are injected through a context value built once
//! per sync, never recomputed inside the mapper.

use crate::clients::models::{
    RawCountry, RawFixture, RawLeague, RawPlayer, RawPlayerStatistic, RawSeason, RawTeam,
    RawTeamSpell, RawType,
};
use crate::db::{
    Club, Country, Fixture, League, Player, PlayerStatistics, Season, StatisticDetail,
    TypeDefinition,
};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// Accepts `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_api_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Upstream timestamps carry no zone and are UTC.
pub fn parse_api_datetime(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    parse_api_date(Some(value))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn map_league(raw: RawLeague) -> Result<League> {
    let season = raw.currentseason;

    Ok(League {
        id: raw.id,
        country_id: raw.country_id,
        name: raw.name,
        short_code: raw.short_code,
        logo: raw.image_path,
        season_id: season.as_ref().map(|s| s.id),
        season_name: season.as_ref().and_then(|s| s.name.clone()),
        season_start: season
            .as_ref()
            .and_then(|s| parse_api_date(s.starting_at.as_deref())),
        season_end: season
            .as_ref()
            .and_then(|s| parse_api_date(s.ending_at.as_deref())),
    })
}

pub fn map_season(raw: RawSeason) -> Result<Season> {
    Ok(Season {
        id: raw.id,
        name: raw.name,
        start_date: parse_api_date(raw.starting_at.as_deref()),
        end_date: parse_api_date(raw.ending_at.as_deref()),
        league_id: raw.league_id,
        club_ids: raw
            .teams
            .unwrap_or_default()
            .into_iter()
            .map(|team| team.id)
            .collect(),
        fixture_ids: raw
            .fixtures
            .unwrap_or_default()
            .into_iter()
            .map(|fixture| fixture.id)
            .collect(),
    })
}

/// Club lookups derived from stored seasons.
#[derive(Debug, Clone, Default)]
pub struct ClubContext {
    league_by_club: HashMap<i64, i64>,
}

impl ClubContext {
    /// When a club appears in several seasons the most recently started one wins.
    pub fn from_seasons(seasons: &[Season]) -> Self {
        let mut ordered: Vec<&Season> = seasons.iter().collect();
        ordered.sort_by_key(|season| (season.start_date, season.id));

        let mut league_by_club = HashMap::new();
        for season in ordered {
            let Some(league_id) = season.league_id else {
                continue;
            };
            for club_id in &season.club_ids {
                league_by_club.insert(*club_id, league_id);
            }
        }

        Self { league_by_club }
    }

    pub fn map(&self, raw: RawTeam) -> Result<Club> {
        Ok(Club {
            league_id: self.league_by_club.get(&raw.id).copied(),
            id: raw.id,
            country_id: raw.country_id,
            name: raw.name,
            short_code: raw.short_code,
            logo: raw.image_path,
            roster: raw
                .players
                .unwrap_or_default()
                .into_iter()
                .map(|player| player.player_id)
                .collect(),
        })
    }
}

pub fn map_fixture(raw: RawFixture) -> Result<Fixture> {
    let participants = raw.participants.unwrap_or_default();
    let side = |location: &str| {
        participants
            .iter()
            .find(|participant| {
                participant
                    .meta
                    .as_ref()
                    .and_then(|meta| meta.location.as_deref())
                    .is_some_and(|l| l.eq_ignore_ascii_case(location))
            })
            .map(|participant| participant.id)
    };

    Ok(Fixture {
        id: raw.id,
        name: raw.name,
        league_id: raw.league_id,
        season_id: raw.season_id,
        stage_id: raw.stage_id,
        round_id: raw.round_id,
        start_date: parse_api_datetime(raw.starting_at.as_deref()),
        home_team_id: side("home"),
        away_team_id: side("away"),
        lineups: raw
            .lineups
            .unwrap_or_default()
            .into_iter()
            .map(|player| player.player_id)
            .collect(),
    })
}

/// Team-history entry whose `[start, end)` interval contains `on`.
/// A missing end is open-ended; the latest start wins when several match.
pub fn resolve_current_club(history: &[RawTeamSpell], on: NaiveDate) -> Option<i64> {
    history
        .iter()
        .filter_map(|spell| {
            let start = parse_api_date(spell.start.as_deref());
            let end = parse_api_date(spell.end.as_deref());

            let started = start.map_or(true, |start| start <= on);
            let not_ended = end.map_or(true, |end| on < end);

            (started && not_ended).then_some((start, spell.team_id))
        })
        .max_by_key(|(start, _)| *start)
        .map(|(_, team_id)| team_id)
}

/// Everything the player mapper resolves against, fixed for one sync.
#[derive(Debug, Clone)]
pub struct PlayerContext {
    pub now: DateTime<Utc>,
    pub current_season_ids: BTreeSet<i64>,
    pub known_clubs: HashSet<i64>,
    pub types: HashMap<i64, TypeDefinition>,
}

impl PlayerContext {
    fn label(&self, type_id: Option<i64>) -> String {
        type_id
            .and_then(|id| self.types.get(&id))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    fn current_statistics(&self, statistics: Vec<RawPlayerStatistic>) -> Option<PlayerStatistics> {
        let current = statistics
            .into_iter()
            .find(|stat| self.current_season_ids.contains(&stat.season_id))?;

        let details = current
            .details
            .map(|details| details.into_vec())
            .unwrap_or_default()
            .into_iter()
            .map(|detail| StatisticDetail {
                type_info: self.types.get(&detail.type_id).map(TypeDefinition::info),
                id: detail.id,
                type_id: detail.type_id,
                value: detail.value,
            })
            .collect();

        Some(PlayerStatistics {
            id: current.id,
            season_id: current.season_id,
            team_id: current.team_id,
            details,
        })
    }

    pub fn map(&self, raw: RawPlayer) -> Result<Player> {
        if raw.name.is_none() && raw.display_name.is_none() && raw.common_name.is_none() {
            return Err(Error::mapping(Some(raw.id), "player has no name fields"));
        }

        let club_id = raw
            .teams
            .as_deref()
            .and_then(|history| resolve_current_club(history, self.now.date_naive()))
            .filter(|team_id| {
                let known = self.known_clubs.contains(team_id);
                if !known {
                    debug!("player {} is at club {} which is not stored", raw.id, team_id);
                }
                known
            });

        let country = raw.country;

        Ok(Player {
            id: raw.id,
            type_id: raw.type_id,
            position_id: raw.position_id,
            position_name: self.label(raw.position_id),
            detailed_position_id: raw.detailed_position_id,
            detailed_position_name: self.label(raw.detailed_position_id),
            first_name: raw.firstname,
            last_name: raw.lastname,
            name: raw.name,
            common_name: raw.common_name,
            display_name: raw.display_name,
            photo: raw.image_path,
            country_id: raw.country_id.or(country.as_ref().map(|c| c.id)),
            country_name: country.as_ref().and_then(|c| c.name.clone()),
            country_flag: country.as_ref().and_then(|c| c.image_path.clone()),
            country_fifa_name: country.as_ref().and_then(|c| c.fifa_name.clone()),
            country_iso3: country.as_ref().and_then(|c| c.iso3.clone()),
            statistics: raw
                .statistics
                .and_then(|statistics| self.current_statistics(statistics)),
            club_id,
        })
    }
}

pub fn map_type(raw: RawType) -> Result<TypeDefinition> {
    Ok(TypeDefinition {
        id: raw.id,
        name: raw.name,
        code: raw.code,
        developer_name: raw.developer_name,
        model_type: raw.model_type,
        stat_group: raw.stat_group,
    })
}

pub fn map_country(raw: RawCountry) -> Result<Country> {
    Ok(Country {
        id: raw.id,
        name: raw.name,
        fifa_name: raw.fifa_name,
        iso3: raw.iso3,
        flag: raw.image_path,
    })
}
