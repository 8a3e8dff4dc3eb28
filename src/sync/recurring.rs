//! Calendar triggers for watch mode.
//!
//! Fast-moving entities (clubs with their rosters, fixtures, players) refresh weekly (Monday 03:00 UTC); reference data
//! refreshes twice a year (1 January and 1 July, 02:00 UTC).

use super::entity::EntityType;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshClass {
    Weekly,
    SemiAnnual,
}

impl RefreshClass {
    pub const ALL: [RefreshClass; 2] = [RefreshClass::Weekly, RefreshClass::SemiAnnual];

    pub fn entities(self) -> &'static [EntityType] {
        match self {
            // Clubs refresh with players so new roster ids are discovered.
            RefreshClass::Weekly => &[
                EntityType::Clubs,
                EntityType::Fixtures,
                EntityType::Players,
            ],
            RefreshClass::SemiAnnual => &[
                EntityType::Leagues,
                EntityType::Seasons,
                EntityType::Types,
                EntityType::Countries,
            ],
        }
    }

    /// First trigger strictly after `now`.
    pub fn next_after(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RefreshClass::Weekly => {
                let today = now.date_naive();
                let days_ahead = (7 - today.weekday().num_days_from_monday()) % 7;
                let candidate = at(today + Duration::days(i64::from(days_ahead)), 3);

                if candidate > now {
                    candidate
                } else {
                    candidate + Duration::weeks(1)
                }
            }
            RefreshClass::SemiAnnual => {
                let year = now.year();
                [(year, 7), (year + 1, 1)]
                    .into_iter()
                    .chain(std::iter::once((year, 1)))
                    .filter_map(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
                    .map(|date| at(date, 2))
                    .filter(|candidate| *candidate > now)
                    .min()
                    .unwrap_or_else(|| now + Duration::days(182))
            }
        }
    }
}

impl std::fmt::Display for RefreshClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshClass::Weekly => f.write_str("weekly"),
            RefreshClass::SemiAnnual => f.write_str("semi-annual"),
        }
    }
}

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN))
        .and_utc()
}

/// The earliest upcoming trigger across all refresh classes.
pub fn next_trigger(now: DateTime<Utc>) -> (DateTime<Utc>, RefreshClass) {
    RefreshClass::ALL
        .into_iter()
        .map(|class| (class.next_after(now), class))
        .min_by_key(|(when, _)| *when)
        .unwrap_or((RefreshClass::Weekly.next_after(now), RefreshClass::Weekly))
}

/// Sleeps until the next trigger. Returns `None` if interrupted with Ctrl-C.
pub async fn wait_for_next_trigger(now: DateTime<Utc>) -> Option<RefreshClass> {
    let (when, class) = next_trigger(now);
    let delay = (when - now).to_std().unwrap_or_default();

    info!("⏰ Next {} refresh at {}", class, when.format("%Y-%m-%d %H:%M UTC"));

    tokio::select! {
        _ = tokio::time::sleep(delay) => Some(class),
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn weekly_fires_on_monday_morning() {
        // 2025-05-11 is a Sunday.
        assert_eq!(
            RefreshClass::Weekly.next_after(utc(2025, 5, 11, 22, 0)),
            utc(2025, 5, 12, 3, 0)
        );
        assert_eq!(
            RefreshClass::Weekly.next_after(utc(2025, 5, 12, 2, 59)),
            utc(2025, 5, 12, 3, 0)
        );
        assert_eq!(
            RefreshClass::Weekly.next_after(utc(2025, 5, 12, 3, 0)),
            utc(2025, 5, 19, 3, 0)
        );
    }

    #[test]
    fn semi_annual_fires_in_january_and_july() {
        assert_eq!(
            RefreshClass::SemiAnnual.next_after(utc(2025, 6, 30, 12, 0)),
            utc(2025, 7, 1, 2, 0)
        );
        assert_eq!(
            RefreshClass::SemiAnnual.next_after(utc(2025, 7, 1, 2, 0)),
            utc(2026, 1, 1, 2, 0)
        );
        assert_eq!(
            RefreshClass::SemiAnnual.next_after(utc(2026, 1, 1, 1, 0)),
            utc(2026, 1, 1, 2, 0)
        );
    }

    #[test]
    fn next_trigger_picks_the_earliest_class() {
        let (when, class) = next_trigger(utc(2025, 6, 30, 12, 0));
        // Monday 2025-06-30 03:00 has passed; 1 July 02:00 comes before the next Monday.
        assert_eq!(class, RefreshClass::SemiAnnual);
        assert_eq!(when, utc(2025, 7, 1, 2, 0));

        let (_, class) = next_trigger(utc(2025, 3, 1, 0, 0));
        assert_eq!(class, RefreshClass::Weekly);
    }

    #[test]
    fn classes_partition_every_entity() {
        let mut covered: Vec<EntityType> = RefreshClass::ALL
            .into_iter()
            .flat_map(|class| class.entities().iter().copied())
            .collect();
        covered.sort();
        assert_eq!(covered, EntityType::SYNC_ORDER.to_vec());
    }

    #[test]
    fn weekly_refreshes_rosters_ahead_of_players() {
        let weekly = EntityType::in_sync_order(RefreshClass::Weekly.entities());
        let clubs = weekly.iter().position(|e| *e == EntityType::Clubs);
        let players = weekly.iter().position(|e| *e == EntityType::Players);

        assert!(clubs.is_some());
        assert!(clubs < players);
        assert!(!RefreshClass::SemiAnnual.entities().contains(&EntityType::Clubs));
    }
}
