use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The unit of sync scheduling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Leagues,
    Seasons,
    Clubs,
    Fixtures,
    Players,
    Types,
    Countries,
}

impl EntityType {
    /// Dependency order: each tier discovers its ids from the ones before it.
    pub const SYNC_ORDER: [EntityType; 7] = [
        EntityType::Leagues,
        EntityType::Seasons,
        EntityType::Clubs,
        EntityType::Fixtures,
        EntityType::Players,
        EntityType::Types,
        EntityType::Countries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Leagues => "leagues",
            EntityType::Seasons => "seasons",
            EntityType::Clubs => "clubs",
            EntityType::Fixtures => "fixtures",
            EntityType::Players => "players",
            EntityType::Types => "types",
            EntityType::Countries => "countries",
        }
    }

    /// Filters `selection` down to `SYNC_ORDER`, dropping duplicates.
    pub fn in_sync_order(selection: &[EntityType]) -> Vec<EntityType> {
        Self::SYNC_ORDER
            .into_iter()
            .filter(|entity| selection.contains(entity))
            .collect()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_reordered_by_dependency() {
        let selection = [
            EntityType::Players,
            EntityType::Leagues,
            EntityType::Clubs,
            EntityType::Leagues,
        ];
        assert_eq!(
            EntityType::in_sync_order(&selection),
            vec![EntityType::Leagues, EntityType::Clubs, EntityType::Players]
        );
    }

    #[test]
    fn parses_tags() {
        assert_eq!(
            EntityType::from_str("Fixtures", true).unwrap(),
            EntityType::Fixtures
        );
        assert!(EntityType::from_str("venues", true).is_err());
        assert_eq!(
            serde_json::to_string(&EntityType::Countries).unwrap(),
            "\"countries\""
        );
    }
}
