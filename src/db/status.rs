use crate::sync::EntityType;
use crate::Result;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Control-plane row for one entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusRecord {
    pub entity_type: EntityType,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncStatusRecord {
    pub fn new(entity_type: EntityType) -> Self {
        let now = Utc::now();

        Self {
            entity_type,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone)]
pub struct StatusStore {
    statuses: PartitionHandle,
}

impl StatusStore {
    pub fn open(keyspace: &Keyspace) -> Result<Self> {
        let statuses =
            keyspace.open_partition("sync_status", PartitionCreateOptions::default())?;

        debug!("status tracking store initialized");

        Ok(Self { statuses })
    }

    fn store(&self, record: &SyncStatusRecord) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        self.statuses
            .insert(record.entity_type.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get(&self, entity: EntityType) -> Result<Option<SyncStatusRecord>> {
        match self.statuses.get(entity.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Returns the row for `entity`, creating it with a null timestamp on first use.
    pub fn ensure(&self, entity: EntityType) -> Result<SyncStatusRecord> {
        if let Some(record) = self.get(entity)? {
            return Ok(record);
        }

        let record = SyncStatusRecord::new(entity);
        self.store(&record)?;
        debug!("Created sync status row for {}", entity);
        Ok(record)
    }

    pub fn mark_synced(&self, entity: EntityType, at: DateTime<Utc>) -> Result<SyncStatusRecord> {
        let mut record = self.ensure(entity)?;
        record.last_synced_at = Some(at);
        record.updated_at = Utc::now();

        self.store(&record)?;
        debug!("Updated sync status for {} to {}", entity, at);
        Ok(record)
    }

    /// Clears the timestamp so the next evaluation treats `entity` as never synced.
    pub fn reset(&self, entity: EntityType) -> Result<()> {
        let mut record = self.ensure(entity)?;
        record.last_synced_at = None;
        record.updated_at = Utc::now();
        self.store(&record)
    }

    pub fn list(&self) -> Result<Vec<SyncStatusRecord>> {
        let mut records = Vec::new();

        for item in self.statuses.iter() {
            let (_, value) = item?;
            records.push(serde_json::from_slice::<SyncStatusRecord>(&value)?);
        }

        records.sort_by_key(|record| record.entity_type);
        Ok(records)
    }
}
