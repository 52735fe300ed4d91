//! File-backed tier of the entity cache
//!
//! Layout: `{ "<document key>": [ { ...entity, "timestamp": <ms> } ] }`.
//! Every record of a kind carries the time its list was fetched.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use super::types::CachedEntityList;
use crate::core::identity::EntityKind;
use crate::core::jsonfile::{read_json, write_json, ReadFailure};
use crate::core::remote::RemoteEntity;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedRecord {
    #[serde(flatten)]
    entity: RemoteEntity,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

type PersistedDocument = BTreeMap<String, Vec<PersistedRecord>>;

#[derive(Debug, Clone)]
pub struct PersistentTier {
    path: PathBuf,
}

impl PersistentTier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<PersistedDocument, ReadFailure> {
        read_json(&self.path)
    }

    /// Read the document; failures degrade to empty (a cache miss)
    fn read_or_empty(&self) -> PersistedDocument {
        match self.read() {
            Ok(document) => document,
            Err(failure) => {
                if !failure.is_missing() {
                    tracing::warn!("entity cache unreadable, ignoring: {}", failure);
                }
                PersistedDocument::new()
            }
        }
    }

    fn write(&self, document: &PersistedDocument) -> io::Result<()> {
        write_json(&self.path, document)
    }

    /// Load one kind's list; empty or missing lists are `None`
    pub fn load(&self, kind: EntityKind) -> Option<CachedEntityList> {
        let records = self.read_or_empty().remove(kind.document_key())?;
        list_from_records(records)
    }

    /// Load every stored kind
    pub fn load_all(&self) -> BTreeMap<EntityKind, CachedEntityList> {
        self.read_or_empty()
            .into_iter()
            .filter_map(|(key, records)| {
                let kind = EntityKind::from_document_key(&key)?;
                Some((kind, list_from_records(records)?))
            })
            .collect()
    }

    pub fn store(&self, kind: EntityKind, list: &CachedEntityList) -> io::Result<()> {
        let mut document = self.read_or_empty();
        let records = list
            .data
            .iter()
            .map(|entity| PersistedRecord {
                entity: entity.clone(),
                timestamp: list.timestamp,
            })
            .collect();
        document.insert(kind.document_key().to_string(), records);
        self.write(&document)
    }

    pub fn remove(&self, kind: EntityKind) -> io::Result<()> {
        let mut document = self.read_or_empty();
        if document.remove(kind.document_key()).is_some() {
            self.write(&document)?;
        }
        Ok(())
    }

    /// Delete the whole file
    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Drop every kind whose list has expired; returns the dropped kinds
    pub fn prune(&self, now: DateTime<Utc>, ttl: Duration) -> io::Result<Vec<EntityKind>> {
        let document = self.read_or_empty();
        let mut kept = PersistedDocument::new();
        let mut pruned = Vec::new();

        for (key, records) in document {
            let fresh = list_from_records(records.clone())
                .map(|list| list.is_fresh(now, ttl))
                .unwrap_or(false);
            if fresh {
                kept.insert(key, records);
            } else if let Some(kind) = EntityKind::from_document_key(&key) {
                pruned.push(kind);
            }
        }

        if !pruned.is_empty() {
            self.write(&kept)?;
        }
        Ok(pruned)
    }
}

/// The list is as old as its oldest record
fn list_from_records(records: Vec<PersistedRecord>) -> Option<CachedEntityList> {
    let timestamp = records.iter().map(|r| r.timestamp).min()?;
    let data = records.into_iter().map(|r| r.entity).collect();
    Some(CachedEntityList::new(data, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_records_carry_injected_timestamp() {
        let tmp = tempdir().unwrap();
        let tier = PersistentTier::new(tmp.path().join("cache/entities.json"));
        let now = Utc::now();
        let list = CachedEntityList::new(vec![RemoteEntity::new("team_1", "Platform")], now);

        tier.store(EntityKind::Team, &list).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tier.path()).unwrap()).unwrap();
        assert_eq!(raw["teams"][0]["id"], "team_1");
        assert_eq!(raw["teams"][0]["timestamp"], now.timestamp_millis());

        let loaded = tier.load(EntityKind::Team).unwrap();
        assert_eq!(loaded.data, list.data);
        assert_eq!(loaded.timestamp.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("entities.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let tier = PersistentTier::new(&path);
        assert!(tier.load(EntityKind::Team).is_none());
        assert!(matches!(tier.read(), Err(ReadFailure::Corrupt { .. })));
    }

    #[test]
    fn test_prune_drops_only_expired_kinds() {
        let tmp = tempdir().unwrap();
        let tier = PersistentTier::new(tmp.path().join("entities.json"));
        let now = Utc::now();
        tier.store(
            EntityKind::Team,
            &CachedEntityList::new(vec![RemoteEntity::new("team_1", "A")], now - Duration::hours(2)),
        )
        .unwrap();
        tier.store(
            EntityKind::Initiative,
            &CachedEntityList::new(vec![RemoteEntity::new("init_1", "B")], now),
        )
        .unwrap();

        let pruned = tier.prune(now, Duration::hours(1)).unwrap();
        assert_eq!(pruned, vec![EntityKind::Team]);
        assert!(tier.load(EntityKind::Team).is_none());
        assert!(tier.load(EntityKind::Initiative).is_some());
    }
}
