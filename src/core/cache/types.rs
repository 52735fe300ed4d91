//! Cache type definitions

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::identity::EntityKind;
use crate::core::remote::RemoteEntity;

/// A memoized "list all entities of kind X" result
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntityList {
    pub data: Vec<RemoteEntity>,
    pub timestamp: DateTime<Utc>,
}

impl CachedEntityList {
    pub fn new(data: Vec<RemoteEntity>, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    /// Valid iff non-empty and younger than `ttl`
    ///
    /// An empty list means "never fetched", not "fetched and empty".
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.data.is_empty() && self.age(now) < ttl
    }
}

/// Which tier answered (or holds) a cached list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Memory,
    Persistent,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTier::Memory => write!(f, "memory"),
            CacheTier::Persistent => write!(f, "disk"),
        }
    }
}

/// Introspection for one entity kind
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStats {
    pub cached: bool,
    pub count: usize,
    pub age: Option<Duration>,
    pub tier: Option<CacheTier>,
}

impl EntityStats {
    pub fn empty() -> Self {
        Self {
            cached: false,
            count: 0,
            age: None,
            tier: None,
        }
    }
}

/// Per-kind cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: BTreeMap<EntityKind, EntityStats>,
}

impl CacheStats {
    pub fn get(&self, kind: EntityKind) -> Option<&EntityStats> {
        self.entries.get(&kind)
    }

    pub fn cached_kinds(&self) -> usize {
        self.entries.values().filter(|s| s.cached).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_is_never_fresh() {
        let now = Utc::now();
        let list = CachedEntityList::new(Vec::new(), now);
        assert!(!list.is_fresh(now, Duration::minutes(60)));
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let list = CachedEntityList::new(vec![RemoteEntity::new("team_1", "A")], now);
        let ttl = Duration::minutes(10);
        assert!(list.is_fresh(now + Duration::minutes(9), ttl));
        assert!(!list.is_fresh(now + ttl, ttl));
    }
}
