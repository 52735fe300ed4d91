//! Two-tier entity cache for "list all entities of kind X"
//!
//! Lookup order for an unfiltered list:
//! - the in-memory tier (if enabled and unexpired)
//! - the file-backed tier (if enabled and unexpired), promoted into memory
//! - the remote, stamped with `now` and written through to enabled tiers
//!
//! TTL and enable flags come from [`CacheSettings`] on every check. The cache
//! is an explicit object owned by one command invocation, not a global.

mod persist;
mod types;

pub use persist::PersistentTier;
pub use types::*;

use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::HashMap;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::CacheSettings;
use crate::core::identity::EntityKind;
use crate::core::remote::{EntityFilter, Remote, RemoteEntity, RemoteError};

/// The entity cache for one command invocation
pub struct EntityCache<'a> {
    remote: &'a dyn Remote,
    settings: &'a dyn CacheSettings,
    persistent: PersistentTier,
    clock: Box<dyn Clock + 'a>,
    memory: RefCell<HashMap<EntityKind, CachedEntityList>>,
}

impl<'a> EntityCache<'a> {
    pub fn new(
        remote: &'a dyn Remote,
        settings: &'a dyn CacheSettings,
        persistent: PersistentTier,
    ) -> Self {
        Self::with_clock(remote, settings, persistent, SystemClock)
    }

    pub fn with_clock(
        remote: &'a dyn Remote,
        settings: &'a dyn CacheSettings,
        persistent: PersistentTier,
        clock: impl Clock + 'a,
    ) -> Self {
        Self {
            remote,
            settings,
            persistent,
            clock: Box::new(clock),
            memory: RefCell::new(HashMap::new()),
        }
    }

    pub fn remote(&self) -> &'a dyn Remote {
        self.remote
    }

    pub fn persistent_tier(&self) -> &PersistentTier {
        &self.persistent
    }

    pub fn settings(&self) -> &'a dyn CacheSettings {
        self.settings
    }

    /// Current time according to the cache's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Get every entity of a kind
    ///
    /// A non-empty filter goes straight to the remote and never touches either tier.
    pub fn get(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
    ) -> Result<Vec<RemoteEntity>, RemoteError> {
        if !filter.is_empty() {
            tracing::debug!(%kind, "filtered request, bypassing cache");
            return self.remote.fetch_all(kind, filter);
        }

        let now = self.clock.now();
        let ttl = self.settings.ttl();
        let memory_enabled = self.settings.memory_enabled();

        if memory_enabled {
            if let Some(list) = self.memory.borrow().get(&kind) {
                if list.is_fresh(now, ttl) {
                    tracing::debug!(%kind, count = list.data.len(), "memory cache hit");
                    return Ok(list.data.clone());
                }
            }
        }

        if self.settings.persistent_enabled() {
            if let Some(list) = self.persistent.load(kind) {
                if list.is_fresh(now, ttl) {
                    tracing::debug!(%kind, count = list.data.len(), "disk cache hit");
                    let data = list.data.clone();
                    if memory_enabled {
                        self.memory.borrow_mut().insert(kind, list);
                    }
                    return Ok(data);
                }
            }
        }

        tracing::debug!(%kind, "cache miss, fetching from remote");
        let data = self.remote.fetch_all(kind, filter)?;
        self.store(kind, CachedEntityList::new(data.clone(), now));
        Ok(data)
    }

    fn store(&self, kind: EntityKind, list: CachedEntityList) {
        if self.settings.persistent_enabled() {
            if let Err(e) = self.persistent.store(kind, &list) {
                tracing::warn!(%kind, "failed to write entity cache: {}", e);
            }
        }
        if self.settings.memory_enabled() {
            self.memory.borrow_mut().insert(kind, list);
        }
    }

    pub fn find_by_id(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<RemoteEntity>, RemoteError> {
        Ok(self.get(kind, &EntityFilter::none())?.into_iter().find(|e| e.id == id))
    }

    /// Exact, case-sensitive name match
    pub fn find_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<RemoteEntity>, RemoteError> {
        Ok(self
            .get(kind, &EntityFilter::none())?
            .into_iter()
            .find(|e| e.name == name))
    }

    /// Every entity whose name equals `name` ignoring case
    pub fn find_all_by_name_ignore_case(
        &self,
        kind: EntityKind,
        name: &str,
        filter: &EntityFilter,
    ) -> Result<Vec<RemoteEntity>, RemoteError> {
        Ok(self
            .get(kind, filter)?
            .into_iter()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .collect())
    }

    pub fn find_member_by_email(&self, email: &str) -> Result<Option<RemoteEntity>, RemoteError> {
        Ok(self
            .get(EntityKind::Member, &EntityFilter::none())?
            .into_iter()
            .find(|m| {
                m.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            }))
    }

    /// Team lookup by its short key (`ENG`), ignoring case
    pub fn find_team_by_key(&self, key: &str) -> Result<Option<RemoteEntity>, RemoteError> {
        Ok(self
            .get(EntityKind::Team, &EntityFilter::none())?
            .into_iter()
            .find(|t| t.key.as_deref().is_some_and(|k| k.eq_ignore_ascii_case(key))))
    }

    /// Drop every kind from both tiers
    pub fn clear(&self) {
        self.memory.borrow_mut().clear();
        if let Err(e) = self.persistent.clear() {
            tracing::warn!("failed to remove entity cache file: {}", e);
        }
    }

    /// Drop one kind from both tiers
    pub fn clear_entity(&self, kind: EntityKind) {
        self.memory.borrow_mut().remove(&kind);
        if let Err(e) = self.persistent.remove(kind) {
            tracing::warn!(%kind, "failed to update entity cache file: {}", e);
        }
    }

    /// Evict every expired slot; safe to call at any time
    pub fn invalidate_if_expired(&self) -> Vec<EntityKind> {
        let now = self.clock.now();
        let ttl = self.settings.ttl();

        let mut evicted: Vec<EntityKind> = Vec::new();
        self.memory.borrow_mut().retain(|kind, list| {
            let keep = list.is_fresh(now, ttl);
            if !keep {
                evicted.push(*kind);
            }
            keep
        });

        match self.persistent.prune(now, ttl) {
            Ok(pruned) => {
                for kind in pruned {
                    if !evicted.contains(&kind) {
                        evicted.push(kind);
                    }
                }
            }
            Err(e) => tracing::warn!("failed to prune entity cache file: {}", e),
        }

        evicted.sort();
        evicted
    }

    /// Per-kind introspection; memory wins over disk when both hold a list
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let ttl = self.settings.ttl();
        let memory = self.memory.borrow();
        let disk = self.persistent.load_all();

        let entries = EntityKind::all()
            .iter()
            .map(|kind| {
                let slot = memory
                    .get(kind)
                    .map(|l| (l, CacheTier::Memory))
                    .or_else(|| disk.get(kind).map(|l| (l, CacheTier::Persistent)));
                let stats = match slot {
                    Some((list, tier)) => EntityStats {
                        cached: list.is_fresh(now, ttl),
                        count: list.data.len(),
                        age: Some(list.age(now)),
                        tier: Some(tier),
                    },
                    None => EntityStats::empty(),
                };
                (*kind, stats)
            })
            .collect();

        CacheStats { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::testing::ManualClock;
    use crate::core::config::Config;
    use crate::core::remote::testing::CountingRemote;
    use chrono::Duration;
    use tempfile::{tempdir, TempDir};

    fn teams_remote() -> CountingRemote {
        CountingRemote::new(vec![
            (
                EntityKind::Team,
                RemoteEntity::new("team_1", "Platform").with_key("PLT"),
            ),
            (
                EntityKind::Team,
                RemoteEntity::new("team_2", "Design").with_key("DES"),
            ),
            (
                EntityKind::Member,
                RemoteEntity::new("user_1", "Ada")
                    .with_email("ada@example.com")
                    .with_team("team_1"),
            ),
        ])
    }

    fn tier() -> (TempDir, PersistentTier) {
        let tmp = tempdir().unwrap();
        let tier = PersistentTier::new(tmp.path().join("cache/entities.json"));
        (tmp, tier)
    }

    fn settings(ttl_minutes: u64, persistent: bool) -> Config {
        Config {
            cache_ttl_minutes: Some(ttl_minutes),
            persistent_cache: Some(persistent),
            ..Config::default()
        }
    }

    #[test]
    fn test_ttl_boundary() {
        let remote = teams_remote();
        let config = settings(1, false);
        let (_tmp, tier) = tier();
        let clock = ManualClock::new();
        let cache = EntityCache::with_clock(&remote, &config, tier, clock.clone());

        cache.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        assert_eq!(remote.fetch_all_calls.get(), 1);

        clock.advance(Duration::seconds(54)); // 0.9 of the TTL
        cache.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        assert_eq!(remote.fetch_all_calls.get(), 1);

        clock.advance(Duration::seconds(12)); // 1.1 of the TTL
        cache.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        assert_eq!(remote.fetch_all_calls.get(), 2);
    }

    #[test]
    fn test_filtered_requests_bypass_cache() {
        let remote = teams_remote();
        let config = settings(60, true);
        let (_tmp, tier) = tier();
        let cache = EntityCache::new(&remote, &config, tier);

        let filter = EntityFilter::teams(vec!["team_1".to_string()]);
        cache.get(EntityKind::Member, &filter).unwrap();
        cache.get(EntityKind::Member, &filter).unwrap();
        assert_eq!(remote.fetch_all_calls.get(), 2);

        let stats = cache.stats();
        assert!(!stats.get(EntityKind::Member).unwrap().cached);
        assert!(cache.persistent_tier().load(EntityKind::Member).is_none());
    }

    #[test]
    fn test_disk_tier_seeds_next_process() {
        let remote = teams_remote();
        let config = settings(60, true);
        let (_tmp, tier) = tier();

        {
            let first = EntityCache::new(&remote, &config, tier.clone());
            first.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        }
        assert_eq!(remote.fetch_all_calls.get(), 1);

        let second = EntityCache::new(&remote, &config, tier);
        let teams = second.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(remote.fetch_all_calls.get(), 1);
        assert_eq!(
            second.stats().get(EntityKind::Team).unwrap().tier,
            Some(CacheTier::Memory)
        );
    }

    #[test]
    fn test_disabled_tiers_always_fetch() {
        let remote = teams_remote();
        let config = Config {
            session_cache: Some(false),
            persistent_cache: Some(true),
            ..Config::default()
        };
        let (_tmp, tier) = tier();
        let cache = EntityCache::new(&remote, &config, tier);

        cache.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        cache.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        assert_eq!(remote.fetch_all_calls.get(), 2);
        assert!(!cache.persistent_tier().path().exists());
    }

    #[test]
    fn test_empty_result_is_refetched() {
        let remote = teams_remote();
        let config = settings(60, false);
        let (_tmp, tier) = tier();
        let cache = EntityCache::new(&remote, &config, tier);

        assert!(cache.get(EntityKind::Cycle, &EntityFilter::none()).unwrap().is_empty());
        cache.get(EntityKind::Cycle, &EntityFilter::none()).unwrap();
        assert_eq!(remote.fetch_all_calls.get(), 2);
    }

    #[test]
    fn test_finders_scan_cached_list() {
        let remote = teams_remote();
        let config = settings(60, false);
        let (_tmp, tier) = tier();
        let cache = EntityCache::new(&remote, &config, tier);

        assert_eq!(
            cache.find_by_name(EntityKind::Team, "Design").unwrap().unwrap().id,
            "team_2"
        );
        assert!(cache.find_by_name(EntityKind::Team, "design").unwrap().is_none());
        assert_eq!(cache.find_team_by_key("plt").unwrap().unwrap().id, "team_1");
        assert_eq!(
            cache.find_member_by_email("ADA@EXAMPLE.COM").unwrap().unwrap().id,
            "user_1"
        );
        assert!(cache.find_by_id(EntityKind::Team, "team_2").unwrap().is_some());
        // Team list fetched once, member list once
        assert_eq!(remote.fetch_all_calls.get(), 2);
    }

    #[test]
    fn test_clear_and_invalidate() {
        let remote = teams_remote();
        let config = settings(10, true);
        let (_tmp, tier) = tier();
        let clock = ManualClock::new();
        let cache = EntityCache::with_clock(&remote, &config, tier, clock.clone());

        cache.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        cache.get(EntityKind::Member, &EntityFilter::none()).unwrap();

        cache.clear_entity(EntityKind::Team);
        assert!(!cache.stats().get(EntityKind::Team).unwrap().cached);
        assert!(cache.stats().get(EntityKind::Member).unwrap().cached);

        assert!(cache.invalidate_if_expired().is_empty());
        clock.advance(Duration::minutes(11));
        assert_eq!(cache.invalidate_if_expired(), vec![EntityKind::Member]);
        assert!(cache.invalidate_if_expired().is_empty());

        cache.get(EntityKind::Team, &EntityFilter::none()).unwrap();
        cache.clear();
        assert_eq!(cache.stats().cached_kinds(), 0);
        assert!(!cache.persistent_tier().path().exists());
    }
}
