//! Configuration management with layered hierarchy
//!
//! Priority (lowest to highest): built-in defaults, global config
//! (`<global dir>/config.yaml`), project config (`.linctl/config.yaml`),
//! environment variables.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default lifetime of cached entity lists
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 60;

/// Environment overrides
pub const TTL_ENV: &str = "LINCTL_CACHE_TTL";
pub const SNAPSHOT_ENV: &str = "LINCTL_REMOTE_SNAPSHOT";
pub const NO_CACHE_ENV: &str = "LINCTL_NO_CACHE";

/// linctl configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Minutes before a cached entity list is considered stale
    pub cache_ttl_minutes: Option<u64>,

    /// Minutes before a cached project name lookup is considered stale
    pub project_cache_ttl_minutes: Option<u64>,

    /// In-memory entity cache for the duration of a command
    pub entity_cache: Option<bool>,

    /// File-backed entity cache shared between invocations
    pub persistent_cache: Option<bool>,

    /// Master switch: when false no cache tier is consulted
    pub session_cache: Option<bool>,

    /// Path to the JSON snapshot backing the remote lookups
    pub remote_snapshot: Option<String>,
}

impl Config {
    /// Load configuration from a global and an optional project file, then the environment
    pub fn load_from(global_path: &Path, project_path: Option<&Path>) -> Self {
        let mut config = Config::default();

        if let Some(global) = Self::read_layer(global_path) {
            config.merge(global);
        }

        if let Some(project) = project_path.and_then(Self::read_layer) {
            config.merge(project);
        }

        config.apply_env();
        config
    }

    /// Read one YAML layer; unreadable layers are skipped
    fn read_layer(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        if contents.trim().is_empty() {
            return None;
        }
        // A file holding only comments parses as null
        let parsed = serde_yml::from_str::<serde_yml::Value>(&contents)
            .and_then(|value| match value {
                serde_yml::Value::Null => Ok(None),
                value => serde_yml::from_value::<Config>(value).map(Some),
            });
        match parsed {
            Ok(layer) => layer,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring malformed config: {}", e);
                None
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(ttl) = std::env::var(TTL_ENV) {
            match ttl.parse() {
                Ok(minutes) => self.cache_ttl_minutes = Some(minutes),
                Err(_) => tracing::warn!("{} must be a whole number of minutes, got '{}'", TTL_ENV, ttl),
            }
        }
        if let Ok(path) = std::env::var(SNAPSHOT_ENV) {
            if !path.is_empty() {
                self.remote_snapshot = Some(path);
            }
        }
        if let Ok(value) = std::env::var(NO_CACHE_ENV) {
            if !value.is_empty() && value != "0" && value != "false" {
                self.session_cache = Some(false);
            }
        }
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.cache_ttl_minutes.is_some() {
            self.cache_ttl_minutes = other.cache_ttl_minutes;
        }
        if other.project_cache_ttl_minutes.is_some() {
            self.project_cache_ttl_minutes = other.project_cache_ttl_minutes;
        }
        if other.entity_cache.is_some() {
            self.entity_cache = other.entity_cache;
        }
        if other.persistent_cache.is_some() {
            self.persistent_cache = other.persistent_cache;
        }
        if other.session_cache.is_some() {
            self.session_cache = other.session_cache;
        }
        if other.remote_snapshot.is_some() {
            self.remote_snapshot = other.remote_snapshot;
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        minutes(self.cache_ttl_minutes.unwrap_or(DEFAULT_CACHE_TTL_MINUTES))
    }

    pub fn project_cache_ttl(&self) -> Duration {
        match self.project_cache_ttl_minutes {
            Some(m) => minutes(m),
            None => self.cache_ttl(),
        }
    }

    pub fn session_cache_enabled(&self) -> bool {
        self.session_cache.unwrap_or(true)
    }

    pub fn memory_cache_enabled(&self) -> bool {
        self.session_cache_enabled() && self.entity_cache.unwrap_or(true)
    }

    pub fn persistent_cache_enabled(&self) -> bool {
        self.session_cache_enabled() && self.persistent_cache.unwrap_or(false)
    }

    /// Snapshot location, relative paths taken from the global directory
    pub fn remote_snapshot_path(&self, global_dir: &Path) -> PathBuf {
        match &self.remote_snapshot {
            Some(path) => {
                let path = PathBuf::from(path);
                if path.is_absolute() {
                    path
                } else {
                    global_dir.join(path)
                }
            }
            None => global_dir.join("remote.json"),
        }
    }
}

fn minutes(m: u64) -> Duration {
    Duration::minutes(i64::try_from(m).unwrap_or(i64::MAX).min(i64::MAX / 60_000))
}

/// Cache tuning values, consulted on every cache check
pub trait CacheSettings {
    fn ttl(&self) -> Duration;

    fn memory_enabled(&self) -> bool;

    fn persistent_enabled(&self) -> bool;

    /// Whether any caching is honored at all
    fn session_enabled(&self) -> bool {
        self.memory_enabled() || self.persistent_enabled()
    }

    /// Lifetime of the project resolver's name cache
    fn project_name_ttl(&self) -> Duration {
        self.ttl()
    }
}

impl CacheSettings for Config {
    fn ttl(&self) -> Duration {
        self.cache_ttl()
    }

    fn memory_enabled(&self) -> bool {
        self.memory_cache_enabled()
    }

    fn persistent_enabled(&self) -> bool {
        self.persistent_cache_enabled()
    }

    fn session_enabled(&self) -> bool {
        self.session_cache_enabled()
    }

    fn project_name_ttl(&self) -> Duration {
        self.project_cache_ttl()
    }
}

/// Configuration re-read from disk on every query
///
/// A user editing the config mid-session sees the change on the next cache check.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    global_path: PathBuf,
    project_path: Option<PathBuf>,
}

impl LiveConfig {
    pub fn new(global_path: PathBuf, project_path: Option<PathBuf>) -> Self {
        Self {
            global_path,
            project_path,
        }
    }

    pub fn current(&self) -> Config {
        Config::load_from(&self.global_path, self.project_path.as_deref())
    }
}

impl CacheSettings for LiveConfig {
    fn ttl(&self) -> Duration {
        self.current().cache_ttl()
    }

    fn memory_enabled(&self) -> bool {
        self.current().memory_cache_enabled()
    }

    fn persistent_enabled(&self) -> bool {
        self.current().persistent_cache_enabled()
    }

    fn session_enabled(&self) -> bool {
        self.current().session_cache_enabled()
    }

    fn project_name_ttl(&self) -> Duration {
        self.current().project_cache_ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::minutes(60));
        assert!(config.memory_cache_enabled());
        assert!(!config.persistent_cache_enabled());
        assert_eq!(config.project_cache_ttl(), config.cache_ttl());
    }

    #[test]
    fn test_project_layer_overrides_global() {
        let tmp = tempdir().unwrap();
        let global = tmp.path().join("global.yaml");
        let project = tmp.path().join("project.yaml");
        std::fs::write(&global, "cache_ttl_minutes: 5\npersistent_cache: true\n").unwrap();
        std::fs::write(&project, "cache_ttl_minutes: 10\n").unwrap();

        let config = Config::load_from(&global, Some(&project));
        assert_eq!(config.cache_ttl_minutes, Some(10));
        assert_eq!(config.persistent_cache, Some(true));
    }

    #[test]
    fn test_session_switch_disables_every_tier() {
        let config = Config {
            session_cache: Some(false),
            persistent_cache: Some(true),
            ..Config::default()
        };
        assert!(!config.memory_cache_enabled());
        assert!(!config.persistent_cache_enabled());
    }

    #[test]
    fn test_malformed_layer_is_ignored() {
        let tmp = tempdir().unwrap();
        let global = tmp.path().join("config.yaml");
        std::fs::write(&global, "cache_ttl_minutes: [not a number\n").unwrap();

        let config = Config::load_from(&global, None);
        assert_eq!(config.cache_ttl_minutes, None);
    }

    #[test]
    fn test_comment_only_layer_is_empty() {
        let tmp = tempdir().unwrap();
        let project = tmp.path().join("config.yaml");
        std::fs::write(&project, "# cache_ttl_minutes: 60\n").unwrap();

        assert_eq!(Config::read_layer(&project), None);
    }

    #[test]
    fn test_live_config_sees_edits() {
        let tmp = tempdir().unwrap();
        let global = tmp.path().join("config.yaml");
        let live = LiveConfig::new(global.clone(), None);

        assert!(live.memory_enabled());
        std::fs::write(&global, "entity_cache: false\n").unwrap();
        assert!(!live.memory_enabled());
    }

    #[test]
    fn test_relative_snapshot_path_is_under_global_dir() {
        let config = Config {
            remote_snapshot: Some("snap.json".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.remote_snapshot_path(Path::new("/g")),
            PathBuf::from("/g/snap.json")
        );
        assert_eq!(
            Config::default().remote_snapshot_path(Path::new("/g")),
            PathBuf::from("/g/remote.json")
        );
    }
}
