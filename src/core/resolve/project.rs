//! Project resolution with a file-backed name cache

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use super::{first_success, Resolution, ResolveError, ResolvedBy, Resolver, Strategy};
use crate::core::alias::{AliasError, Scope};
use crate::core::identity::{is_canonical_id, EntityKind};
use crate::core::jsonfile::{read_json_or_default, write_json};
use crate::core::remote::RemoteEntity;
use crate::core::sync::slugify;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCacheEntry {
    pub id: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

type NameCacheDocument = BTreeMap<String, NameCacheEntry>;

/// Lower-cased project name to ID, with its own TTL
#[derive(Debug, Clone)]
pub struct ProjectNameCache {
    path: PathBuf,
}

impl ProjectNameCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> NameCacheDocument {
        read_json_or_default(&self.path)
    }

    /// Unexpired entry for `name`, ignoring case
    pub fn get(&self, name: &str, now: DateTime<Utc>, ttl: Duration) -> Option<NameCacheEntry> {
        self.read()
            .remove(&name.to_lowercase())
            .filter(|entry| now - entry.timestamp < ttl)
    }

    pub fn put(&self, project: &RemoteEntity, now: DateTime<Utc>) -> io::Result<()> {
        let mut document = self.read();
        document.insert(
            project.name.to_lowercase(),
            NameCacheEntry {
                id: project.id.clone(),
                name: project.name.clone(),
                timestamp: now,
            },
        );
        write_json(&self.path, &document)
    }

    pub fn forget(&self, name: &str) -> io::Result<()> {
        let mut document = self.read();
        if document.remove(&name.to_lowercase()).is_some() {
            write_json(&self.path, &document)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl<'a> Resolver<'a> {
    /// id (confirmed), alias (confirmed), name cache (confirmed), remote name
    pub fn resolve_project(
        &self,
        input: &str,
        auto_alias: Option<Scope>,
    ) -> Result<Option<Resolution>, ResolveError> {
        // A literal ID is never read as an alias or a name
        if is_canonical_id(EntityKind::Project, input) {
            return Ok(self.confirmed_project_id(input));
        }
        first_success(vec![
            Strategy::new("alias", || Ok(self.confirmed_alias(EntityKind::Project, input))),
            Strategy::new("name cache", || Ok(self.cached_project_name(input))),
            Strategy::new("name", || self.remote_project_name(input, auto_alias)),
        ])
    }

    fn confirmed_project_id(&self, input: &str) -> Option<Resolution> {
        let existence = self.remote().confirm_exists(EntityKind::Project, input);
        if !existence.valid {
            tracing::warn!(
                "project {} could not be confirmed: {}",
                input,
                existence.error.unwrap_or_default()
            );
            return None;
        }
        Some(Resolution::new(input, ResolvedBy::Id).with_name(existence.name))
    }

    fn cached_project_name(&self, input: &str) -> Option<Resolution> {
        let settings = self.cache.settings();
        if !settings.session_enabled() {
            return None;
        }
        let entry = self
            .project_names
            .get(input, self.cache.now(), settings.project_name_ttl())?;

        let existence = self.remote().confirm_exists(EntityKind::Project, &entry.id);
        if existence.valid {
            return Some(Resolution::new(entry.id, ResolvedBy::Cache).with_name(existence.name));
        }

        tracing::debug!(input, id = %entry.id, "stale project name cache entry");
        if let Err(e) = self.project_names.forget(input) {
            tracing::warn!("failed to update project name cache: {}", e);
        }
        None
    }

    fn remote_project_name(
        &self,
        input: &str,
        auto_alias: Option<Scope>,
    ) -> Result<Option<Resolution>, ResolveError> {
        let Some(project) = self.remote().find_by_exact_name(EntityKind::Project, input)? else {
            return Ok(None);
        };

        if self.cache.settings().session_enabled() {
            if let Err(e) = self.project_names.put(&project, self.cache.now()) {
                tracing::warn!("failed to write project name cache: {}", e);
            }
        }

        let mut resolution = Resolution::from_entity(project, ResolvedBy::Name);
        if let Some(scope) = auto_alias {
            resolution.created_alias = self.auto_alias(&resolution, scope);
        }
        Ok(Some(resolution))
    }

    /// Alias a project found by name; failures only warn
    fn auto_alias(&self, resolution: &Resolution, scope: Scope) -> Option<String> {
        let name = resolution.name.as_deref()?;
        let slug = slugify(name);
        if slug.is_empty() {
            tracing::warn!("project name '{}' has no usable alias slug", name);
            return None;
        }

        match self.store.add(
            self.remote(),
            EntityKind::Project,
            &slug,
            &resolution.id,
            scope,
            true,
        ) {
            Ok(()) => Some(slug),
            Err(AliasError::AlreadyPointsHere { .. }) => None,
            Err(e) => {
                tracing::warn!("could not create alias '{}': {}", slug, e);
                None
            }
        }
    }
}
