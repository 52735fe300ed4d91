//! Alias store: user-chosen names for remote entity IDs
//!
//! Aliases live in two JSON documents, one per scope. The global document is
//! user-wide; the project document sits in `.linctl/` and shadows global
//! entries with the same key. Both are read fresh on every call so an edit is
//! visible to the very next command.
//!
//! There is no file locking: two processes writing the same document race and
//! the last writer wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{is_canonical_id, EntityKind};
use crate::core::jsonfile::{read_json, read_json_or_default, write_json, ReadFailure};
use crate::core::project::Workspace;
use crate::core::remote::Remote;

/// Which physical store an alias lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Project,
}

impl Scope {
    pub fn all() -> &'static [Scope] {
        &[Scope::Global, Scope::Project]
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Project => write!(f, "project"),
        }
    }
}

/// One alias document (one per scope)
///
/// Each entity kind has its own `alias -> id` map; the JSON keys match
/// [`EntityKind::document_key`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AliasDocument {
    pub initiatives: BTreeMap<String, String>,
    pub teams: BTreeMap<String, String>,
    pub projects: BTreeMap<String, String>,
    pub project_statuses: BTreeMap<String, String>,
    pub issue_templates: BTreeMap<String, String>,
    pub project_templates: BTreeMap<String, String>,
    pub members: BTreeMap<String, String>,
    pub workflow_states: BTreeMap<String, String>,
    pub issue_labels: BTreeMap<String, String>,
    pub project_labels: BTreeMap<String, String>,
    pub cycles: BTreeMap<String, String>,
}

impl AliasDocument {
    pub fn map(&self, kind: EntityKind) -> &BTreeMap<String, String> {
        match kind {
            EntityKind::Initiative => &self.initiatives,
            EntityKind::Team => &self.teams,
            EntityKind::Project => &self.projects,
            EntityKind::ProjectStatus => &self.project_statuses,
            EntityKind::IssueTemplate => &self.issue_templates,
            EntityKind::ProjectTemplate => &self.project_templates,
            EntityKind::Member => &self.members,
            EntityKind::WorkflowState => &self.workflow_states,
            EntityKind::IssueLabel => &self.issue_labels,
            EntityKind::ProjectLabel => &self.project_labels,
            EntityKind::Cycle => &self.cycles,
        }
    }

    pub fn map_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<String, String> {
        match kind {
            EntityKind::Initiative => &mut self.initiatives,
            EntityKind::Team => &mut self.teams,
            EntityKind::Project => &mut self.projects,
            EntityKind::ProjectStatus => &mut self.project_statuses,
            EntityKind::IssueTemplate => &mut self.issue_templates,
            EntityKind::ProjectTemplate => &mut self.project_templates,
            EntityKind::Member => &mut self.members,
            EntityKind::WorkflowState => &mut self.workflow_states,
            EntityKind::IssueLabel => &mut self.issue_labels,
            EntityKind::ProjectLabel => &mut self.project_labels,
            EntityKind::Cycle => &mut self.cycles,
        }
    }

    /// Iterate `(kind, alias, id)` over every entry
    pub fn entries(&self) -> impl Iterator<Item = (EntityKind, &str, &str)> {
        EntityKind::all().iter().flat_map(move |kind| {
            self.map(*kind)
                .iter()
                .map(move |(alias, id)| (*kind, alias.as_str(), id.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        EntityKind::all().iter().map(|k| self.map(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a merged alias came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasLocation {
    #[serde(rename = "type")]
    pub scope: Scope,
    pub path: PathBuf,
}

/// Both scopes merged, project entries overriding global ones
#[derive(Debug, Default, Clone)]
pub struct ResolvedAliasView {
    pub aliases: BTreeMap<EntityKind, BTreeMap<String, String>>,
    pub locations: BTreeMap<EntityKind, BTreeMap<String, AliasLocation>>,
}

impl ResolvedAliasView {
    pub fn get(&self, kind: EntityKind, alias: &str) -> Option<&str> {
        self.aliases
            .get(&kind)
            .and_then(|m| m.get(alias))
            .map(String::as_str)
    }

    pub fn location(&self, kind: EntityKind, alias: &str) -> Option<&AliasLocation> {
        self.locations.get(&kind).and_then(|m| m.get(alias))
    }

    /// Aliases of one kind, sorted by key
    pub fn entries(&self, kind: EntityKind) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .get(&kind)
            .into_iter()
            .flat_map(|m| m.iter().map(|(a, id)| (a.as_str(), id.as_str())))
    }

    /// Every alias (in either scope) currently pointing at `id`
    pub fn aliases_for(&self, kind: EntityKind, id: &str) -> Vec<&str> {
        self.entries(kind)
            .filter(|(_, target)| *target == id)
            .map(|(alias, _)| alias)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.aliases.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn overlay(&mut self, document: &AliasDocument, location: &AliasLocation) {
        for (kind, alias, id) in document.entries() {
            self.aliases
                .entry(kind)
                .or_default()
                .insert(alias.to_string(), id.to_string());
            self.locations
                .entry(kind)
                .or_default()
                .insert(alias.to_string(), location.clone());
        }
    }
}

/// An alias whose target no longer exists remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenAlias {
    pub kind: EntityKind,
    pub alias: String,
    pub target_id: String,
    pub location: AliasLocation,
    pub error: Option<String>,
}

/// Result of checking every alias against the remote
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub broken: Vec<BrokenAlias>,
    pub total: usize,
}

/// Errors that can occur during alias operations
#[derive(Debug, Error)]
pub enum AliasError {
    #[error("invalid alias '{alias}': {reason}")]
    Format { alias: String, reason: &'static str },

    #[error("alias '{alias}' not found for {} in {scope} scope", .kind.label())]
    NotFound {
        kind: EntityKind,
        alias: String,
        scope: Scope,
    },

    #[error("alias '{alias}' already points to this {} in {scope} scope", .kind.label())]
    AlreadyPointsHere {
        kind: EntityKind,
        alias: String,
        scope: Scope,
    },

    #[error("alias '{alias}' already exists for {} in {scope} scope (points to {existing}); use remove first", .kind.label())]
    Conflict {
        kind: EntityKind,
        alias: String,
        scope: Scope,
        existing: String,
    },

    #[error("{} '{id}' not found{}", .kind.label(), reason_suffix(.reason))]
    EntityNotFound {
        kind: EntityKind,
        id: String,
        reason: Option<String>,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AliasError {
    /// Both "already points here" and "points elsewhere" are conflicts
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AliasError::AlreadyPointsHere { .. } | AliasError::Conflict { .. }
        )
    }
}

/// Durable CRUD over the two alias documents
#[derive(Debug, Clone)]
pub struct AliasStore {
    global_path: PathBuf,
    project_path: PathBuf,
}

impl AliasStore {
    pub fn new(global_path: impl Into<PathBuf>, project_path: impl Into<PathBuf>) -> Self {
        Self {
            global_path: global_path.into(),
            project_path: project_path.into(),
        }
    }

    pub fn for_workspace(workspace: &Workspace) -> Self {
        Self::new(
            workspace.alias_path(Scope::Global),
            workspace.alias_path(Scope::Project),
        )
    }

    pub fn path(&self, scope: Scope) -> &Path {
        match scope {
            Scope::Global => &self.global_path,
            Scope::Project => &self.project_path,
        }
    }

    pub fn location(&self, scope: Scope) -> AliasLocation {
        AliasLocation {
            scope,
            path: self.path(scope).to_path_buf(),
        }
    }

    /// Read one scope's document, reporting why it could not be read
    pub fn read_scope(&self, scope: Scope) -> Result<AliasDocument, ReadFailure> {
        read_json(self.path(scope))
    }

    /// Read one scope's document, degrading to empty
    pub fn document(&self, scope: Scope) -> AliasDocument {
        read_json_or_default(self.path(scope))
    }

    fn save(&self, scope: Scope, document: &AliasDocument) -> Result<(), AliasError> {
        let path = self.path(scope);
        write_json(path, document).map_err(|source| AliasError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge both scopes into one view; never fails
    pub fn load(&self) -> ResolvedAliasView {
        let mut view = ResolvedAliasView::default();
        for scope in Scope::all() {
            view.overlay(&self.document(*scope), &self.location(*scope));
        }
        view
    }

    /// Look up an alias in the merged view
    pub fn lookup(&self, kind: EntityKind, alias: &str) -> Option<(String, AliasLocation)> {
        let view = self.load();
        let id = view.get(kind, alias)?.to_string();
        let location = view.location(kind, alias)?.clone();
        Some((id, location))
    }

    /// Resolve `input` to an ID, or return it unchanged
    ///
    /// Canonical-looking input is returned as-is without consulting the store.
    pub fn resolve(&self, kind: EntityKind, input: &str) -> String {
        if is_canonical_id(kind, input) {
            return input.to_string();
        }
        match self.lookup(kind, input) {
            Some((id, _)) => id,
            None => input.to_string(),
        }
    }

    /// Create an alias in one scope
    pub fn add(
        &self,
        remote: &dyn Remote,
        kind: EntityKind,
        alias: &str,
        id: &str,
        scope: Scope,
        skip_validation: bool,
    ) -> Result<(), AliasError> {
        validate_alias_text(kind, alias)?;

        if !skip_validation {
            confirm_target(remote, kind, id)?;
        }

        let mut document = self.document(scope);
        let map = document.map_mut(kind);
        if let Some(existing) = map.get(alias) {
            return Err(if existing == id {
                AliasError::AlreadyPointsHere {
                    kind,
                    alias: alias.to_string(),
                    scope,
                }
            } else {
                AliasError::Conflict {
                    kind,
                    alias: alias.to_string(),
                    scope,
                    existing: existing.clone(),
                }
            });
        }

        map.insert(alias.to_string(), id.to_string());
        self.save(scope, &document)?;
        tracing::debug!(%kind, alias, id, %scope, "alias added");
        Ok(())
    }

    /// Delete an alias, returning the ID it pointed to
    pub fn remove(&self, kind: EntityKind, alias: &str, scope: Scope) -> Result<String, AliasError> {
        let mut document = self.document(scope);
        let previous = document
            .map_mut(kind)
            .remove(alias)
            .ok_or_else(|| AliasError::NotFound {
                kind,
                alias: alias.to_string(),
                scope,
            })?;
        self.save(scope, &document)?;
        tracing::debug!(%kind, alias, %scope, "alias removed");
        Ok(previous)
    }

    /// Rename an alias in place, returning its (unchanged) target
    pub fn rename(
        &self,
        kind: EntityKind,
        old_alias: &str,
        new_alias: &str,
        scope: Scope,
    ) -> Result<String, AliasError> {
        validate_alias_text(kind, new_alias)?;

        let mut document = self.document(scope);
        let map = document.map_mut(kind);

        if let Some(existing) = map.get(new_alias) {
            return Err(AliasError::Conflict {
                kind,
                alias: new_alias.to_string(),
                scope,
                existing: existing.clone(),
            });
        }

        let id = map.remove(old_alias).ok_or_else(|| AliasError::NotFound {
            kind,
            alias: old_alias.to_string(),
            scope,
        })?;
        map.insert(new_alias.to_string(), id.clone());

        self.save(scope, &document)?;
        Ok(id)
    }

    /// Point an existing alias at a different ID, returning the previous one
    pub fn update_target_id(
        &self,
        remote: &dyn Remote,
        kind: EntityKind,
        alias: &str,
        new_id: &str,
        scope: Scope,
        skip_validation: bool,
    ) -> Result<String, AliasError> {
        let mut document = self.document(scope);
        if !document.map(kind).contains_key(alias) {
            return Err(AliasError::NotFound {
                kind,
                alias: alias.to_string(),
                scope,
            });
        }

        if !skip_validation {
            confirm_target(remote, kind, new_id)?;
        }

        let previous = document
            .map_mut(kind)
            .insert(alias.to_string(), new_id.to_string())
            .unwrap_or_default();
        self.save(scope, &document)?;
        Ok(previous)
    }

    /// Check every alias of every kind in both scopes against the remote
    ///
    /// Shadowed global entries are checked too; each broken entry carries the
    /// scope and file it lives in.
    pub fn validate_all(&self, remote: &dyn Remote) -> ValidationReport {
        let mut report = ValidationReport::default();

        for scope in Scope::all() {
            let document = self.document(*scope);
            let location = self.location(*scope);
            for (kind, alias, id) in document.entries() {
                report.total += 1;
                let existence = remote.confirm_exists(kind, id);
                if !existence.valid {
                    report.broken.push(BrokenAlias {
                        kind,
                        alias: alias.to_string(),
                        target_id: id.to_string(),
                        location: location.clone(),
                        error: existence.error,
                    });
                }
            }
        }

        report
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(": {}", r),
        None => String::new(),
    }
}

/// Reject keys that `resolve` could never reach
fn validate_alias_text(kind: EntityKind, alias: &str) -> Result<(), AliasError> {
    let reason = if alias.is_empty() || alias.chars().any(char::is_whitespace) {
        "aliases cannot contain whitespace"
    } else if is_canonical_id(kind, alias) {
        "aliases cannot look like an entity ID"
    } else {
        return Ok(());
    };
    Err(AliasError::Format {
        alias: alias.to_string(),
        reason,
    })
}

fn confirm_target(remote: &dyn Remote, kind: EntityKind, id: &str) -> Result<(), AliasError> {
    let existence = remote.confirm_exists(kind, id);
    if existence.valid {
        Ok(())
    } else {
        Err(AliasError::EntityNotFound {
            kind,
            id: id.to_string(),
            reason: existence.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::remote::{RemoteEntity, SnapshotRemote};
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, AliasStore) {
        let tmp = tempdir().unwrap();
        let store = AliasStore::new(
            tmp.path().join("global/aliases.json"),
            tmp.path().join("project/.linctl/aliases.json"),
        );
        (tmp, store)
    }

    fn remote() -> SnapshotRemote {
        SnapshotRemote::from_entities(vec![
            (EntityKind::Team, RemoteEntity::new("team_123", "Engineering")),
            (EntityKind::Team, RemoteEntity::new("team_456", "Design")),
            (EntityKind::Initiative, RemoteEntity::new("init_1", "Core")),
        ])
    }

    #[test]
    fn test_add_then_resolve_records_scope() {
        let (_tmp, store) = store();
        let remote = remote();

        store
            .add(&remote, EntityKind::Team, "eng", "team_123", Scope::Project, false)
            .unwrap();

        assert_eq!(store.resolve(EntityKind::Team, "eng"), "team_123");
        let view = store.load();
        assert_eq!(
            view.location(EntityKind::Team, "eng").unwrap().scope,
            Scope::Project
        );
        assert!(store.path(Scope::Project).exists());
        assert!(!store.path(Scope::Global).exists());
    }

    #[test]
    fn test_project_shadows_global() {
        let (_tmp, store) = store();
        let remote = remote();

        store
            .add(&remote, EntityKind::Initiative, "core", "init_X", Scope::Global, true)
            .unwrap();
        store
            .add(&remote, EntityKind::Initiative, "core", "init_Y", Scope::Project, true)
            .unwrap();

        assert_eq!(store.resolve(EntityKind::Initiative, "core"), "init_Y");

        store.remove(EntityKind::Initiative, "core", Scope::Project).unwrap();
        assert_eq!(store.resolve(EntityKind::Initiative, "core"), "init_X");
    }

    #[test]
    fn test_canonical_input_bypasses_store() {
        let (_tmp, store) = store();
        let remote = remote();

        // A hand-edited key that looks like a canonical ID is never consulted
        let mut document = AliasDocument::default();
        document
            .map_mut(EntityKind::Team)
            .insert("team_abcd123".to_string(), "team_456".to_string());
        write_json(store.path(Scope::Global), &document).unwrap();

        assert_eq!(store.resolve(EntityKind::Team, "team_abcd123"), "team_abcd123");
        assert_eq!(store.resolve(EntityKind::Team, "unknown"), "unknown");
    }

    #[test]
    fn test_id_shaped_alias_is_rejected() {
        let (_tmp, store) = store();
        let remote = remote();

        let err = store
            .add(&remote, EntityKind::Team, "team_abc", "team_123", Scope::Global, true)
            .unwrap_err();
        assert!(matches!(err, AliasError::Format { .. }));
        assert!(!store.path(Scope::Global).exists());

        // Only the kind's own prefix counts
        store
            .add(&remote, EntityKind::Project, "team_abc", "proj_1", Scope::Global, true)
            .unwrap();
        assert_eq!(store.resolve(EntityKind::Project, "team_abc"), "proj_1");

        store
            .add(&remote, EntityKind::Team, "eng", "team_123", Scope::Global, true)
            .unwrap();
        let err = store
            .rename(EntityKind::Team, "eng", "team_eng", Scope::Global)
            .unwrap_err();
        assert!(matches!(err, AliasError::Format { .. }));
        assert_eq!(store.resolve(EntityKind::Team, "eng"), "team_123");
    }

    #[test]
    fn test_add_conflict_scenarios() {
        let (_tmp, store) = store();
        let remote = remote();

        store
            .add(&remote, EntityKind::Team, "eng", "team_123", Scope::Global, false)
            .unwrap();

        let same = store
            .add(&remote, EntityKind::Team, "eng", "team_123", Scope::Global, false)
            .unwrap_err();
        assert!(matches!(same, AliasError::AlreadyPointsHere { .. }));
        assert!(same.to_string().contains("already points to this team"));

        let different = store
            .add(&remote, EntityKind::Team, "eng", "team_456", Scope::Global, false)
            .unwrap_err();
        assert!(matches!(different, AliasError::Conflict { .. }));
        assert!(different.to_string().contains("already exists"));
        assert!(different.to_string().contains("use remove first"));
        assert!(same.is_conflict() && different.is_conflict());
    }

    #[test]
    fn test_add_rejects_whitespace_and_unknown_targets() {
        let (_tmp, store) = store();
        let remote = remote();

        let err = store
            .add(&remote, EntityKind::Team, "my team", "team_123", Scope::Global, false)
            .unwrap_err();
        assert!(matches!(err, AliasError::Format { .. }));

        let err = store
            .add(&remote, EntityKind::Team, "ghost", "team_999", Scope::Global, false)
            .unwrap_err();
        assert!(matches!(err, AliasError::EntityNotFound { .. }));

        // Skipping validation accepts an unverifiable target
        store
            .add(&remote, EntityKind::Team, "ghost", "team_999", Scope::Global, true)
            .unwrap();
    }

    #[test]
    fn test_remove_missing_alias() {
        let (_tmp, store) = store();
        let err = store.remove(EntityKind::Team, "nope", Scope::Global).unwrap_err();
        assert!(matches!(err, AliasError::NotFound { .. }));
    }

    #[test]
    fn test_rename_roundtrip() {
        let (_tmp, store) = store();
        let remote = remote();
        store
            .add(&remote, EntityKind::Team, "eng", "team_123", Scope::Global, false)
            .unwrap();
        let before = store.resolve(EntityKind::Team, "eng");

        let id = store
            .rename(EntityKind::Team, "eng", "engineering", Scope::Global)
            .unwrap();
        assert_eq!(id, before);
        assert_eq!(store.resolve(EntityKind::Team, "engineering"), before);
        assert_eq!(store.resolve(EntityKind::Team, "eng"), "eng");
    }

    #[test]
    fn test_rename_never_overwrites() {
        let (_tmp, store) = store();
        let remote = remote();
        store
            .add(&remote, EntityKind::Team, "eng", "team_123", Scope::Global, true)
            .unwrap();
        store
            .add(&remote, EntityKind::Team, "design", "team_456", Scope::Global, true)
            .unwrap();

        let err = store
            .rename(EntityKind::Team, "eng", "design", Scope::Global)
            .unwrap_err();
        assert!(matches!(err, AliasError::Conflict { .. }));
        assert_eq!(store.resolve(EntityKind::Team, "design"), "team_456");

        let err = store
            .rename(EntityKind::Team, "missing", "other", Scope::Global)
            .unwrap_err();
        assert!(matches!(err, AliasError::NotFound { .. }));
    }

    #[test]
    fn test_update_target_returns_previous() {
        let (_tmp, store) = store();
        let remote = remote();
        store
            .add(&remote, EntityKind::Team, "eng", "team_123", Scope::Global, false)
            .unwrap();

        let previous = store
            .update_target_id(&remote, EntityKind::Team, "eng", "team_456", Scope::Global, false)
            .unwrap();
        assert_eq!(previous, "team_123");
        assert_eq!(store.resolve(EntityKind::Team, "eng"), "team_456");

        let err = store
            .update_target_id(&remote, EntityKind::Team, "eng", "team_000", Scope::Global, false)
            .unwrap_err();
        assert!(matches!(err, AliasError::EntityNotFound { .. }));
    }

    #[test]
    fn test_validate_all_reports_broken_with_location() {
        let (_tmp, store) = store();
        let remote = remote();
        store
            .add(&remote, EntityKind::Team, "eng", "team_123", Scope::Global, false)
            .unwrap();
        store
            .add(&remote, EntityKind::Initiative, "old", "init_gone", Scope::Project, true)
            .unwrap();

        let report = store.validate_all(&remote);
        assert_eq!(report.total, 2);
        assert_eq!(report.broken.len(), 1);
        let broken = &report.broken[0];
        assert_eq!(broken.alias, "old");
        assert_eq!(broken.location.scope, Scope::Project);
        assert_eq!(broken.location.path, store.path(Scope::Project));
    }

    #[test]
    fn test_corrupt_document_reads_as_empty() {
        let (_tmp, store) = store();
        let path = store.path(Scope::Global);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "not json at all").unwrap();

        assert!(matches!(
            store.read_scope(Scope::Global),
            Err(ReadFailure::Corrupt { .. })
        ));
        assert!(store.load().is_empty());
        assert!(store.read_scope(Scope::Project).unwrap_err().is_missing());
    }

    #[test]
    fn test_document_uses_camel_case_keys() {
        let mut document = AliasDocument::default();
        document
            .map_mut(EntityKind::IssueTemplate)
            .insert("bug".to_string(), "itpl_1".to_string());
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["issueTemplates"]["bug"], "itpl_1");
        for kind in EntityKind::all() {
            assert!(json.get(kind.document_key()).is_some(), "missing {}", kind);
        }
    }
}
