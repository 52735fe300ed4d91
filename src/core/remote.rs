//! Remote entity lookups
//!
//! The resolver and cache only need four questions answered about the remote
//! workspace: list a kind, fetch one by id, find one by exact name, and confirm
//! that an id still exists. `SnapshotRemote` answers them from a JSON export.

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::EntityKind;
use crate::core::jsonfile::{read_json, ReadFailure};

/// A remote entity reduced to what aliases and caches need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntity {
    pub id: String,
    pub name: String,

    /// Members only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Short key (teams)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Sequence number (cycles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    /// Teams the entity belongs to (members, cycles, workflow states)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub team_ids: Vec<String>,
}

impl RemoteEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            key: None,
            number: None,
            team_ids: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_ids.push(team_id.into());
        self
    }

    pub fn in_any_team(&self, team_ids: &[String]) -> bool {
        self.team_ids.iter().any(|t| team_ids.contains(t))
    }
}

/// Narrowing parameters for a list request
///
/// A filtered list is never equivalent to the organization-wide list, so
/// non-empty filters bypass the entity cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFilter {
    pub team_ids: Vec<String>,
}

impl EntityFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn teams(team_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            team_ids: team_ids.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.team_ids.is_empty()
    }

    pub fn matches(&self, entity: &RemoteEntity) -> bool {
        self.is_empty() || entity.in_any_team(&self.team_ids)
    }
}

/// Outcome of an existence check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Existence {
    pub valid: bool,
    pub name: Option<String>,
    pub error: Option<String>,
}

impl Existence {
    pub fn found(name: impl Into<String>) -> Self {
        Self {
            valid: true,
            name: Some(name.into()),
            error: None,
        }
    }

    pub fn missing(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            name: None,
            error: Some(error.into()),
        }
    }
}

/// Remote entity lookups consumed by the alias store, cache and resolvers
pub trait Remote {
    /// List every entity of a kind, optionally narrowed
    fn fetch_all(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
    ) -> Result<Vec<RemoteEntity>, RemoteError>;

    fn fetch_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<RemoteEntity>, RemoteError>;

    /// Exact name match (case-insensitive)
    fn find_by_exact_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<RemoteEntity>, RemoteError>;

    /// Member lookup by email (case-insensitive)
    fn find_member_by_email(&self, email: &str) -> Result<Option<RemoteEntity>, RemoteError> {
        let members = self.fetch_all(EntityKind::Member, &EntityFilter::none())?;
        Ok(members.into_iter().find(|m| {
            m.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        }))
    }

    /// Confirm an id still exists; failures are reported, never raised
    fn confirm_exists(&self, kind: EntityKind, id: &str) -> Existence {
        match self.fetch_by_id(kind, id) {
            Ok(Some(entity)) => Existence::found(entity.name),
            Ok(None) => Existence::missing(format!("{} '{}' not found", kind.label(), id)),
            Err(e) => Existence::missing(e.to_string()),
        }
    }
}

/// Errors that can occur talking to the remote
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote data unavailable: {0}")]
    Unavailable(String),

    #[error("remote request failed: {0}")]
    RequestFailed(String),
}

/// Snapshot document: `{ "<document key>": [entity, ...] }`
type SnapshotDocument = BTreeMap<String, Vec<RemoteEntity>>;

/// Remote backed by a JSON export of the workspace
///
/// The file is read lazily on the first lookup, so commands that never touch
/// the remote (alias listing, removal) work without it.
#[derive(Debug)]
pub struct SnapshotRemote {
    path: PathBuf,
    document: OnceCell<Result<SnapshotDocument, String>>,
}

impl SnapshotRemote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: OnceCell::new(),
        }
    }

    /// Build directly from entities (no file)
    pub fn from_entities(entities: impl IntoIterator<Item = (EntityKind, RemoteEntity)>) -> Self {
        let mut document = SnapshotDocument::new();
        for (kind, entity) in entities {
            document
                .entry(kind.document_key().to_string())
                .or_default()
                .push(entity);
        }
        let cell = OnceCell::new();
        let _ = cell.set(Ok(document));
        Self {
            path: PathBuf::new(),
            document: cell,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document(&self) -> Result<&SnapshotDocument, RemoteError> {
        let loaded = self.document.get_or_init(|| {
            tracing::debug!(path = %self.path.display(), "loading remote snapshot");
            read_json::<SnapshotDocument>(&self.path).map_err(|failure| match failure {
                ReadFailure::Missing(path) => format!(
                    "no remote snapshot at {} (set remote_snapshot or LINCTL_REMOTE_SNAPSHOT)",
                    path.display()
                ),
                other => other.to_string(),
            })
        });
        loaded
            .as_ref()
            .map_err(|e| RemoteError::Unavailable(e.clone()))
    }

    fn entities(&self, kind: EntityKind) -> Result<&[RemoteEntity], RemoteError> {
        Ok(self
            .document()?
            .get(kind.document_key())
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }
}

impl Remote for SnapshotRemote {
    fn fetch_all(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
    ) -> Result<Vec<RemoteEntity>, RemoteError> {
        Ok(self
            .entities(kind)?
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn fetch_by_id(&self, kind: EntityKind, id: &str) -> Result<Option<RemoteEntity>, RemoteError> {
        Ok(self.entities(kind)?.iter().find(|e| e.id == id).cloned())
    }

    fn find_by_exact_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<RemoteEntity>, RemoteError> {
        Ok(self
            .entities(kind)?
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .cloned())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test double that counts remote calls

    use super::*;
    use std::cell::Cell;

    pub(crate) struct CountingRemote {
        inner: SnapshotRemote,
        pub(crate) fetch_all_calls: Cell<usize>,
        pub(crate) lookups: Cell<usize>,
    }

    impl CountingRemote {
        pub(crate) fn new(entities: Vec<(EntityKind, RemoteEntity)>) -> Self {
            Self {
                inner: SnapshotRemote::from_entities(entities),
                fetch_all_calls: Cell::new(0),
                lookups: Cell::new(0),
            }
        }
    }

    impl Remote for CountingRemote {
        fn fetch_all(
            &self,
            kind: EntityKind,
            filter: &EntityFilter,
        ) -> Result<Vec<RemoteEntity>, RemoteError> {
            self.fetch_all_calls.set(self.fetch_all_calls.get() + 1);
            self.inner.fetch_all(kind, filter)
        }

        fn fetch_by_id(
            &self,
            kind: EntityKind,
            id: &str,
        ) -> Result<Option<RemoteEntity>, RemoteError> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.fetch_by_id(kind, id)
        }

        fn find_by_exact_name(
            &self,
            kind: EntityKind,
            name: &str,
        ) -> Result<Option<RemoteEntity>, RemoteError> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.find_by_exact_name(kind, name)
        }
    }
}
