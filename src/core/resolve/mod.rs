//! Resolution engine: turn an ID, alias or name into a canonical ID
//!
//! Every resolver is an ordered list of [`Strategy`] values run through
//! [`first_success`]: the first strategy returning `Some` wins, later ones are
//! never attempted, and an error aborts the chain. Domains differ only in the
//! strategies they list:
//!
//! | kind      | chain                                                        |
//! |-----------|--------------------------------------------------------------|
//! | generic   | id, alias, cached name                                       |
//! | project   | id (confirmed), alias (confirmed), name cache, remote name   |
//! | member    | id, alias (confirmed), email, cached name (disambiguated)     |
//! | cycle     | id, alias, number, cached name                               |

mod cycle;
mod member;
mod project;

pub use project::ProjectNameCache;

use std::fmt;
use thiserror::Error;

use crate::core::alias::{AliasStore, Scope};
use crate::core::cache::EntityCache;
use crate::core::identity::{is_canonical_id, EntityKind};
use crate::core::remote::{EntityFilter, Remote, RemoteEntity, RemoteError};

/// How an input was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    Id,
    Alias,
    Cache,
    Name,
    Email,
    Number,
}

impl fmt::Display for ResolvedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedBy::Id => write!(f, "id"),
            ResolvedBy::Alias => write!(f, "alias"),
            ResolvedBy::Cache => write!(f, "cache"),
            ResolvedBy::Name => write!(f, "name"),
            ResolvedBy::Email => write!(f, "email"),
            ResolvedBy::Number => write!(f, "number"),
        }
    }
}

/// A successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: String,
    /// Display name, when the resolving step learned it
    pub name: Option<String>,
    pub method: ResolvedBy,
    /// Alias text used, when resolved through an alias
    pub alias: Option<String>,
    pub alias_scope: Option<Scope>,
    /// Alias created as a side effect (project auto-alias)
    pub created_alias: Option<String>,
}

impl Resolution {
    pub fn new(id: impl Into<String>, method: ResolvedBy) -> Self {
        Self {
            id: id.into(),
            name: None,
            method,
            alias: None,
            alias_scope: None,
            created_alias: None,
        }
    }

    fn from_entity(entity: RemoteEntity, method: ResolvedBy) -> Self {
        Self {
            name: Some(entity.name),
            ..Self::new(entity.id, method)
        }
    }

    fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// The input was already canonical; nothing to report
    pub fn is_literal(&self) -> bool {
        self.method == ResolvedBy::Id
    }

    /// One-line "resolved X to Y" confirmation for the user
    pub fn summary(&self, kind: EntityKind, input: &str) -> String {
        let target = match &self.name {
            Some(name) => format!("{} ({})", name, self.id),
            None => self.id.clone(),
        };
        match (self.method, &self.alias_scope) {
            (ResolvedBy::Alias, Some(scope)) => format!(
                "Resolved {} alias '{}' ({}) to {}",
                kind.label(),
                input,
                scope,
                target
            ),
            (ResolvedBy::Id, _) => format!("Using {} {}", kind.label(), target),
            (method, _) => format!(
                "Resolved {} '{}' by {} to {}",
                kind.label(),
                input,
                method,
                target
            ),
        }
    }
}

/// One candidate listed when an input is ambiguous
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub detail: Option<String>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} <{}> ({})", self.name, detail, self.id),
            None => write!(f, "{} ({})", self.name, self.id),
        }
    }
}

/// Errors that abort a resolution chain
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("'{input}' matches {} {}s; use a more specific identifier:\n{}", .matches.len(), .kind.label(), list_candidates(.matches))]
    DisambiguationRequired {
        kind: EntityKind,
        input: String,
        matches: Vec<Candidate>,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

fn list_candidates(matches: &[Candidate]) -> String {
    matches
        .iter()
        .map(|c| format!("  - {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One named step of a resolution chain
pub struct Strategy<'s, T> {
    name: &'static str,
    attempt: Box<dyn FnOnce() -> Result<Option<T>, ResolveError> + 's>,
}

impl<'s, T> Strategy<'s, T> {
    pub fn new(
        name: &'static str,
        attempt: impl FnOnce() -> Result<Option<T>, ResolveError> + 's,
    ) -> Self {
        Self {
            name,
            attempt: Box::new(attempt),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Run strategies in order; the first `Some` wins
pub fn first_success<T>(strategies: Vec<Strategy<'_, T>>) -> Result<Option<T>, ResolveError> {
    for strategy in strategies {
        let name = strategy.name;
        if let Some(found) = (strategy.attempt)()? {
            tracing::debug!(strategy = name, "resolved");
            return Ok(Some(found));
        }
        tracing::trace!(strategy = name, "no match");
    }
    Ok(None)
}

/// Extra inputs some resolvers accept
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Create an alias in this scope when a project is found by name
    pub auto_alias: Option<Scope>,
    /// Restrict member and cycle lookups to these teams
    pub teams: EntityFilter,
}

/// Resolvers sharing one alias store and one entity cache
pub struct Resolver<'a> {
    store: &'a AliasStore,
    cache: &'a EntityCache<'a>,
    project_names: ProjectNameCache,
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a AliasStore,
        cache: &'a EntityCache<'a>,
        project_names: ProjectNameCache,
    ) -> Self {
        Self {
            store,
            cache,
            project_names,
        }
    }

    fn remote(&self) -> &'a dyn Remote {
        self.cache.remote()
    }

    /// Resolve with the chain appropriate for `kind`
    pub fn resolve(
        &self,
        kind: EntityKind,
        input: &str,
        options: &ResolveOptions,
    ) -> Result<Option<Resolution>, ResolveError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }
        tracing::debug!(%kind, input, "resolving");
        match kind {
            EntityKind::Project => self.resolve_project(input, options.auto_alias),
            EntityKind::Member => self.resolve_member(input, &options.teams),
            EntityKind::Cycle => self.resolve_cycle(input, &options.teams),
            _ => self.resolve_generic(kind, input),
        }
    }

    /// Chain for kinds without special needs: id, alias, cached name
    ///
    /// Aliases are trusted without a remote round-trip here.
    pub fn resolve_generic(
        &self,
        kind: EntityKind,
        input: &str,
    ) -> Result<Option<Resolution>, ResolveError> {
        first_success(vec![
            Strategy::new("id", || Ok(self.literal(kind, input))),
            Strategy::new("alias", || Ok(self.alias(kind, input))),
            Strategy::new("name", || self.cached_name(kind, input, &EntityFilter::none())),
        ])
    }

    fn literal(&self, kind: EntityKind, input: &str) -> Option<Resolution> {
        is_canonical_id(kind, input).then(|| Resolution::new(input, ResolvedBy::Id))
    }

    fn alias(&self, kind: EntityKind, input: &str) -> Option<Resolution> {
        let (id, location) = self.store.lookup(kind, input)?;
        Some(Resolution {
            alias: Some(input.to_string()),
            alias_scope: Some(location.scope),
            ..Resolution::new(id, ResolvedBy::Alias)
        })
    }

    /// Alias lookup followed by a live existence check
    ///
    /// A stale alias is reported and skipped so the chain can continue.
    fn confirmed_alias(&self, kind: EntityKind, input: &str) -> Option<Resolution> {
        let resolution = self.alias(kind, input)?;
        let existence = self.remote().confirm_exists(kind, &resolution.id);
        if existence.valid {
            Some(resolution.with_name(existence.name))
        } else {
            tracing::warn!(
                "{} alias '{}' points to {}, which no longer exists; run `linctl alias validate`",
                kind.label(),
                input,
                resolution.id
            );
            None
        }
    }

    /// Case-insensitive name match over the cached list
    ///
    /// An exact-case match wins over case-insensitive ones; otherwise more
    /// than one match is ambiguous.
    fn cached_name(
        &self,
        kind: EntityKind,
        input: &str,
        filter: &EntityFilter,
    ) -> Result<Option<Resolution>, ResolveError> {
        let mut matches = self.cache.find_all_by_name_ignore_case(kind, input, filter)?;

        if matches.is_empty() && kind == EntityKind::Team {
            if let Some(team) = self.cache.find_team_by_key(input)? {
                matches.push(team);
            }
        }

        if let Some(pos) = matches.iter().position(|e| e.name == input) {
            return Ok(Some(Resolution::from_entity(
                matches.swap_remove(pos),
                ResolvedBy::Name,
            )));
        }
        single_match(kind, input, matches, ResolvedBy::Name)
    }
}

/// Zero matches is `None`, one is a resolution, more is an error
fn single_match(
    kind: EntityKind,
    input: &str,
    mut matches: Vec<RemoteEntity>,
    method: ResolvedBy,
) -> Result<Option<Resolution>, ResolveError> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop().map(|e| Resolution::from_entity(e, method))),
        _ => Err(ResolveError::DisambiguationRequired {
            kind,
            input: input.to_string(),
            matches: matches
                .into_iter()
                .map(|e| Candidate {
                    detail: e.email.clone(),
                    id: e.id,
                    name: e.name,
                })
                .collect(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::core::cache::PersistentTier;
    use crate::core::config::Config;
    use crate::core::remote::testing::CountingRemote;
    use tempfile::{tempdir, TempDir};

    /// Temp-dir backed store, config and remote for resolver tests
    pub(crate) struct Fixture {
        pub(crate) tmp: TempDir,
        pub(crate) store: AliasStore,
        pub(crate) remote: CountingRemote,
        pub(crate) config: Config,
    }

    impl Fixture {
        pub(crate) fn new(entities: Vec<(EntityKind, RemoteEntity)>) -> Self {
            let tmp = tempdir().unwrap();
            let store = AliasStore::new(
                tmp.path().join("global/aliases.json"),
                tmp.path().join("project/.linctl/aliases.json"),
            );
            Self {
                store,
                remote: CountingRemote::new(entities),
                config: Config::default(),
                tmp,
            }
        }

        pub(crate) fn cache(&self) -> EntityCache<'_> {
            EntityCache::new(
                &self.remote,
                &self.config,
                PersistentTier::new(self.tmp.path().join("global/cache/entities.json")),
            )
        }

        pub(crate) fn name_cache(&self) -> ProjectNameCache {
            ProjectNameCache::new(self.tmp.path().join("global/cache/project-names.json"))
        }
    }
}
