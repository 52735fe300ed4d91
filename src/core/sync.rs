//! Batch alias synchronization
//!
//! Derives one alias slug per remote entity, flags slugs that collide within
//! the batch or with existing aliases, and writes the clean ones.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::core::alias::{AliasStore, ResolvedAliasView, Scope};
use crate::core::identity::{is_canonical_id, EntityKind};
use crate::core::remote::{Remote, RemoteEntity};

/// Turn an entity name into an alias slug
///
/// `"API Platform (v2)"` becomes `"api-platform-v2"`. May return an empty string.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    kept.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// One proposed alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCandidate {
    pub slug: String,
    pub target_id: String,
    pub display_name: String,
    /// Another entity in the batch produced the same slug
    pub is_duplicate: bool,
    /// The slug already points at a different ID
    pub is_conflict: bool,
    pub existing_target: Option<String>,
    /// The slug already points at this ID
    pub already_synced: bool,
}

/// Status shown next to each candidate in the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMark {
    Ready,
    Duplicate,
    Conflict,
    Overwrite,
}

impl fmt::Display for PreviewMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewMark::Ready => write!(f, "✓"),
            PreviewMark::Duplicate => write!(f, "DUPLICATE"),
            PreviewMark::Conflict => write!(f, "CONFLICT"),
            PreviewMark::Overwrite => write!(f, "OVERWRITE"),
        }
    }
}

impl SyncCandidate {
    pub fn mark(&self, force: bool) -> PreviewMark {
        if self.is_duplicate {
            PreviewMark::Duplicate
        } else if self.is_conflict && force {
            PreviewMark::Overwrite
        } else if self.is_conflict {
            PreviewMark::Conflict
        } else {
            PreviewMark::Ready
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Target scope; `None` only previews
    pub scope: Option<Scope>,
    pub dry_run: bool,
    /// Overwrite conflicting aliases
    pub force: bool,
}

impl SyncOptions {
    pub fn writes(&self) -> bool {
        self.scope.is_some() && !self.dry_run
    }
}

/// Counts reported after a sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// `(slug, reason)` for every failed write
    pub failures: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub kind: EntityKind,
    pub candidates: Vec<SyncCandidate>,
    /// Names whose slug is empty or shaped like an entity ID
    pub unusable: Vec<String>,
}

impl SyncPlan {
    pub fn build(kind: EntityKind, entities: &[RemoteEntity], view: &ResolvedAliasView) -> Self {
        let mut unusable = Vec::new();
        let mut slugged: Vec<(String, &RemoteEntity)> = Vec::new();
        let mut ids_by_slug: HashMap<String, BTreeSet<&str>> = HashMap::new();

        for entity in entities {
            let slug = slugify(&entity.name);
            if slug.is_empty() || is_canonical_id(kind, &slug) {
                tracing::warn!(%kind, name = %entity.name, "name yields no usable alias, skipping");
                unusable.push(entity.name.clone());
                continue;
            }
            let ids = ids_by_slug.entry(slug.clone()).or_default();
            // The same entity listed twice is not a duplicate of itself
            if ids.insert(entity.id.as_str()) {
                slugged.push((slug, entity));
            }
        }

        let candidates = slugged
            .into_iter()
            .map(|(slug, entity)| {
                let is_duplicate = ids_by_slug.get(&slug).is_some_and(|ids| ids.len() > 1);
                let existing = view.get(kind, &slug);
                SyncCandidate {
                    is_duplicate,
                    is_conflict: existing.is_some_and(|id| id != entity.id),
                    already_synced: existing == Some(entity.id.as_str()),
                    existing_target: existing.map(str::to_string),
                    target_id: entity.id.clone(),
                    display_name: entity.name.clone(),
                    slug,
                }
            })
            .collect();

        Self {
            kind,
            candidates,
            unusable,
        }
    }

    pub fn duplicates(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_duplicate).count()
    }

    pub fn conflicts(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.is_conflict && !c.is_duplicate)
            .count()
    }

    /// Write the plan into `scope`
    ///
    /// Targets are not re-validated; they came from the remote listing.
    pub fn apply(
        &self,
        store: &AliasStore,
        remote: &dyn Remote,
        scope: Scope,
        force: bool,
    ) -> SyncSummary {
        let mut summary = SyncSummary {
            skipped: self.unusable.len(),
            ..Default::default()
        };

        for candidate in &self.candidates {
            if candidate.is_duplicate || (candidate.is_conflict && !force) {
                summary.skipped += 1;
                continue;
            }
            if candidate.already_synced {
                summary.unchanged += 1;
                continue;
            }

            let slug = candidate.slug.as_str();
            let id = candidate.target_id.as_str();
            let in_target_scope = store.document(scope).map(self.kind).contains_key(slug);

            let overwrite = candidate.is_conflict && in_target_scope;
            let outcome = if overwrite {
                store
                    .update_target_id(remote, self.kind, slug, id, scope, true)
                    .map(|_| ())
            } else {
                store.add(remote, self.kind, slug, id, scope, true)
            };

            match outcome {
                Ok(()) if overwrite => summary.updated += 1,
                Ok(()) => summary.created += 1,
                Err(e) => {
                    tracing::warn!(slug, "alias write failed: {}", e);
                    summary.failed += 1;
                    summary.failures.push((slug.to_string(), e.to_string()));
                }
            }
        }

        summary
    }
}
