//! Entity kinds and canonical identifier classification
//!
//! The remote platform issues identifiers in two shapes: a hyphenated UUID, or a
//! type-prefixed token such as `team_8f2k1`. Anything else a user types is a
//! candidate alias or display name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Remote entity types that can be aliased and resolved
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Initiative,
    Team,
    Project,
    ProjectStatus,
    IssueTemplate,
    ProjectTemplate,
    Member,
    WorkflowState,
    IssueLabel,
    ProjectLabel,
    Cycle,
}

impl EntityKind {
    /// Get the command-line name of the kind (e.g. `issue-template`)
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Initiative => "initiative",
            EntityKind::Team => "team",
            EntityKind::Project => "project",
            EntityKind::ProjectStatus => "project-status",
            EntityKind::IssueTemplate => "issue-template",
            EntityKind::ProjectTemplate => "project-template",
            EntityKind::Member => "member",
            EntityKind::WorkflowState => "workflow-state",
            EntityKind::IssueLabel => "issue-label",
            EntityKind::ProjectLabel => "project-label",
            EntityKind::Cycle => "cycle",
        }
    }

    /// Key used for this kind in persisted JSON documents
    pub fn document_key(&self) -> &'static str {
        match self {
            EntityKind::Initiative => "initiatives",
            EntityKind::Team => "teams",
            EntityKind::Project => "projects",
            EntityKind::ProjectStatus => "projectStatuses",
            EntityKind::IssueTemplate => "issueTemplates",
            EntityKind::ProjectTemplate => "projectTemplates",
            EntityKind::Member => "members",
            EntityKind::WorkflowState => "workflowStates",
            EntityKind::IssueLabel => "issueLabels",
            EntityKind::ProjectLabel => "projectLabels",
            EntityKind::Cycle => "cycles",
        }
    }

    /// Prefix of the token-style canonical ID for this kind
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Initiative => "init_",
            EntityKind::Team => "team_",
            EntityKind::Project => "proj_",
            EntityKind::ProjectStatus => "pstatus_",
            EntityKind::IssueTemplate => "itpl_",
            EntityKind::ProjectTemplate => "ptpl_",
            EntityKind::Member => "user_",
            EntityKind::WorkflowState => "state_",
            EntityKind::IssueLabel => "ilabel_",
            EntityKind::ProjectLabel => "plabel_",
            EntityKind::Cycle => "cycle_",
        }
    }

    /// Human-readable label for messages ("project status", "member")
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Initiative => "initiative",
            EntityKind::Team => "team",
            EntityKind::Project => "project",
            EntityKind::ProjectStatus => "project status",
            EntityKind::IssueTemplate => "issue template",
            EntityKind::ProjectTemplate => "project template",
            EntityKind::Member => "member",
            EntityKind::WorkflowState => "workflow state",
            EntityKind::IssueLabel => "issue label",
            EntityKind::ProjectLabel => "project label",
            EntityKind::Cycle => "cycle",
        }
    }

    /// Get all entity kinds
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Initiative,
            EntityKind::Team,
            EntityKind::Project,
            EntityKind::ProjectStatus,
            EntityKind::IssueTemplate,
            EntityKind::ProjectTemplate,
            EntityKind::Member,
            EntityKind::WorkflowState,
            EntityKind::IssueLabel,
            EntityKind::ProjectLabel,
            EntityKind::Cycle,
        ]
    }

    /// Look up a kind by its persisted document key (`issueTemplates`)
    pub fn from_document_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.document_key() == key)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = KindParseError;

    /// Accepts the singular name, a plural, or the document key, in any case,
    /// with `_` or `-` separators (`issue-template`, `issue_templates`, `issueTemplates`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(kind) = Self::from_document_key(s) {
            return Ok(kind);
        }

        let normalized = s.trim().to_lowercase().replace('_', "-");
        for kind in Self::all() {
            let name = kind.as_str();
            let plural = kind.document_key().to_lowercase();
            if normalized == name
                || normalized == format!("{}s", name)
                || normalized.replace('-', "") == plural
            {
                return Ok(*kind);
            }
        }

        Err(KindParseError(s.to_string()))
    }
}

/// Error returned for an unknown entity kind name
#[derive(Debug, Error)]
#[error("unknown entity type '{0}' (valid: initiative, team, project, project-status, issue-template, project-template, member, workflow-state, issue-label, project-label, cycle)")]
pub struct KindParseError(pub String);

/// Check whether `input` is already a canonical identifier for `kind`
///
/// Pure syntax check, no I/O. A canonical identifier is either a hyphenated
/// UUID or `<prefix><alphanumeric>` where the prefix belongs to `kind`.
pub fn is_canonical_id(kind: EntityKind, input: &str) -> bool {
    is_uuid(input) || is_prefixed_id(kind, input)
}

/// Hyphenated 8-4-4-4-12 UUID
pub fn is_uuid(input: &str) -> bool {
    input.len() == 36 && Uuid::try_parse(input).is_ok()
}

fn is_prefixed_id(kind: EntityKind, input: &str) -> bool {
    match input.strip_prefix(kind.id_prefix()) {
        Some(token) => !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}
