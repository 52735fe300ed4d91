//! Shared utilities for CLI commands

use console::style;
use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::alias::AliasStore;
use crate::core::identity::EntityKind;
use crate::core::cache::{EntityCache, PersistentTier};
use crate::core::config::LiveConfig;
use crate::core::project::Workspace;
use crate::core::remote::{EntityFilter, SnapshotRemote};
use crate::core::resolve::{ProjectNameCache, Resolver};

/// Everything a command needs, built once per invocation
pub struct CommandContext {
    pub workspace: Workspace,
    pub settings: LiveConfig,
    pub remote: SnapshotRemote,
    pub store: AliasStore,
}

impl CommandContext {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let workspace =
            Workspace::discover(global.root.as_deref()).map_err(|e| miette::miette!("{}", e))?;
        let settings = workspace.live_config();
        let snapshot = settings
            .current()
            .remote_snapshot_path(workspace.global_dir());
        tracing::debug!(
            global = %workspace.global_dir().display(),
            project = %workspace.project().root().display(),
            snapshot = %snapshot.display(),
            "workspace"
        );

        Ok(Self {
            remote: SnapshotRemote::new(snapshot),
            store: AliasStore::for_workspace(&workspace),
            settings,
            workspace,
        })
    }

    /// A fresh entity cache bound to this context's remote and settings
    pub fn cache(&self) -> EntityCache<'_> {
        EntityCache::new(
            &self.remote,
            &self.settings,
            PersistentTier::new(self.workspace.entity_cache_path()),
        )
    }

    pub fn project_names(&self) -> ProjectNameCache {
        ProjectNameCache::new(self.workspace.project_name_cache_path())
    }
}

/// Team filter from repeated `--team` flags, each an ID, alias, key or name
pub fn team_filter(resolver: &Resolver<'_>, teams: &[String]) -> Result<EntityFilter> {
    let mut team_ids = Vec::with_capacity(teams.len());
    for team in teams {
        let found = resolver
            .resolve_generic(EntityKind::Team, team)
            .map_err(|e| miette::miette!("{}", e))?
            .ok_or_else(|| miette::miette!("No team matches '{}'", team))?;
        team_ids.push(found.id);
    }
    Ok(EntityFilter::teams(team_ids))
}

/// Print a dimmed hint unless quiet
pub fn hint(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        eprintln!("{}", style(message).dim());
    }
}
