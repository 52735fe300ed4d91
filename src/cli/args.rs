//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    alias::AliasCommands, cache::CacheCommands, completions::CompletionsArgs,
    config::ConfigCommands, init::InitArgs, resolve::ResolveArgs,
};
use crate::core::Scope;

#[derive(Parser)]
#[command(name = "linctl")]
#[command(author, version, about = "Short names for issue-tracker entities")]
#[command(long_about = "Refer to teams, projects, members, cycles and other issue-tracker entities by \
short aliases instead of opaque IDs, with name lookups as a fallback.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .linctl/)
    #[arg(long, short = 'C', global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a linctl project in the current directory
    Init(InitArgs),

    /// Manage aliases
    #[command(subcommand)]
    Alias(AliasCommands),

    /// Resolve an ID, alias or name to a canonical ID
    Resolve(ResolveArgs),

    /// Inspect and clear the entity cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table on a terminal
    #[default]
    Auto,
    /// Aligned table
    Table,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
}

/// Scope selection shared by alias-writing commands
#[derive(clap::Args, Clone, Copy, Debug, Default)]
#[group(multiple = false)]
pub struct ScopeArgs {
    /// Use the global (user-wide) alias file
    #[arg(long, short = 'g')]
    pub global: bool,

    /// Use the project alias file (.linctl/aliases.json)
    #[arg(long, short = 'p')]
    pub project: bool,
}

impl ScopeArgs {
    pub fn scope(&self) -> Option<Scope> {
        if self.global {
            Some(Scope::Global)
        } else if self.project {
            Some(Scope::Project)
        } else {
            None
        }
    }
}
