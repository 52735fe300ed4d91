//! `linctl config` command - Configuration management
//!
//! Values are layered: defaults, global config, project config, environment.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::utils::CommandContext;
use crate::cli::GlobalOpts;
use crate::core::config::{Config, NO_CACHE_ENV, SNAPSHOT_ENV, TTL_ENV};
use crate::core::project::HOME_ENV;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path(PathArgs),

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,

    /// Show only project-level config
    #[arg(long = "project-only")]
    pub project_only: bool,

    /// Show only global (user) config
    #[arg(long = "global-only")]
    pub global_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., cache_ttl_minutes, persistent_cache)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Show only project config path
    #[arg(long = "project-only")]
    pub project_only: bool,

    /// Show only global config path
    #[arg(long = "global-only")]
    pub global_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Minutes,
    Flag,
    Path,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, ValueKind, &str)] = &[
    (
        "cache_ttl_minutes",
        ValueKind::Minutes,
        "Minutes before cached entity lists are refetched (default 60)",
    ),
    (
        "project_cache_ttl_minutes",
        ValueKind::Minutes,
        "Minutes a project name lookup is remembered (default: cache_ttl_minutes)",
    ),
    (
        "entity_cache",
        ValueKind::Flag,
        "Keep entity lists in memory during a command (default true)",
    ),
    (
        "persistent_cache",
        ValueKind::Flag,
        "Persist entity lists between commands (default false)",
    ),
    (
        "session_cache",
        ValueKind::Flag,
        "Master switch for all caching (default true)",
    ),
    (
        "remote_snapshot",
        ValueKind::Path,
        "JSON snapshot answering remote lookups (default <global dir>/remote.json)",
    ),
];

fn key_kind(key: &str) -> Result<ValueKind> {
    VALID_KEYS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, kind, _)| *kind)
        .ok_or_else(|| {
            miette::miette!(
                "Unknown configuration key '{}'. Run 'linctl config keys' to list them.",
                key
            )
        })
}

fn parse_value(key: &str, kind: ValueKind, raw: &str) -> Result<serde_yml::Value> {
    match kind {
        ValueKind::Minutes => raw
            .trim()
            .parse::<u64>()
            .map(|n| serde_yml::Value::Number(n.into()))
            .map_err(|_| miette::miette!("{} expects a whole number of minutes, got '{}'", key, raw)),
        ValueKind::Flag => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(serde_yml::Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(serde_yml::Value::Bool(false)),
            _ => Err(miette::miette!("{} expects true or false, got '{}'", key, raw)),
        },
        ValueKind::Path => Ok(serde_yml::Value::String(raw.to_string())),
    }
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    if let ConfigCommands::Keys = cmd {
        return run_keys();
    }
    let ctx = CommandContext::open(global)?;
    match cmd {
        ConfigCommands::Show(args) => run_show(&ctx, args),
        ConfigCommands::Set(args) => run_set(&ctx, args),
        ConfigCommands::Unset(args) => run_unset(&ctx, args),
        ConfigCommands::Path(args) => run_path(&ctx, args),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(ctx: &CommandContext, args: ShowArgs) -> Result<()> {
    let config = ctx.settings.current();

    if let Some(key) = &args.key {
        key_kind(key)?;
        let (value, origin) = effective_value(&config, key, ctx.workspace.global_dir());
        println!("{}", value);
        if origin == Origin::Default {
            eprintln!("{}", style("(default; not set in any config file)").dim());
        }
        return Ok(());
    }

    if args.project_only && args.global_only {
        return Err(miette::miette!(
            "Cannot specify both --project-only and --global-only"
        ));
    }

    if args.project_only {
        return show_file("Project config:", &ctx.workspace.project_config_path());
    }
    if args.global_only {
        return show_file("Global config:", &ctx.workspace.global_config_path());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _, _) in VALID_KEYS {
        let (value, origin) = effective_value(&config, key, ctx.workspace.global_dir());
        print_config_value(key, &value, origin);
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!(
        "  1. Environment variables ({}, {}, {})",
        TTL_ENV, SNAPSHOT_ENV, NO_CACHE_ENV
    );
    println!("  2. Project config (.linctl/config.yaml)");
    println!(
        "  3. Global config ({})",
        ctx.workspace.global_config_path().display()
    );
    Ok(())
}

fn target_path(ctx: &CommandContext, global: bool) -> Result<PathBuf> {
    if global {
        return Ok(ctx.workspace.global_config_path());
    }
    let project = ctx.workspace.project();
    if !project.linctl_dir().is_dir() {
        return Err(miette::miette!(
            "Not in a linctl project ({}). Use --global or run 'linctl init'.",
            project.root().display()
        ));
    }
    Ok(ctx.workspace.project_config_path())
}

fn read_mapping(path: &Path) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content) {
        Ok(serde_yml::Value::Mapping(map)) => Ok(map),
        Ok(serde_yml::Value::Null) => Ok(serde_yml::Mapping::new()),
        Ok(_) => Err(miette::miette!("{} is not a YAML mapping", path.display())),
        Err(e) => Err(miette::miette!("Failed to parse {}: {}", path.display(), e)),
    }
}

fn write_mapping(path: &Path, map: serde_yml::Mapping) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&serde_yml::Value::Mapping(map)).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()
}

fn run_set(ctx: &CommandContext, args: SetArgs) -> Result<()> {
    let kind = key_kind(&args.key)?;
    let value = parse_value(&args.key, kind, &args.value)?;
    let path = target_path(ctx, args.global)?;

    let mut map = read_mapping(&path)?;
    map.insert(serde_yml::Value::String(args.key.clone()), value);
    write_mapping(&path, map)?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );
    Ok(())
}

fn run_unset(ctx: &CommandContext, args: UnsetArgs) -> Result<()> {
    key_kind(&args.key)?;
    let path = target_path(ctx, args.global)?;

    if !path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            path.display()
        ));
    }

    let mut map = read_mapping(&path)?;
    if map
        .remove(&serde_yml::Value::String(args.key.clone()))
        .is_none()
    {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }
    write_mapping(&path, map)?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );
    Ok(())
}

fn run_path(ctx: &CommandContext, args: PathArgs) -> Result<()> {
    if args.project_only && args.global_only {
        return Err(miette::miette!(
            "Cannot specify both --project-only and --global-only"
        ));
    }

    let global_path = ctx.workspace.global_config_path();
    let project_path = ctx.workspace.project_config_path();

    if args.project_only {
        println!("{}", project_path.display());
        return Ok(());
    }
    if args.global_only {
        println!("{}", global_path.display());
        return Ok(());
    }

    println!("{}", style("Configuration file paths:").bold());
    println!();
    print_path("Global:", &global_path);
    println!();
    print_path("Project:", &project_path);
    println!();
    println!(
        "  {}",
        style(format!("Set {} to relocate the global directory", HOME_ENV)).dim()
    );
    Ok(())
}

fn print_path(label: &str, path: &Path) {
    println!("  {} {}", style(label).cyan(), path.display());
    if path.exists() {
        println!("          {}", style("(exists)").green());
    } else {
        println!("          {}", style("(not created)").dim());
    }
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, _, description) in VALID_KEYS {
        println!("  {:<28} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'linctl config set <key> <value>' to set a value.").dim()
    );
    Ok(())
}

/// Where an effective value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Configured,
    Default,
}

/// The value a key takes after layering, falling back to the built-in default
fn effective_value(config: &Config, key: &str, global_dir: &Path) -> (String, Origin) {
    let (set, value) = match key {
        "cache_ttl_minutes" => (
            config.cache_ttl_minutes.is_some(),
            config.cache_ttl().num_minutes().to_string(),
        ),
        "project_cache_ttl_minutes" => (
            config.project_cache_ttl_minutes.is_some(),
            config.project_cache_ttl().num_minutes().to_string(),
        ),
        "entity_cache" => (
            config.entity_cache.is_some(),
            config.entity_cache.unwrap_or(true).to_string(),
        ),
        "persistent_cache" => (
            config.persistent_cache.is_some(),
            config.persistent_cache.unwrap_or(false).to_string(),
        ),
        "session_cache" => (
            config.session_cache.is_some(),
            config.session_cache_enabled().to_string(),
        ),
        "remote_snapshot" => (
            config.remote_snapshot.is_some(),
            config.remote_snapshot_path(global_dir).display().to_string(),
        ),
        _ => (false, String::new()),
    };
    let origin = if set { Origin::Configured } else { Origin::Default };
    (value, origin)
}

fn print_config_value(key: &str, value: &str, origin: Origin) {
    match origin {
        Origin::Configured => println!("  {}: {}", style(key).cyan(), style(value).yellow()),
        Origin::Default => println!(
            "  {}: {} {}",
            style(key).cyan(),
            value,
            style("(default)").dim()
        ),
    }
}

fn show_file(title: &str, path: &Path) -> Result<()> {
    println!("{} {}", style(title).bold(), style(path.display()).dim());
    println!();

    if path.exists() {
        let content = fs::read_to_string(path).into_diagnostic()?;
        print!("{}", content);
    } else {
        println!("{}", style("(not created)").dim());
    }
    Ok(())
}
