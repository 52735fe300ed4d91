//! `linctl cache` command - Inspect and clear the entity cache
//!
//! Entity lists live in memory for one command; with `persistent_cache`
//! enabled they are also written to `<global dir>/cache/entities.json` and
//! reused by later invocations until their TTL runs out.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::utils::{hint, CommandContext};
use crate::cli::helpers::format_age;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::CacheSettings;
use crate::core::identity::EntityKind;

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache settings and per-kind statistics
    Status,

    /// Clear the cache (one kind, or everything)
    Clear {
        /// Only this kind
        kind: Option<EntityKind>,
    },

    /// Drop expired entries from the persistent cache
    Prune,
}

pub fn run(cmd: CacheCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = CommandContext::open(global)?;
    match cmd {
        CacheCommands::Status => run_status(&ctx, global),
        CacheCommands::Clear { kind } => run_clear(&ctx, kind, global),
        CacheCommands::Prune => run_prune(&ctx, global),
    }
}

fn run_status(ctx: &CommandContext, global: &GlobalOpts) -> Result<()> {
    let cache = ctx.cache();
    let stats = cache.stats();
    let names = ctx.project_names();

    if global.format == OutputFormat::Json {
        let kinds: serde_json::Map<String, serde_json::Value> = stats
            .entries
            .iter()
            .map(|(kind, s)| {
                (
                    kind.to_string(),
                    serde_json::json!({
                        "cached": s.cached,
                        "count": s.count,
                        "age_seconds": s.age.map(|a| a.num_seconds()),
                        "tier": s.tier,
                    }),
                )
            })
            .collect();
        let value = serde_json::json!({
            "ttl_minutes": ctx.settings.ttl().num_minutes(),
            "memory": ctx.settings.memory_enabled(),
            "persistent": ctx.settings.persistent_enabled(),
            "path": cache.persistent_tier().path().display().to_string(),
            "project_names": names.len(),
            "kinds": kinds,
        });
        println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
        return Ok(());
    }

    let on_off = |enabled: bool| {
        if enabled {
            style("on").green()
        } else {
            style("off").dim()
        }
    };

    println!("{}", style("Cache Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!("  TTL:             {} min", style(ctx.settings.ttl().num_minutes()).cyan());
    println!("  Memory tier:     {}", on_off(ctx.settings.memory_enabled()));
    println!("  Persistent tier: {}", on_off(ctx.settings.persistent_enabled()));
    println!(
        "  Location:        {}",
        cache.persistent_tier().path().display()
    );
    println!("  Project names:   {}", style(names.len()).cyan());

    let held: Vec<_> = stats.entries.iter().filter(|(_, s)| s.tier.is_some()).collect();
    if held.is_empty() {
        println!();
        hint(global, "No entity lists cached");
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["KIND", "COUNT", "AGE", "TIER", "STATE"]);
    for (kind, s) in held {
        builder.push_record([
            kind.to_string(),
            s.count.to_string(),
            s.age.map(format_age).unwrap_or_default(),
            s.tier.map(|t| t.to_string()).unwrap_or_default(),
            if s.cached { "fresh" } else { "expired" }.to_string(),
        ]);
    }
    println!();
    println!("{}", builder.build().with(Style::blank()));
    Ok(())
}

fn run_clear(ctx: &CommandContext, kind: Option<EntityKind>, global: &GlobalOpts) -> Result<()> {
    let cache = ctx.cache();
    match kind {
        Some(kind) => cache.clear_entity(kind),
        None => cache.clear(),
    }

    if kind.is_none() || kind == Some(EntityKind::Project) {
        ctx.project_names()
            .clear()
            .map_err(|e| miette::miette!("Failed to remove project name cache: {}", e))?;
    }

    if !global.quiet {
        match kind {
            Some(kind) => println!("{} Cleared cached {}s", style("✓").green(), kind.label()),
            None => println!("{} Cache cleared", style("✓").green()),
        }
    }
    Ok(())
}

fn run_prune(ctx: &CommandContext, global: &GlobalOpts) -> Result<()> {
    let evicted = ctx.cache().invalidate_if_expired();
    if global.quiet {
        return Ok(());
    }
    if evicted.is_empty() {
        println!("{} Nothing expired", style("✓").green());
    } else {
        let kinds: Vec<String> = evicted.iter().map(ToString::to_string).collect();
        println!(
            "{} Pruned {} expired list(s): {}",
            style("✓").green(),
            evicted.len(),
            kinds.join(", ")
        );
    }
    Ok(())
}
