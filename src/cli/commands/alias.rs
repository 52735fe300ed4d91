//! `linctl alias` command - Manage global and project aliases

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::utils::{hint, team_filter, CommandContext};
use crate::cli::helpers::{format_target, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat, ScopeArgs};
use crate::core::alias::{AliasError, AliasStore, Scope};
use crate::core::identity::EntityKind;
use crate::core::resolve::Resolver;
use crate::core::sync::{PreviewMark, SyncOptions, SyncPlan};

#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Create an alias (global unless --project)
    Add(AddArgs),

    /// Delete an alias
    Remove(RemoveArgs),

    /// Rename an alias, keeping its target
    Rename(RenameArgs),

    /// Point an existing alias at a different ID
    UpdateId(UpdateIdArgs),

    /// List aliases from both scopes
    List(ListArgs),

    /// Look up an alias without contacting the remote
    Get(GetArgs),

    /// Check every alias against the remote
    Validate(ValidateArgs),

    /// Generate aliases for every entity of a kind
    Sync(SyncArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Entity kind (team, project, member, ...)
    pub kind: EntityKind,

    /// Alias text (no whitespace)
    pub alias: String,

    /// Target entity ID
    pub id: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Do not confirm the target exists
    #[arg(long)]
    pub skip_validation: bool,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    pub kind: EntityKind,

    pub alias: String,

    // Default: the scope the alias currently resolves from
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(clap::Args, Debug)]
pub struct RenameArgs {
    pub kind: EntityKind,

    /// Current alias
    pub old: String,

    /// New alias
    pub new: String,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(clap::Args, Debug)]
pub struct UpdateIdArgs {
    pub kind: EntityKind,

    pub alias: String,

    /// New target entity ID
    pub id: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Do not confirm the target exists
    #[arg(long)]
    pub skip_validation: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only this kind
    pub kind: Option<EntityKind>,
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    pub kind: EntityKind,

    /// Alias or ID
    pub input: String,
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Offer to remove broken aliases
    #[arg(long)]
    pub fix: bool,

    /// Remove without asking (with --fix)
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Entity kind to generate aliases for
    pub kind: EntityKind,

    // Without a scope only the preview is shown
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Show what would be written without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite aliases that point elsewhere
    #[arg(long)]
    pub force: bool,

    /// Only entities of this team (ID, alias, key or name)
    #[arg(long = "team", value_name = "TEAM")]
    pub teams: Vec<String>,
}

pub fn run(cmd: AliasCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = CommandContext::open(global)?;
    match cmd {
        AliasCommands::Add(args) => run_add(&ctx, args, global),
        AliasCommands::Remove(args) => run_remove(&ctx, args, global),
        AliasCommands::Rename(args) => run_rename(&ctx, args, global),
        AliasCommands::UpdateId(args) => run_update_id(&ctx, args, global),
        AliasCommands::List(args) => run_list(&ctx, args, global),
        AliasCommands::Get(args) => run_get(&ctx, args, global),
        AliasCommands::Validate(args) => run_validate(&ctx, args, global),
        AliasCommands::Sync(args) => run_sync(&ctx, args, global),
    }
}

fn run_add(ctx: &CommandContext, args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let scope = args.scope.scope().unwrap_or(Scope::Global);
    let result = ctx.store.add(
        &ctx.remote,
        args.kind,
        &args.alias,
        &args.id,
        scope,
        args.skip_validation,
    );

    match result {
        Ok(()) => {
            if !global.quiet {
                println!(
                    "{} Added {} alias {} {} {} ({})",
                    style("✓").green(),
                    args.kind.label(),
                    style(&args.alias).cyan(),
                    style("→").dim(),
                    style(&args.id).yellow(),
                    scope
                );
            }
            Ok(())
        }
        Err(e @ AliasError::AlreadyPointsHere { .. }) => {
            if !global.quiet {
                println!("{} {}", style("!").yellow(), e);
            }
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

/// Explicit scope, or the scope the alias currently resolves from
fn scope_for(store: &AliasStore, kind: EntityKind, alias: &str, scope: &ScopeArgs) -> Result<Scope> {
    if let Some(scope) = scope.scope() {
        return Ok(scope);
    }
    store
        .lookup(kind, alias)
        .map(|(_, location)| location.scope)
        .ok_or_else(|| miette::miette!("No {} alias '{}' in either scope", kind.label(), alias))
}

fn run_remove(ctx: &CommandContext, args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let scope = scope_for(&ctx.store, args.kind, &args.alias, &args.scope)?;
    let previous = ctx
        .store
        .remove(args.kind, &args.alias, scope)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Removed {} alias {} (was {}) from {} scope",
            style("✓").green(),
            args.kind.label(),
            style(&args.alias).cyan(),
            style(&previous).dim(),
            scope
        );
    }

    // A shadowed global entry takes over once the project entry is gone
    if scope == Scope::Project {
        if let Some((id, _)) = ctx.store.lookup(args.kind, &args.alias) {
            hint(global, format!("'{}' now resolves to {} from global scope", args.alias, id));
        }
    }
    Ok(())
}

fn run_rename(ctx: &CommandContext, args: RenameArgs, global: &GlobalOpts) -> Result<()> {
    let scope = scope_for(&ctx.store, args.kind, &args.old, &args.scope)?;
    let id = ctx
        .store
        .rename(args.kind, &args.old, &args.new, scope)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Renamed {} alias {} {} {} ({}, {} scope)",
            style("✓").green(),
            args.kind.label(),
            style(&args.old).dim(),
            style("→").dim(),
            style(&args.new).cyan(),
            id,
            scope
        );
    }
    Ok(())
}

fn run_update_id(ctx: &CommandContext, args: UpdateIdArgs, global: &GlobalOpts) -> Result<()> {
    let scope = scope_for(&ctx.store, args.kind, &args.alias, &args.scope)?;
    let previous = ctx
        .store
        .update_target_id(
            &ctx.remote,
            args.kind,
            &args.alias,
            &args.id,
            scope,
            args.skip_validation,
        )
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Updated {} alias {}: {} {} {} ({} scope)",
            style("✓").green(),
            args.kind.label(),
            style(&args.alias).cyan(),
            style(&previous).dim(),
            style("→").dim(),
            style(&args.id).yellow(),
            scope
        );
    }
    Ok(())
}

fn run_list(ctx: &CommandContext, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let view = ctx.store.load();
    let kinds: Vec<EntityKind> = match args.kind {
        Some(kind) => vec![kind],
        None => EntityKind::all().to_vec(),
    };

    let mut rows = Vec::new();
    for kind in kinds {
        for (alias, id) in view.entries(kind) {
            let location = view.location(kind, alias);
            rows.push((kind, alias, id, location));
        }
    }

    match global.format {
        OutputFormat::Json => {
            let values: Vec<_> = rows
                .iter()
                .map(|(kind, alias, id, location)| {
                    serde_json::json!({
                        "kind": kind,
                        "alias": alias,
                        "id": id,
                        "scope": location.map(|l| l.scope),
                        "path": location.map(|l| l.path.display().to_string()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&values).into_diagnostic()?);
        }
        OutputFormat::Tsv => {
            for (kind, alias, id, location) in &rows {
                let scope = location.map(|l| l.scope.to_string()).unwrap_or_default();
                println!("{}\t{}\t{}\t{}", kind, alias, id, scope);
            }
        }
        OutputFormat::Auto | OutputFormat::Table => {
            if rows.is_empty() {
                println!("No aliases defined");
                hint(global, "Add one with: linctl alias add <kind> <alias> <id>");
                return Ok(());
            }

            let mut builder = Builder::default();
            builder.push_record(["KIND", "ALIAS", "ID", "SCOPE"]);
            for (kind, alias, id, location) in &rows {
                let scope = location.map(|l| l.scope.to_string()).unwrap_or_default();
                builder.push_record([
                    kind.to_string(),
                    alias.to_string(),
                    truncate_str(id, 40),
                    scope,
                ]);
            }
            println!("{}", builder.build().with(Style::blank()));

            if !global.quiet {
                println!();
                println!("{} alias(es)", style(rows.len()).cyan());
            }
        }
    }
    Ok(())
}

fn run_get(ctx: &CommandContext, args: GetArgs, global: &GlobalOpts) -> Result<()> {
    let id = ctx.store.resolve(args.kind, &args.input);
    if id != args.input {
        if let Some((_, location)) = ctx.store.lookup(args.kind, &args.input) {
            hint(
                global,
                format!("{} alias from {}", location.scope, location.path.display()),
            );
        }
    }
    println!("{}", id);
    Ok(())
}

fn run_validate(ctx: &CommandContext, args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    if !global.quiet {
        println!("{} Checking aliases...", style("→").blue());
    }
    let report = ctx.store.validate_all(&ctx.remote);

    if report.broken.is_empty() {
        println!(
            "{} All {} alias(es) point to existing entities",
            style("✓").green(),
            report.total
        );
        return Ok(());
    }

    println!(
        "{} {} of {} alias(es) are broken:",
        style("✗").red(),
        report.broken.len(),
        report.total
    );
    for broken in &report.broken {
        println!(
            "  {} {} {} {} {}",
            style(broken.kind).dim(),
            style(&broken.alias).cyan(),
            style("→").dim(),
            broken.target_id,
            style(format!(
                "({}, {}): {}",
                broken.location.scope,
                broken.location.path.display(),
                broken.error.as_deref().unwrap_or("not found")
            ))
            .dim()
        );
    }

    if !args.fix {
        hint(global, "Run with --fix to remove them");
        return Err(miette::miette!("{} broken alias(es)", report.broken.len()));
    }

    if !args.yes {
        if !console::Term::stderr().is_term() {
            return Err(miette::miette!("Refusing to remove aliases without a terminal; pass --yes"));
        }
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Remove {} broken alias(es)?", report.broken.len()))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            return Err(miette::miette!("{} broken alias(es) left in place", report.broken.len()));
        }
    }

    let mut removed = 0;
    for broken in &report.broken {
        match ctx.store.remove(broken.kind, &broken.alias, broken.location.scope) {
            Ok(_) => removed += 1,
            Err(e) => eprintln!("{} {}", style("!").yellow(), e),
        }
    }
    println!("{} Removed {} broken alias(es)", style("✓").green(), removed);
    Ok(())
}

fn run_sync(ctx: &CommandContext, args: SyncArgs, global: &GlobalOpts) -> Result<()> {
    let options = SyncOptions {
        scope: args.scope.scope(),
        dry_run: args.dry_run,
        force: args.force,
    };

    let cache = ctx.cache();
    let resolver = Resolver::new(&ctx.store, &cache, ctx.project_names());
    let teams = team_filter(&resolver, &args.teams)?;
    let entities = cache
        .get(args.kind, &teams)
        .map_err(|e| miette::miette!("{}", e))?;
    if entities.is_empty() {
        println!("No {}s found", args.kind.label());
        return Ok(());
    }

    let plan = SyncPlan::build(args.kind, &entities, &ctx.store.load());
    print_preview(&plan, options.force);

    if !options.writes() {
        if options.scope.is_none() {
            hint(global, "Preview only; pass --global or --project to write aliases");
        } else {
            hint(global, "Dry run; nothing written");
        }
        return Ok(());
    }

    let Some(scope) = options.scope else {
        return Ok(());
    };
    let summary = plan.apply(&ctx.store, &ctx.remote, scope, options.force);

    println!();
    println!(
        "{} {} created, {} updated, {} unchanged, {} skipped, {} failed ({} scope)",
        style("✓").green(),
        style(summary.created).green(),
        style(summary.updated).yellow(),
        summary.unchanged,
        summary.skipped,
        style(summary.failed).red(),
        scope
    );
    for (slug, reason) in &summary.failures {
        eprintln!("  {} {}: {}", style("✗").red(), slug, reason);
    }

    if summary.failed > 0 {
        return Err(miette::miette!("{} alias(es) could not be written", summary.failed));
    }
    Ok(())
}

fn print_preview(plan: &SyncPlan, force: bool) {
    for candidate in &plan.candidates {
        let mark = candidate.mark(force);
        let mark_text = match mark {
            PreviewMark::Ready => style(mark.to_string()).green(),
            PreviewMark::Duplicate => style(mark.to_string()).red(),
            PreviewMark::Conflict => style(mark.to_string()).yellow(),
            PreviewMark::Overwrite => style(mark.to_string()).magenta(),
        };
        let note = match (&candidate.existing_target, candidate.already_synced) {
            (_, true) => " (exists)".to_string(),
            (Some(existing), false) if candidate.is_conflict => {
                format!(" (currently {})", existing)
            }
            _ => String::new(),
        };
        println!(
            "  {:<10} {} {} {}{}",
            mark_text,
            style(&candidate.slug).cyan(),
            style("→").dim(),
            format_target(&candidate.target_id, Some(&candidate.display_name)),
            style(note).dim()
        );
    }
    for name in &plan.unusable {
        println!(
            "  {:<10} {}",
            style("SKIPPED").dim(),
            style(format!("'{}' has no usable alias", name)).dim()
        );
    }
    println!();
    println!(
        "{} candidate(s), {} duplicate(s), {} conflict(s)",
        plan.candidates.len(),
        plan.duplicates(),
        plan.conflicts()
    );
}
