//! `linctl resolve` command - Turn an ID, alias or name into a canonical ID

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::utils::{team_filter, CommandContext};
use crate::cli::{GlobalOpts, OutputFormat, ScopeArgs};
use crate::core::identity::EntityKind;
use crate::core::resolve::{ResolveOptions, Resolver};
use crate::core::Scope;

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Entity kind (team, project, member, cycle, issue-label, ...)
    pub kind: EntityKind,

    /// ID, alias, name, or email (members) / number (cycles)
    pub input: String,

    /// Create an alias when a project is found by name (global unless --project)
    #[arg(long)]
    pub auto_alias: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Restrict member and cycle lookups to a team (ID, alias, key or name)
    #[arg(long = "team", value_name = "TEAM")]
    pub teams: Vec<String>,
}

pub fn run(args: ResolveArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CommandContext::open(global)?;
    let cache = ctx.cache();
    let resolver = Resolver::new(&ctx.store, &cache, ctx.project_names());

    let options = ResolveOptions {
        auto_alias: args
            .auto_alias
            .then(|| args.scope.scope().unwrap_or(Scope::Global)),
        teams: team_filter(&resolver, &args.teams)?,
    };

    let resolution = resolver
        .resolve(args.kind, &args.input, &options)
        .map_err(|e| miette::miette!("{}", e))?
        .ok_or_else(|| {
            miette::miette!(
                "No {} matches '{}' (tried ID, alias and name)",
                args.kind.label(),
                args.input
            )
        })?;

    if !global.quiet && !resolution.is_literal() {
        eprintln!(
            "{} {}",
            style("→").blue(),
            resolution.summary(args.kind, args.input.trim())
        );
    }
    if let Some(alias) = &resolution.created_alias {
        if !global.quiet {
            eprintln!(
                "{} Created {} alias {}",
                style("✓").green(),
                args.kind.label(),
                style(alias).cyan()
            );
        }
    }

    match global.format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "kind": args.kind,
                "input": args.input,
                "id": resolution.id,
                "name": resolution.name,
                "method": resolution.method.to_string(),
                "alias": resolution.alias,
                "scope": resolution.alias_scope,
                "created_alias": resolution.created_alias,
            });
            println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
        }
        _ => println!("{}", resolution.id),
    }

    Ok(())
}
