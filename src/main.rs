use clap::Parser;
use miette::Result;
use linctl::cli::{Cli, Commands};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "LINCTL_LOG";

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(global.verbose);

    match cli.command {
        Commands::Init(args) => linctl::cli::commands::init::run(args),
        Commands::Alias(cmd) => linctl::cli::commands::alias::run(cmd, &global),
        Commands::Resolve(args) => linctl::cli::commands::resolve::run(args, &global),
        Commands::Cache(cmd) => linctl::cli::commands::cache::run(cmd, &global),
        Commands::Config(cmd) => linctl::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => linctl::cli::commands::completions::run(args),
    }
}

/// Diagnostics go to stderr; stdout stays clean for piping
fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("linctl=debug,warn")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
