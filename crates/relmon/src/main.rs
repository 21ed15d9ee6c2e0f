use clap::builder::styling::{AnsiColor, Styles};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use relmon::commands::{self, EXIT_FAILURE, EXIT_INTERRUPTED, RunContext};
use relmon::config::Config;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relmon")]
#[command(version)]
#[command(about = "Match distribution packages to release-monitoring projects")]
#[command(
    long_about = "Reads `project package homepage [source]` records on stdin and matches \
                  them to projects on a release tracking service, or creates the projects."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log progress
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log everything, including each URL compared
    #[arg(long, global = true)]
    debug: bool,

    /// Print per-record outcomes as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (default: ~/.config/relmon/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add packages to the projects they match
    Add(commands::add::AddArgs),

    /// Print the projects records match, changing nothing
    Find(commands::find::FindArgs),

    /// Create projects for records on supported hosting sites
    Create(commands::create::CreateArgs),

    /// Convert `rpm -qi` output on stdin to records
    ParseRpm(commands::parse_rpm::ParseRpmArgs),
}

const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().bold())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::Cyan.on_default().bold())
    .placeholder(AnsiColor::Cyan.on_default());

/// Log to stderr. `RUST_LOG` overrides the level chosen by flags.
fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Interrupt flag. A second interrupt exits at once.
fn install_interrupt_handler() -> Arc<AtomicBool> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    let installed = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(EXIT_INTERRUPTED);
        }
    });
    if let Err(err) = installed {
        warn!(error = %err, "could not install interrupt handler");
    }
    cancelled
}

/// Reset SIGPIPE to default behavior so piping to `head` etc. doesn't panic.
#[cfg(unix)]
fn reset_sigpipe() {
    // SAFETY: only changes the signal disposition back to the POSIX default.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn reset_sigpipe() {}

fn main() {
    reset_sigpipe();

    let matches = Cli::command().styles(HELP_STYLES).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    init_logging(cli.verbose, cli.debug);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{}", err);
            std::process::exit(EXIT_FAILURE);
        }
    };
    let ctx = RunContext::new(config, cli.json, install_interrupt_handler());

    let exit_code = match cli.command {
        Commands::Add(args) => commands::add::run(args, &ctx),
        Commands::Find(args) => commands::find::run(args, &ctx),
        Commands::Create(args) => commands::create::run(args, &ctx),
        Commands::ParseRpm(args) => commands::parse_rpm::run(args, &ctx),
    };

    std::process::exit(exit_code);
}
