#![forbid(unsafe_code)]

mod cmd;
mod identity;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "sp: schedule health analytics for construction projects",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Caller identity (skips env resolution).
    #[arg(long, global = true)]
    agent: Option<String>,

    /// Directory containing `.sitepulse/` (defaults to the current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn agent_flag(&self) -> Option<&str> {
        self.agent.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a sitepulse store",
        long_about = "Create .sitepulse/ with a default config and a migrated SQLite store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    sp init\n\n    # Rewrite the config of an existing store\n    sp init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Read",
        about = "Compute project health",
        long_about = "Compute earned value figures and health scores for a project, and record today's snapshot.",
        after_help = "EXAMPLES:\n    # Current health\n    sp health tower-a\n\n    # Evaluate at a fixed instant without recording\n    sp health tower-a --at 2026-06-30T17:00:00Z --no-record\n\n    # Emit machine-readable output\n    sp health tower-a --json"
    )]
    Health(cmd::health::HealthArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show stored health history",
        long_about = "Show up to the 30 most recent daily snapshots, oldest first, exactly as stored.",
        after_help = "EXAMPLES:\n    # Trend for a project\n    sp history tower-a\n\n    # Emit machine-readable output\n    sp history tower-a --json"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Write",
        about = "Record a manual snapshot",
        long_about = "Store a caller-supplied metrics object as the snapshot for a day. Existing days are never overwritten.",
        after_help = "EXAMPLES:\n    # Import a correction for today\n    sp record tower-a --file fix.json\n\n    # Backfill a specific day from stdin\n    cat snap.json | sp record tower-a --date 2026-06-01"
    )]
    Record(cmd::record::RecordArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    sp completions bash\n\n    # Generate zsh completions\n    sp completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SITEPULSE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "sitepulse=debug,sp=debug,info"
        } else {
            "sitepulse=info,warn"
        })
    });

    let format = env::var("SITEPULSE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = match cli.root {
        Some(ref root) => root.clone(),
        None => env::current_dir()?,
    };
    debug!(root = %project_root.display(), "resolved project root");

    match cli.command {
        Commands::Init(ref args) => {
            let output = output::resolve_output_mode(cli.json, None);
            cmd::init::run_init(args, output, &project_root)
        }
        Commands::Health(ref args) => {
            cmd::health::run_health(args, cli.agent_flag(), cli.json, &project_root)
        }
        Commands::History(ref args) => {
            cmd::history::run_history(args, cli.agent_flag(), cli.json, &project_root)
        }
        Commands::Record(ref args) => {
            cmd::record::run_record(args, cli.agent_flag(), cli.json, &project_root)
        }
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
