mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, Settings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "guidelines",
    about = "Resolve and load task-specific guideline documents for an agent session",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .guidelines/ or .git/)
    #[arg(long, global = true, env = "GUIDELINES_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Never fetch from the remote origin
    #[arg(long, global = true)]
    offline: bool,

    /// Override the remote origin base URL
    #[arg(long, global = true, env = "GUIDELINES_ORIGIN")]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and create the .guidelines/ tree
    Init,

    /// Print the guideline context for one or more task types
    Load {
        /// Task type (python, git, refactor, review, new-repo, all); repeatable
        #[arg(long = "task-type", short = 't', required = true)]
        task_types: Vec<String>,
    },

    /// List the document ids a task type resolves to
    Resolve { task_type: String },

    /// Run the bootstrap steps and record the version marker
    #[command(disable_version_flag = true)]
    Bootstrap {
        /// Origin tag to fetch documents from and record
        #[arg(long)]
        version: Option<String>,
    },

    /// Refresh every cached document from the origin, then run the remaining steps
    #[command(disable_version_flag = true)]
    Sync {
        /// Origin tag to fetch documents from and record
        #[arg(long)]
        version: Option<String>,
    },

    /// Show the version marker and where each document would load from
    Status,

    /// Inspect the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Bootstrap { .. } | Commands::Sync { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    // stdout carries the guideline text; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let settings = Settings {
        root,
        json: cli.json,
        offline: cli.offline,
        origin: cli.origin,
    };

    let result = match cli.command {
        Commands::Init => cmd::init::run(&settings),
        Commands::Load { task_types } => cmd::load::run(&settings, &task_types),
        Commands::Resolve { task_type } => cmd::resolve::run(&settings, &task_type),
        Commands::Bootstrap { version } => {
            cmd::bootstrap::run(&settings, version.as_deref(), cmd::bootstrap::Mode::Bootstrap)
        }
        Commands::Sync { version } => {
            cmd::bootstrap::run(&settings, version.as_deref(), cmd::bootstrap::Mode::Sync)
        }
        Commands::Status => cmd::status::run(&settings),
        Commands::Config { subcommand } => cmd::config::run(&settings, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
