mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, data::DataSubcommand, incident::IncidentSubcommand,
    rules::RulesSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rca",
    about = "Detect network incidents and run root cause analysis on them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .rca/ or .git/)
    #[arg(long, global = true, env = "RCA_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize .rca/ in the current project
    Init,

    /// Detect, create and inspect incidents
    Incident {
        #[command(subcommand)]
        subcommand: IncidentSubcommand,
    },

    /// Run the interactive root cause analysis
    Analyze {
        /// Incident id to start with (prompted for when omitted)
        id: Option<String>,
    },

    /// Validate or print the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Inspect the rule catalog
    Rules {
        #[command(subcommand)]
        subcommand: RulesSubcommand,
    },

    /// Load network measurements into the incident store
    Data {
        #[command(subcommand)]
        subcommand: DataSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Analyze { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Incident { subcommand } => cmd::incident::run(&root, subcommand, cli.json),
        Commands::Analyze { id } => cmd::analyze::run(&root, id),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Rules { subcommand } => cmd::rules::run(&root, subcommand, cli.json),
        Commands::Data { subcommand } => cmd::data::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
