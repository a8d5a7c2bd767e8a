//! CLI application for extracting structured data from scanned business documents.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{warn, Level};
use tracing_subscriber::EnvFilter;

use commands::{check, config, process, run};

/// Exit code reported when the user interrupts a run.
const EXIT_INTERRUPTED: u8 = 130;

/// docex - Extract structured data from scanned invoices and packing lists
#[derive(Parser)]
#[command(name = "docex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every document in a directory
    Run(run::RunArgs),

    /// Process a single document
    Process(process::ProcessArgs),

    /// Check that the completion service is reachable
    Check(check::CheckArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

impl Commands {
    /// Batch-style commands log one line per document by default.
    fn default_verbosity(&self) -> u8 {
        match self {
            Commands::Run(_) | Commands::Process(_) => 1,
            Commands::Check(_) | Commands::Config(_) => 0,
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let Cli {
        verbose,
        config: config_file,
        command,
    } = Cli::parse();

    init_logging(command.default_verbosity().saturating_add(verbose));

    let config_path = config_file.as_deref();
    let work = async move {
        match command {
            Commands::Run(args) => run::run(args, config_path).await,
            Commands::Process(args) => process::run(args, config_path).await,
            Commands::Check(args) => check::run(args, config_path).await,
            Commands::Config(args) => config::run(args, config_path).await,
        }
    };

    // Polled first so the handler is installed before any document work.
    // An interrupt drops `work` at its pending await point and unwinds it.
    tokio::select! {
        biased;
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        result = work => result.map(|()| ExitCode::SUCCESS),
    }
}
