//! learnmark CLI: completion checks and assessment scoring from scenario files.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "learnmark",
    version,
    about = "Course completion rules and skill assessment scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an enrollment against its course's completion requirements
    Check {
        /// Path to a course scenario .toml file
        #[arg(long)]
        scenario: PathBuf,

        /// Complete the enrollment when every required requirement holds
        #[arg(long)]
        apply: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the JSON report to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also save the JSON report under the configured output directory
        #[arg(long)]
        save: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Score an assessment attempt
    Score {
        /// Path to an assessment attempt .toml file
        #[arg(long)]
        attempt: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the JSON report to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also save the JSON report under the configured output directory
        #[arg(long)]
        save: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate scenario TOML files
    Validate {
        /// Path to a scenario file or directory
        #[arg(long)]
        path: PathBuf,
    },

    /// List the available completion criteria
    Criteria,

    /// Create starter config and sample scenarios
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("learnmark=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            scenario,
            apply,
            format,
            output,
            save,
            config,
        } => commands::check::execute(scenario, apply, format, output, save, config),
        Commands::Score {
            attempt,
            format,
            output,
            save,
            config,
        } => commands::score::execute(attempt, format, output, save, config),
        Commands::Validate { path } => commands::validate::execute(path),
        Commands::Criteria => commands::criteria::execute(),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
