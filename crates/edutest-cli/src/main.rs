//! edutest CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "edutest", version, about = "Take and grade education portal tests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a test loaded through the configured gateway
    Take {
        /// Id of the test to take
        #[arg(long)]
        test_id: u64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Answer file to grade non-interactively
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Directory to save the attempt report to
        #[arg(long)]
        output: Option<PathBuf>,

        /// Start the attempt even outside the test's validity window
        #[arg(long)]
        ignore_window: bool,
    },

    /// Grade an answer file against a test definition offline
    Grade {
        /// Test definition JSON
        #[arg(long)]
        test: PathBuf,

        /// Answer file JSON
        #[arg(long)]
        answers: PathBuf,

        /// Separate answer key JSON (overrides the flags in the test)
        #[arg(long)]
        key: Option<PathBuf>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show a saved attempt report
    Report {
        /// Attempt report JSON
        #[arg(long)]
        path: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate test definition files
    Validate {
        /// Path to a test file or directory
        #[arg(long)]
        test: PathBuf,
    },

    /// Create starter config and example test
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("edutest=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            test_id,
            config,
            answers,
            output,
            ignore_window,
        } => commands::take::execute(test_id, config, answers, output, ignore_window).await,
        Commands::Grade {
            test,
            answers,
            key,
            format,
        } => commands::grade::execute(test, answers, key, format),
        Commands::Report { path, format } => commands::report::execute(path, format),
        Commands::Validate { test } => commands::validate::execute(test),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
