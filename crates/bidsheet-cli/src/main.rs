mod checkpoint;
mod commands;
mod error;
mod fetch;
mod logging;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bidsheet",
    version,
    about = "Extract bid sections, parcel tables and narrative fields from court auction notices"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one notice PDF into bid sections
    Parse {
        /// Path to the notice PDF
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the result as JSON to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Wall-clock budget for the document, in seconds
        #[arg(long, env = "BIDSHEET_TIMEOUT_SECS", default_value_t = 60)]
        timeout_secs: u64,
    },
    /// List the anchors located in a notice PDF, in reading order
    Anchors {
        /// Path to the notice PDF
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Wall-clock budget for the document, in seconds
        #[arg(long, env = "BIDSHEET_TIMEOUT_SECS", default_value_t = 60)]
        timeout_secs: u64,
    },
    /// Process a manifest of notices, resuming from a checkpoint
    Batch {
        /// JSON manifest: [{"id": "...", "source": "<url or path>"}]
        manifest: PathBuf,

        /// Checkpoint file recording each document's outcome
        #[arg(long, value_name = "FILE")]
        checkpoint: PathBuf,

        /// Retries per download on transport errors, 429 and 5xx
        #[arg(long, env = "BIDSHEET_RETRIES", default_value_t = 3)]
        retries: u32,

        /// Worker threads (default: one per core)
        #[arg(short, long, env = "BIDSHEET_JOBS")]
        jobs: Option<usize>,

        /// Wall-clock budget per document, in seconds
        #[arg(long, env = "BIDSHEET_TIMEOUT_SECS", default_value_t = 60)]
        timeout_secs: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            input_file,
            output,
            out,
            timeout_secs,
        } => commands::parse::run(input_file, &output, out, timeout_secs),
        Commands::Anchors {
            input_file,
            output,
            timeout_secs,
        } => commands::anchors::run(input_file, &output, timeout_secs),
        Commands::Batch {
            manifest,
            checkpoint,
            retries,
            jobs,
            timeout_secs,
        } => commands::batch::run(manifest, checkpoint, retries, jobs, timeout_secs),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
