//! resync: local one-way file synchronization
//!
//! Prints nothing on success. Each failed entry is reported on stderr as one
//! line, and the exit status is 23 when anything failed.

use anyhow::{Context, Result};
use clap::Parser;
use resync::cli::Args;
use resync::{sync_paths, SyncConfig};
use std::process::ExitCode;
use tracing::{info, Level};

/// Exit status when some entries could not be synchronized
const EXIT_PARTIAL_TRANSFER: u8 = 23;

#[compio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<ExitCode> {
    args.validate().context("Invalid arguments")?;
    init_logging(args)?;

    info!("Starting resync v{}", env!("CARGO_PKG_VERSION"));
    info!("Destination: {}", args.destination().display());
    info!("Max files in flight: {}", args.max_files_in_flight);

    let config = SyncConfig::from(args);
    let report = sync_paths(&config, args.sources(), args.destination())
        .await
        .context("Invalid configuration")?;

    let mut failed = false;
    for entry in report.failures() {
        if let Some(err) = entry.outcome.error() {
            eprintln!("{err}");
            failed = true;
        }
    }

    if failed {
        Ok(ExitCode::from(EXIT_PARTIAL_TRANSFER))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Install the fmt subscriber at the level chosen by -v/-q
fn init_logging(args: &Args) -> Result<()> {
    let level = if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}
