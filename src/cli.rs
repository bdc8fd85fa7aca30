//! Command-line interface definitions

use crate::config::{SyncConfig, MAX_FILES_IN_FLIGHT_LIMIT};
use crate::staleness::{Comparison, StalenessPolicy};
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Local one-way file synchronization
///
/// Copies each SOURCE into DEST, preserving permissions, timestamps, symlinks
/// and hard links. Entries already present only in DEST are left alone.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    override_usage = "resync [OPTIONS] SOURCE... DEST"
)]
pub struct Args {
    /// One or more sources followed by the destination
    #[arg(value_name = "PATH", num_args = 2.., required = true)]
    pub paths: Vec<PathBuf>,

    /// Skip based on checksum, not mod-time & size
    #[arg(short = 'c', long)]
    pub checksum: bool,

    /// Skip files that are newer on the receiver
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Maximum files materialized at once
    ///
    /// 1 processes entries strictly one after another. Higher values let
    /// sibling files in a tree copy concurrently.
    #[arg(long, default_value = "1")]
    pub max_files_in_flight: usize,

    /// Show progress information
    #[arg(long)]
    pub progress: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Every path but the last
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        match self.paths.split_last() {
            Some((_, sources)) => sources,
            None => &[],
        }
    }

    /// The last path
    #[must_use]
    pub fn destination(&self) -> &Path {
        self.paths.last().map_or(Path::new(""), PathBuf::as_path)
    }

    #[must_use]
    pub const fn policy(&self) -> StalenessPolicy {
        let comparison = if self.checksum {
            Comparison::Checksum
        } else {
            Comparison::ModTimeAndSize
        };
        StalenessPolicy::new(comparison, self.update)
    }

    /// Validate command-line arguments
    ///
    /// Source existence is not checked here; a missing source is reported as
    /// a failed entry like any other.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Fewer than two paths were given
    /// - Max files in flight is outside valid bounds (1-10000)
    /// - Both --quiet and --verbose options are used
    pub fn validate(&self) -> Result<()> {
        if self.paths.len() < 2 {
            anyhow::bail!("At least one source and a destination must be specified");
        }

        if self.max_files_in_flight < 1 || self.max_files_in_flight > MAX_FILES_IN_FLIGHT_LIMIT {
            anyhow::bail!(
                "Max files in flight must be between 1 and {}, got: {}",
                MAX_FILES_IN_FLIGHT_LIMIT,
                self.max_files_in_flight
            );
        }

        if self.quiet && self.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        Ok(())
    }
}

impl From<&Args> for SyncConfig {
    fn from(args: &Args) -> Self {
        Self {
            policy: args.policy(),
            max_files_in_flight: args.max_files_in_flight,
            progress: args.progress,
        }
    }
}
