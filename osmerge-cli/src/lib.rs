//! Command-line interface for merging sorted OSM entity streams.
//!
//! Inputs and outputs are JSON Lines files, one record per line, already
//! sorted by entity key. Options layer from CLI flags, configuration files
//! and `OSMERGE_`-prefixed environment variables.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod jsonl;
mod merge;

pub use error::CliError;
pub use jsonl::{JsonLinesError, JsonLinesReader, JsonLinesWriter};

use merge::{MergeArgs, MergeChangeArgs, run_merge, run_merge_change};

const ARG_LEFT: &str = "left";
const ARG_RIGHT: &str = "right";
const ARG_OUTPUT: &str = "output";
const ARG_CONFLICT_RESOLUTION_METHOD: &str = "conflict-resolution-method";
const ARG_BOUND_REMOVED_ACTION: &str = "bound-removed-action";
const ARG_BUFFER_CAPACITY: &str = "buffer-capacity";
const ENV_MERGE_LEFT: &str = "OSMERGE_CMDS_MERGE_LEFT";
const ENV_MERGE_RIGHT: &str = "OSMERGE_CMDS_MERGE_RIGHT";
const ENV_MERGE_OUTPUT: &str = "OSMERGE_CMDS_MERGE_OUTPUT";
const ENV_MERGE_CHANGE_LEFT: &str = "OSMERGE_CMDS_MERGE_CHANGE_LEFT";
const ENV_MERGE_CHANGE_RIGHT: &str = "OSMERGE_CMDS_MERGE_CHANGE_RIGHT";
const ENV_MERGE_CHANGE_OUTPUT: &str = "OSMERGE_CMDS_MERGE_CHANGE_OUTPUT";

/// Run the osmerge CLI with the current process arguments and environment.
///
/// # Errors
/// Returns a [`CliError`] when arguments or configuration are invalid, an
/// input cannot be opened, or the merge pipeline fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Merge(args) => {
            run_merge(args)?;
        }
        Command::MergeChange(args) => {
            run_merge_change(args)?;
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "osmerge",
    about = "Sorted merge-join of OpenStreetMap entity streams",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge two sorted entity snapshots into one.
    Merge(MergeArgs),
    /// Merge two sorted change streams into one.
    MergeChange(MergeChangeArgs),
}

#[cfg(test)]
mod tests;
