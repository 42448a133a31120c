//! Command-line interface for tablesync

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tablesync")]
#[command(about = "Reconcile tabular snapshots and pending-edit buffers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this config file instead of the resolved one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge two dataset documents and classify every row
    Merge {
        /// Document holding the original snapshot
        original: PathBuf,

        /// Document holding the changed snapshot
        changed: PathBuf,

        /// Write the merged dataset to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fold a pending-edits buffer into a refreshed dataset
    Sync {
        /// Document holding the pending edits
        buffer: PathBuf,

        /// Document holding the refreshed data
        current: PathBuf,

        /// Write both documents back after synchronizing
        #[arg(long)]
        write: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether two dataset documents can be merged
    Check {
        /// First document
        left: PathBuf,

        /// Second document
        right: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the compound key of every row of a table
    Keys {
        /// Dataset document
        file: PathBuf,

        /// Table name
        table: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure tablesync settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Write a default global configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tablesync", "merge", "a.json", "b.json", "--json", "--verbose", "--config", "x.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Merge { json: true, output: None, .. }));
    }
}
