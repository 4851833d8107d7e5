use std::path::PathBuf;

use clap::{Parser, Subcommand};
use racesync_core::conflict::Strategy;

#[derive(Parser)]
#[command(name = "racesync")]
#[command(about = "Exchange race data between timing stations through signed packages")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to engine configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export full race data for one or more races
    Export {
        /// Race id (repeat for several races)
        #[arg(long = "race", value_name = "ID", required = true)]
        races: Vec<i64>,
        /// Output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Export a race in the version 2 race-config format
    ExportLegacy {
        /// Race id
        #[arg(long, value_name = "ID")]
        race: i64,
        /// Output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Export one checkpoint's runner results
    ExportCheckpoint {
        /// Race id
        #[arg(long, value_name = "ID")]
        race: i64,
        /// Checkpoint number (0 for the base station)
        #[arg(long, value_name = "N")]
        checkpoint: u32,
        /// Output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import a full race-data package
    Import {
        /// Package file
        file: PathBuf,
        /// Conflict strategy: newer, older, skip or manual (config default when omitted)
        #[arg(long, value_name = "STRATEGY")]
        strategy: Option<Strategy>,
        /// JSON file mapping conflict ids ("runners/12") to "incoming" or "existing"
        #[arg(long, value_name = "FILE")]
        decisions: Option<PathBuf>,
    },
    /// Validate a package and list conflicts without importing
    Preview {
        /// Package file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a version 2 race-config package
    ImportLegacy {
        /// Package file
        file: PathBuf,
    },
    /// Import a checkpoint-results package for the active race
    ImportCheckpoint {
        /// Package file
        file: PathBuf,
        /// Active race id on this station
        #[arg(long, value_name = "ID")]
        race: String,
    },
    /// Verify a package checksum
    Verify {
        /// Package file
        file: PathBuf,
    },
    /// Print this station's device identity
    DeviceId,
}
