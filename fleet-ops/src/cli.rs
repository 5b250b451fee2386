use clap::{Parser, Subcommand};
use fleet_sync::Collection;
use std::path::PathBuf;

/// Fleet fuel offline sync operator tool
#[derive(Parser, Debug)]
#[command(name = "fleetsync", version)]
#[command(about = "Inspect and drive the offline-first fuel tracker sync engine")]
pub struct Args {
    /// Settings file (YAML or TOML)
    #[arg(short, long, env = "FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Start with connectivity marked offline
    #[arg(long)]
    pub offline: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Replay against an in-process remote on a copy of the local snapshot
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show connectivity, sync state and pending counts
    Status,
    /// Run one sync cycle now
    Sync,
    /// List a collection
    List {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
    },
    /// Create a record from a JSON object
    Add {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        json: String,
    },
    /// Patch a fuel record with a JSON object
    UpdateFuel { id: String, json: String },
    /// Delete a record
    Delete {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        id: String,
    },
    /// Keep syncing in the background until Ctrl-C
    Watch {
        /// Seconds between background sync attempts
        #[arg(long, default_value = "30")]
        interval: u64,
    },
}

fn parse_collection(s: &str) -> Result<Collection, String> {
    Collection::parse(s).map_err(|e| e.to_string())
}
