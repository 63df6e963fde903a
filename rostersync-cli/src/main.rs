//! Rostersync — parish roster to mail-group synchronization.
//!
//! # Usage
//!
//! ```text
//! rostersync sync --members <export.json> --token-file <path> [--group <address> | --all] [--dry-run] [--json]
//! rostersync roster <address> --members <export.json> [--json]
//! rostersync groups [--config <path>]
//! ```
//!
//! The members export is produced by the membership-database loader; the
//! token file holds a pre-obtained OAuth bearer token for the directory
//! APIs.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{groups::GroupsArgs, roster::RosterArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "rostersync",
    version,
    about = "Reconcile remote mail-group membership with parish rosters",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile remote group membership with the computed rosters.
    Sync(SyncArgs),

    /// Show the computed roster for one group without touching the remote.
    Roster(RosterArgs),

    /// List configured groups and their match rules.
    Groups(GroupsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Roster(args) => args.run(),
        Commands::Groups(args) => args.run(),
    }
}
