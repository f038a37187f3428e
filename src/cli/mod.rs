//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// Test-sample mapping lifecycle tool
#[derive(Parser, Debug)]
#[command(name = "tsm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit a JSON envelope instead of human output
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress logs and human-readable output (errors and --json still print)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: layered global + <root>/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding config.toml and the database
    #[arg(long, global = true, env = "TSM_ROOT")]
    pub root: Option<PathBuf>,

    /// Actor id recorded on writes (default: configured system actor)
    #[arg(long, global = true)]
    pub actor: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    #[must_use]
    pub fn tsm_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from(".tsm"))
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, default config and database
    Init(commands::init::InitArgs),

    /// Assign a draw to a test of an order
    Create(commands::create::CreateArgs),

    /// Show one mapping by id
    Show(commands::show::ShowArgs),

    /// List mappings of an order
    List(commands::list::ListArgs),

    /// Reject a draw or a whole physical sample
    Reject(commands::reject::RejectArgs),

    /// Resolve the owed recollection for an order's test
    Resolve(commands::resolve::ResolveArgs),

    /// Drop owed recollections for a set of tests
    ClearRecollection(commands::clear_recollection::ClearRecollectionArgs),

    /// Soft-delete mappings
    Delete(commands::delete::DeleteArgs),

    /// Boolean lifecycle checks
    Check(commands::check::CheckArgs),
}
