//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod check;
pub mod clear_recollection;
pub mod create;
pub mod delete;
pub mod init;
pub mod list;
pub mod reject;
pub mod resolve;
pub mod show;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Init(args) => init::run(ctx, args),
        Commands::Create(args) => create::run(ctx, args),
        Commands::Show(args) => show::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Reject(args) => reject::run(ctx, args),
        Commands::Resolve(args) => resolve::run(ctx, args),
        Commands::ClearRecollection(args) => clear_recollection::run(ctx, args),
        Commands::Delete(args) => delete::run(ctx, args),
        Commands::Check(args) => check::run(ctx, args),
    }
}
