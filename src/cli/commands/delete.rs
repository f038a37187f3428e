//! tsm delete - Soft-delete mappings

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::core::{MappingId, MappingKey};
use crate::error::Result;
use crate::storage::MutationOutcome;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(subcommand)]
    pub target: DeleteTarget,
}

#[derive(Subcommand, Debug)]
pub enum DeleteTarget {
    /// Withdraw the mapping in one order/test/sample-number slot
    Key {
        #[arg(long)]
        order: String,
        #[arg(long)]
        test: String,
        #[arg(long, default_value_t = 1)]
        sample_number: u32,
    },
    /// Withdraw every active mapping of these tests
    Tests { tests: Vec<String> },
    /// Withdraw mappings by id
    Ids { ids: Vec<MappingId> },
}

pub fn run(ctx: &AppContext, args: &DeleteArgs) -> Result<()> {
    let outcome = ctx.service.in_transaction(|uow| match &args.target {
        DeleteTarget::Key {
            order,
            test,
            sample_number,
        } => ctx
            .service
            .delete_by_key(uow, &MappingKey::new(order, test, *sample_number), ctx.actor),
        DeleteTarget::Tests { tests } => ctx.service.delete_by_test_ids(uow, tests, ctx.actor),
        DeleteTarget::Ids { ids } => ctx.service.delete_by_ids(uow, ids, ctx.actor),
    })?;

    if ctx.json {
        return emit_json(&robot_ok(outcome));
    }
    if ctx.quiet {
        return Ok(());
    }
    match outcome {
        MutationOutcome::NoOp => println!("{} nothing to delete", "!".yellow()),
        MutationOutcome::Applied { rows } => {
            println!("{} {} mapping(s)", "Deleted".green().bold(), rows);
        }
    }
    Ok(())
}
