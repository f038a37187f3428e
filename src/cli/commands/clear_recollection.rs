//! tsm clear-recollection - Drop owed recollections for a set of tests

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ClearRecollectionArgs {
    #[arg(required = true)]
    pub tests: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &ClearRecollectionArgs) -> Result<()> {
    let outcome = ctx.service.in_transaction(|uow| {
        ctx.service
            .clear_recollection_for_tests(uow, &args.tests, ctx.actor)
    })?;

    if ctx.json {
        return emit_json(&robot_ok(outcome));
    }
    if ctx.quiet {
        return Ok(());
    }
    println!(
        "{} recollection on {} mapping(s)",
        "Cleared".green().bold(),
        outcome.rows()
    );
    Ok(())
}
