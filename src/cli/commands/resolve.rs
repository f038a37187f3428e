//! tsm resolve - Resolve the owed recollection for an order's test

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[arg(long)]
    pub order: String,

    #[arg(long)]
    pub test: String,
}

pub fn run(ctx: &AppContext, args: &ResolveArgs) -> Result<()> {
    let report = ctx.service.in_transaction(|uow| {
        ctx.service
            .resolve_recollection(uow, &args.order, &args.test, ctx.actor)
    })?;

    if ctx.json {
        return emit_json(&robot_ok(report));
    }
    if ctx.quiet {
        return Ok(());
    }

    if report.is_noop() {
        println!(
            "{} nothing to resolve for {}/{}",
            "!".yellow(),
            args.order,
            args.test
        );
    } else {
        println!(
            "{} {} recollection(s) for {}/{}",
            "Resolved".green().bold(),
            report.cleared.len(),
            args.order,
            args.test
        );
    }
    if !report.already_resolved.is_empty() {
        println!("  already resolved: {:?}", report.already_resolved);
    }
    if !report.skipped_unrejected.is_empty() {
        println!("  never rejected: {:?}", report.skipped_unrejected);
    }
    if !report.skipped_deleted.is_empty() {
        println!("  {}: {:?}", "deleted".dimmed(), report.skipped_deleted);
    }
    Ok(())
}
