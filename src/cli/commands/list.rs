//! tsm list - List mappings of an order

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{emit_json, print_mapping_rows, robot_ok};
use crate::core::to_infos;
use crate::error::Result;
use crate::storage::Scope;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub order: String,

    /// Restrict to these tests (repeatable)
    #[arg(long = "test")]
    pub tests: Vec<String>,

    /// Include soft-deleted history for the selected tests
    #[arg(long, requires = "tests")]
    pub include_deleted: bool,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let mappings = ctx.service.in_transaction(|uow| {
        if args.tests.is_empty() {
            ctx.service.list_for_order(uow, &args.order)
        } else {
            let scope = if args.include_deleted {
                Scope::All
            } else {
                Scope::Active
            };
            ctx.service
                .mappings_for_order_and_tests(uow, &args.order, &args.tests, scope)
        }
    })?;

    if ctx.json {
        emit_json(&robot_ok(to_infos(&mappings)))
    } else if ctx.quiet {
        Ok(())
    } else {
        print_mapping_rows(&mappings);
        Ok(())
    }
}
