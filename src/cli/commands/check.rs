//! tsm check - Boolean lifecycle checks

use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::core::MappingKey;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(subcommand)]
    pub check: CheckKind,
}

#[derive(Subcommand, Debug)]
pub enum CheckKind {
    /// Is any recollection still owed for these orders and tests?
    Pending {
        #[arg(long = "order", required = true)]
        orders: Vec<String>,
        /// Omit to check every test of the orders
        #[arg(long = "test")]
        tests: Vec<String>,
    },
    /// Are all other tests sharing this draw rejected?
    AllRejected {
        #[arg(long)]
        order: String,
        #[arg(long)]
        test: String,
        #[arg(long, default_value_t = 1)]
        sample_number: u32,
    },
}

#[derive(Serialize)]
struct CheckResult {
    check: &'static str,
    result: bool,
}

pub fn run(ctx: &AppContext, args: &CheckArgs) -> Result<()> {
    let (check, result) = ctx.service.in_transaction(|uow| match &args.check {
        CheckKind::Pending { orders, tests } => {
            if !tests.is_empty() {
                let pending = ctx.service.any_recollection_pending(uow, orders, tests)?;
                return Ok(("recollection_pending", pending));
            }
            for order in orders {
                if ctx.service.any_recollection_pending_for_order(uow, order)? {
                    return Ok(("recollection_pending", true));
                }
            }
            Ok(("recollection_pending", false))
        }
        CheckKind::AllRejected {
            order,
            test,
            sample_number,
        } => {
            let key = MappingKey::new(order, test, *sample_number);
            Ok((
                "all_other_tests_rejected",
                ctx.service.all_other_tests_rejected(uow, &key)?,
            ))
        }
    })?;

    if ctx.json {
        return emit_json(&robot_ok(CheckResult { check, result }));
    }
    if ctx.quiet {
        return Ok(());
    }
    let answer = if result { "yes".green() } else { "no".red() };
    println!("{check}: {answer}");
    Ok(())
}
