//! tsm reject - Reject a draw or a whole physical sample

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, print_mapping, robot_ok};
use crate::core::{MappingKey, to_info};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct RejectArgs {
    #[command(subcommand)]
    pub target: RejectTarget,
}

#[derive(Subcommand, Debug)]
pub enum RejectTarget {
    /// Reject the draw occupying one order/test/sample-number slot
    Draw {
        #[arg(long)]
        order: String,
        #[arg(long)]
        test: String,
        #[arg(long, default_value_t = 1)]
        sample_number: u32,
        #[arg(long)]
        reason: String,
    },
    /// Reject every unresolved mapping served by a physical sample
    Sample {
        sample_id: i64,
        /// Omit to keep reasons already recorded
        #[arg(long)]
        reason: Option<String>,
    },
}

pub fn run(ctx: &AppContext, args: &RejectArgs) -> Result<()> {
    match &args.target {
        RejectTarget::Draw {
            order,
            test,
            sample_number,
            reason,
        } => {
            let key = MappingKey::new(order, test, *sample_number);
            let rejected = ctx
                .service
                .in_transaction(|uow| ctx.service.reject_draw(uow, &key, reason, ctx.actor))?;
            if ctx.json {
                return emit_json(&robot_ok(to_info(&rejected)));
            }
            if ctx.quiet {
                return Ok(());
            }
            println!("{} draw {}", "Rejected".red().bold(), key);
            print_mapping(&rejected);
        }
        RejectTarget::Sample { sample_id, reason } => {
            let outcome = ctx.service.in_transaction(|uow| {
                ctx.service
                    .reject_sample(uow, *sample_id, reason.as_deref(), ctx.actor)
            })?;
            if ctx.json {
                return emit_json(&robot_ok(outcome));
            }
            if ctx.quiet {
                return Ok(());
            }
            if outcome.is_noop() {
                println!("{} sample {} has no rejectable mappings", "!".yellow(), sample_id);
            } else {
                println!(
                    "{} {} mapping(s) of sample {}",
                    "Rejected".red().bold(),
                    outcome.rows(),
                    sample_id
                );
            }
        }
    }
    Ok(())
}
