//! tsm create - Assign a draw to a test of an order

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, print_mapping, robot_ok};
use crate::core::{NewMapping, to_info};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub order: String,

    #[arg(long)]
    pub test: String,

    /// Physical sample (barcode) id
    #[arg(long)]
    pub sample_id: i64,

    /// Draw number within the order, starting at 1
    #[arg(long, default_value_t = 1)]
    pub sample_number: u32,

    #[arg(long)]
    pub vial_type: i64,

    #[arg(long, default_value = "")]
    pub city: String,
}

pub fn run(ctx: &AppContext, args: &CreateArgs) -> Result<()> {
    let new = NewMapping {
        oms_order_id: args.order.clone(),
        oms_test_id: args.test.clone(),
        sample_id: args.sample_id,
        sample_number: args.sample_number,
        vial_type_id: args.vial_type,
        oms_city_code: args.city.clone(),
    };
    let created = ctx
        .service
        .in_transaction(|uow| ctx.service.create(uow, &new, ctx.actor))?;

    if ctx.json {
        return emit_json(&robot_ok(to_info(&created)));
    }
    if ctx.quiet {
        return Ok(());
    }
    println!("{} mapping {}", "Created".green().bold(), created.id);
    print_mapping(&created);
    Ok(())
}
