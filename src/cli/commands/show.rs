//! tsm show - Show one mapping by id

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{emit_json, print_mapping, robot_ok};
use crate::core::{MappingId, to_info};
use crate::error::Result;
use crate::storage::Scope;

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: MappingId,

    /// Also find soft-deleted mappings
    #[arg(long)]
    pub include_deleted: bool,
}

pub fn run(ctx: &AppContext, args: &ShowArgs) -> Result<()> {
    let scope = if args.include_deleted {
        Scope::All
    } else {
        Scope::Active
    };
    let mapping = ctx
        .service
        .in_transaction(|uow| ctx.service.mapping_by_id(uow, args.id, scope))?;

    if ctx.json {
        emit_json(&robot_ok(to_info(&mapping)))
    } else if ctx.quiet {
        Ok(())
    } else {
        print_mapping(&mapping);
        Ok(())
    }
}
