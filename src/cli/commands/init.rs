//! tsm init - Create the data directory, default config and database

use std::fs;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_json, robot_ok};
use crate::config::{CONFIG_FILE, Config};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.toml with defaults
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Serialize)]
struct InitReport {
    root: String,
    config: String,
    config_written: bool,
    database: String,
    schema_version: u32,
}

pub fn run(ctx: &AppContext, args: &InitArgs) -> Result<()> {
    fs::create_dir_all(&ctx.tsm_root)?;

    let config_path = ctx.tsm_root.join(CONFIG_FILE);
    let config_written = args.force || !config_path.exists();
    if config_written {
        fs::write(&config_path, Config::default().to_toml()?)?;
    }

    let report = InitReport {
        root: ctx.tsm_root.display().to_string(),
        config: config_path.display().to_string(),
        config_written,
        database: ctx.config.database_path(&ctx.tsm_root).display().to_string(),
        schema_version: ctx.db.schema_version(),
    };

    if ctx.json {
        return emit_json(&robot_ok(report));
    }
    if ctx.quiet {
        return Ok(());
    }

    println!("{}", "Initialized tsm".bold());
    println!("{}: {}", "Root".dimmed(), report.root);
    if report.config_written {
        println!("{}: {} {}", "Config".dimmed(), report.config, "(written)".green());
    } else {
        println!(
            "{}: {} {}",
            "Config".dimmed(),
            report.config,
            "(kept, use --force to reset)".yellow()
        );
    }
    println!(
        "{}: {} (schema v{})",
        "Database".dimmed(),
        report.database,
        report.schema_version
    );
    Ok(())
}
