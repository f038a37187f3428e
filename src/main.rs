//! tsm - test-sample mapping lifecycle CLI
//!
//! Track which draw serves which test of an order through rejection,
//! recollection and withdrawal.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tsm::Result;
use tsm::app::AppContext;
use tsm::cli::Cli;
use tsm::cli::output::{emit_json, print_error, robot_error_structured};
use tsm::config::Config;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref(), &cli.tsm_root());
    init_tracing(&cli, config.as_ref().ok());

    match config.and_then(|config| run(&cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                // JSON error envelope to stdout
                if emit_json(&robot_error_structured(&e)).is_err() {
                    eprintln!("Error: {e}");
                }
            } else {
                print_error(&e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: Config) -> Result<()> {
    let ctx = AppContext::from_cli(cli, config)?;
    tsm::cli::commands::run(&ctx, &cli.command)
}

fn init_tracing(cli: &Cli, config: Option<&Config>) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,tsm=info",
        1 => "info,tsm=debug",
        2 => "debug,tsm=trace",
        _ => "trace",
    };
    let configured = config.and_then(|config| config.logging.filter.clone());
    let json_logs = config.is_some_and(|config| config.logging.json);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| match (&configured, cli.verbose) {
            (Some(directives), 0) => EnvFilter::try_new(directives),
            _ => EnvFilter::try_new(filter),
        })
        .unwrap_or_else(|_| EnvFilter::new(filter));

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
