//! `wbt` - run WhiteboxTools from a TOML configuration file.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wbt_runner::{load_config, whitebox_tools};

#[derive(Parser)]
#[command(name = "wbt")]
#[command(version, about = "Run WhiteboxTools using a TOML configuration file.", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    config_file: PathBuf,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .without_time()
        .with_level(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.verbose);

    match whitebox_tools(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
