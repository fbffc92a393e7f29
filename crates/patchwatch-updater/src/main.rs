//! Patchwatch Updater - Apply OS security patches and log the run
//!
//! Exit code 0 when every step succeeded, 1 otherwise.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use patchwatch_common::{logging, Config, DEFAULT_CONFIG_FILE};
use patchwatch_updater::run_updates;
use tracing::error;

#[derive(Parser)]
#[command(name = "patchwatch-updater")]
#[command(about = "Apply OS security patches and write a timestamped log", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the key=value config file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    /// Print commands without executing them (logs go to /tmp/security-updates-dryrun)
    #[arg(long)]
    dry_run: bool,
}

fn run(cli: &Cli) -> Result<i32> {
    let config = Config::load(Some(cli.config_file.as_path()));
    let outcome = run_updates(&config, cli.dry_run).context("Security update run aborted")?;
    Ok(outcome.run.exit_code())
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };

    std::process::exit(code);
}
