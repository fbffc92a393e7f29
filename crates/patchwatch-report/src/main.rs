//! Patchwatch Report - Monthly security patch summary
//!
//! Exit code 0 when a report was written, 1 when there was nothing to report.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use patchwatch_common::{logging, Config, DEFAULT_CONFIG_FILE};
use patchwatch_report::{generate_monthly_report, ReportPeriod};
use tracing::error;

#[derive(Parser)]
#[command(name = "patchwatch-report")]
#[command(about = "Build the monthly security update report and send it to chat", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the key=value config file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    /// Report year (defaults to the current year)
    #[arg(value_parser = clap::value_parser!(i32).range(1..=9999))]
    year: Option<i32>,

    /// Report month, 1-12 (defaults to the current month)
    #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
}

fn run(cli: &Cli) -> Result<i32> {
    let config = Config::load(Some(cli.config_file.as_path()));

    let current = ReportPeriod::current();
    let year = cli.year.unwrap_or(current.year());
    let month = cli.month.unwrap_or(current.month());
    let period = ReportPeriod::new(year, month)
        .ok_or_else(|| anyhow!("Invalid report period {}-{:02}", year, month))?;

    let outcome = generate_monthly_report(&config, period)
        .with_context(|| format!("Report generation for {} failed", period.iso()))?;

    match outcome {
        Some(outcome) => {
            println!("Report generated: {}", outcome.path.display());
            Ok(0)
        }
        None => {
            println!("No report generated - check logs above.");
            Ok(1)
        }
    }
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
