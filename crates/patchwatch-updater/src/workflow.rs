//! Update workflow
//!
//! Detect -> run -> persist. One invocation produces exactly one log file;
//! step failures are recorded, only log I/O failures abort the run.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Local;
use nix::unistd::Uid;
use patchwatch_common::log_format::{log_file_name, DRY_RUN_DIR};
use patchwatch_common::Config;
use tracing::{info, warn};

use crate::os::OsFamily;
use crate::plan::plan_for;
use crate::runner::{CommandRunner, Executor, SystemExecutor};
use crate::update_log::{UpdateLogWriter, UpdateRun};

/// Fatal updater errors
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("failed to create log directory {path}: {source}")]
    CreateLogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write log file {path}: {source}")]
    WriteLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A finished run and where it was logged
#[derive(Debug)]
pub struct UpdateOutcome {
    pub run: UpdateRun,
    pub log_path: PathBuf,
}

/// Run the security patch workflow on this host
pub fn run_updates(config: &Config, dry_run: bool) -> Result<UpdateOutcome, UpdateError> {
    let log_dir = if dry_run {
        PathBuf::from(DRY_RUN_DIR)
    } else {
        config.log_dir.clone()
    };

    if !dry_run && !Uid::effective().is_root() {
        warn!("Not running as root; package manager commands will likely fail");
    }

    let family = OsFamily::detect();
    let runner = CommandRunner::new(SystemExecutor::default(), family, dry_run);
    execute_plan(config, &log_dir, &runner)
}

/// Run the family's plan through `runner`, logging into `log_dir`
pub fn execute_plan<E: Executor>(
    config: &Config,
    log_dir: &Path,
    runner: &CommandRunner<E>,
) -> Result<UpdateOutcome, UpdateError> {
    fs::create_dir_all(log_dir).map_err(|source| UpdateError::CreateLogDir {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let family = runner.family();
    let mut run = UpdateRun::new(
        &config.server_name,
        &config.environment,
        family,
        Local::now().naive_local(),
    );
    let log_path = log_dir.join(log_file_name(&run.started));

    info!("Starting security update workflow");
    info!("Server  : {}  ({})", config.server_name, config.environment);
    info!("OS      : {}", family);
    info!("Log file: {}", log_path.display());

    let write_err = |source| UpdateError::WriteLog {
        path: log_path.clone(),
        source,
    };

    let file = File::create(&log_path).map_err(write_err)?;
    let mut writer = UpdateLogWriter::new(BufWriter::new(file));
    writer.write_header(&run).map_err(write_err)?;

    for step in plan_for(family) {
        let record = runner.run_step(&step);
        writer.write_step(&record).map_err(write_err)?;
        run.steps.push(record);
    }

    run.finished = Some(Local::now().naive_local());
    writer.write_footer(&run).map_err(write_err)?;

    info!("Done, status: {}", run.status());

    Ok(UpdateOutcome { run, log_path })
}
