//! Update log writer
//!
//! Serializes a run into the text format described in
//! [`patchwatch_common::log_format`]. The writer is incremental: the header
//! goes out before the first command runs and each step is flushed as soon
//! as it finishes, so a killed run still leaves a readable partial log.

use std::io::{self, Write};

use chrono::NaiveDateTime;
use patchwatch_common::log_format::{
    LOG_TITLE, SEPARATOR, STATUS_SUCCESS, STATUS_WITH_ERRORS, STEP_SEPARATOR, TIMESTAMP_FORMAT,
};

use crate::os::OsFamily;
use crate::runner::StepRecord;

/// One execution of the patch workflow
#[derive(Debug, Clone)]
pub struct UpdateRun {
    pub server_name: String,
    pub environment: String,
    pub family: OsFamily,
    pub started: NaiveDateTime,
    pub finished: Option<NaiveDateTime>,
    pub steps: Vec<StepRecord>,
}

impl UpdateRun {
    pub fn new(server_name: &str, environment: &str, family: OsFamily, started: NaiveDateTime) -> Self {
        Self {
            server_name: server_name.to_string(),
            environment: environment.to_string(),
            family,
            started,
            finished: None,
            steps: Vec::new(),
        }
    }

    /// Every step exited 0 (after normalization)
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(StepRecord::succeeded)
    }

    /// Footer status line value
    pub fn status(&self) -> &'static str {
        if self.succeeded() {
            STATUS_SUCCESS
        } else {
            STATUS_WITH_ERRORS
        }
    }

    /// Process exit code for the updater binary
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

/// Incremental writer for the update log format
pub struct UpdateLogWriter<W: Write> {
    out: W,
}

impl<W: Write> UpdateLogWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_header(&mut self, run: &UpdateRun) -> io::Result<()> {
        writeln!(self.out, "{}", SEPARATOR)?;
        writeln!(self.out, "{}", LOG_TITLE)?;
        writeln!(self.out, "Server      : {}", run.server_name)?;
        writeln!(self.out, "Environment : {}", run.environment)?;
        writeln!(self.out, "OS Family   : {}", run.family)?;
        writeln!(self.out, "Started     : {}", run.started.format(TIMESTAMP_FORMAT))?;
        writeln!(self.out, "{}", SEPARATOR)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn write_step(&mut self, step: &StepRecord) -> io::Result<()> {
        writeln!(self.out, "{}", STEP_SEPARATOR)?;
        writeln!(self.out, "{}", step.label)?;
        writeln!(self.out, "{}", STEP_SEPARATOR)?;
        writeln!(self.out)?;

        writeln!(self.out, "$ {}", step.command_line)?;
        if step.dry_run {
            writeln!(self.out, "[DRY-RUN] command not executed")?;
            writeln!(self.out, "[exit 0]")?;
        } else {
            self.out.write_all(step.output.as_bytes())?;
            writeln!(self.out)?;
            writeln!(self.out, "[exit {}]", step.termination.raw_code())?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn write_footer(&mut self, run: &UpdateRun) -> io::Result<()> {
        let finished = run
            .finished
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "N/A".to_string());

        writeln!(self.out)?;
        writeln!(self.out, "{}", SEPARATOR)?;
        writeln!(self.out, "Status  : {}", run.status())?;
        writeln!(self.out, "Finished: {}", finished)?;
        writeln!(self.out, "{}", SEPARATOR)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Write a complete run in one go
pub fn write_run<W: Write>(run: &UpdateRun, out: W) -> io::Result<W> {
    let mut writer = UpdateLogWriter::new(out);
    writer.write_header(run)?;
    for step in &run.steps {
        writer.write_step(step)?;
    }
    writer.write_footer(run)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Termination;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn step(label: &str, cmd: &str, output: &str, code: i32) -> StepRecord {
        StepRecord {
            label: label.to_string(),
            command_line: cmd.to_string(),
            output: output.to_string(),
            termination: Termination::Exited(code),
            exit_code: code,
            dry_run: false,
        }
    }

    fn render(run: &UpdateRun) -> String {
        String::from_utf8(write_run(run, Vec::new()).unwrap()).unwrap()
    }

    #[test]
    fn test_full_layout() {
        let mut run = UpdateRun::new("web-01", "production", OsFamily::Debian, at(3, 0, 0));
        run.steps.push(step("STEP 1: Update", "apt-get update", "Hit:1 http://archive\n", 0));
        run.finished = Some(at(3, 4, 12));

        let text = render(&run);
        let expected = format!(
            "{sep}\nSecurity Update Log\nServer      : web-01\nEnvironment : production\n\
             OS Family   : debian\nStarted     : 2026-02-01 03:00:00\n{sep}\n\n\
             {star}\nSTEP 1: Update\n{star}\n\n$ apt-get update\nHit:1 http://archive\n\n[exit 0]\n\n\
             \n{sep}\nStatus  : SUCCESS\nFinished: 2026-02-01 03:04:12\n{sep}\n",
            sep = SEPARATOR,
            star = STEP_SEPARATOR
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_failed_step_sets_status() {
        let mut run = UpdateRun::new("web-01", "production", OsFamily::Rhel, at(3, 0, 0));
        run.steps.push(step("STEP 1", "yum check-update --security", "", 0));
        run.steps.push(step("STEP 2", "yum update --security -y", "boom\n", 1));

        assert_eq!(run.status(), STATUS_WITH_ERRORS);
        assert_eq!(run.exit_code(), 1);
        assert!(render(&run).contains("Status  : COMPLETED WITH ERRORS"));
    }

    #[test]
    fn test_raw_exit_code_is_logged() {
        let mut run = UpdateRun::new("db", "staging", OsFamily::Rhel, at(1, 0, 0));
        let mut check = step("STEP 1", "yum check-update --security", "", 0);
        check.termination = Termination::Exited(100);
        run.steps.push(check);

        let text = render(&run);
        assert!(text.contains("[exit 100]"));
        assert!(text.contains("Status  : SUCCESS"));
    }

    #[test]
    fn test_dry_run_placeholder() {
        let mut run = UpdateRun::new("db", "staging", OsFamily::Debian, at(1, 0, 0));
        let mut dry = step("STEP 1", "apt-get update", "", 0);
        dry.dry_run = true;
        run.steps.push(dry);

        let text = render(&run);
        assert!(text.contains("$ apt-get update\n[DRY-RUN] command not executed\n[exit 0]\n"));
        assert!(text.contains("Finished: N/A"));
    }
}
