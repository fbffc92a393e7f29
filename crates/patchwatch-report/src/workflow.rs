//! Monthly report workflow: collect, parse, render, write, notify

use std::path::PathBuf;

use chrono::Local;
use patchwatch_common::Config;
use tracing::{info, warn};

use crate::collector::collect_logs;
use crate::notifier::{notify_report, Delivery};
use crate::pdf::{write_pdf, RenderError};
use crate::period::ReportPeriod;
use crate::render::{build_report, ReportEntry, ReportMeta};

/// Result of a run that produced a report
#[derive(Debug)]
pub struct ReportOutcome {
    pub path: PathBuf,
    /// Number of runs covered
    pub entries: usize,
    pub delivery: Delivery,
}

/// `security_monthly_{YYYYMM}_{server}.pdf`
pub fn report_file_name(period: &ReportPeriod, server_name: &str) -> String {
    let server: String = server_name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    format!("security_monthly_{}_{}.pdf", period.file_label(), server)
}

/// Build, write and send the report for `period`
///
/// `Ok(None)` means there were no logs for the month. A failed notification
/// is reported in [`ReportOutcome::delivery`], never as an error.
pub fn generate_monthly_report(
    config: &Config,
    period: ReportPeriod,
) -> Result<Option<ReportOutcome>, RenderError> {
    let logs = collect_logs(&config.log_dir, period.year(), period.month());
    if logs.is_empty() {
        warn!("No logs found for {}. Nothing to report.", period.iso());
        return Ok(None);
    }

    let entries: Vec<ReportEntry> = logs.into_iter().map(ReportEntry::from_file).collect();
    let meta = ReportMeta::new(config, period, Local::now().naive_local());
    let document = build_report(&entries, &meta);

    let path = config
        .report_dir
        .join(report_file_name(&period, &config.server_name));
    write_pdf(&document, &path)?;
    info!("Report written: {} ({} update(s))", path.display(), entries.len());

    let delivery = notify_report(config, &path, &period);

    Ok(Some(ReportOutcome {
        path,
        entries: entries.len(),
        delivery,
    }))
}
