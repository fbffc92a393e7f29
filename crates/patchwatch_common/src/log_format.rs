//! Update log format
//!
//! One run writes one plain-text file. The reporter reads these files back
//! with pattern matching, so the labels and separators here must stay in
//! sync with what the parser expects.
//!
//! Example:
//!
//! ```text
//! ======================================================================
//! Security Update Log
//! Server      : web-01
//! Environment : production
//! OS Family   : debian
//! Started     : 2026-02-01 03:00:00
//! ======================================================================
//!
//! **********************************************************************
//! STEP 1: Update package index (apt-get update)
//! **********************************************************************
//!
//! $ apt-get update
//! ...
//! [exit 0]
//!
//!
//! ======================================================================
//! Status  : SUCCESS
//! Finished: 2026-02-01 03:04:12
//! ======================================================================
//! ```

use chrono::NaiveDateTime;

/// Header and footer separator
pub const SEPARATOR: &str = "======================================================================";

/// Step banner separator
pub const STEP_SEPARATOR: &str = "**********************************************************************";

/// First line inside the header block
pub const LOG_TITLE: &str = "Security Update Log";

/// Field labels the parser extracts
pub const LABEL_STARTED: &str = "Started";
pub const LABEL_FINISHED: &str = "Finished";
pub const LABEL_STATUS: &str = "Status";

/// Footer status when every step exited 0
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Footer status when at least one step failed
pub const STATUS_WITH_ERRORS: &str = "COMPLETED WITH ERRORS";

/// Timestamp format inside log files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format embedded in log file names (second resolution)
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Log file name prefix
pub const LOG_FILE_PREFIX: &str = "security-update_";

/// Log file name extension
pub const LOG_FILE_EXTENSION: &str = ".log";

/// Output directory used by dry runs instead of the configured log dir
pub const DRY_RUN_DIR: &str = "/tmp/security-updates-dryrun";

/// File name for a run started at `started`
pub fn log_file_name(started: &NaiveDateTime) -> String {
    format!(
        "{}{}{}",
        LOG_FILE_PREFIX,
        started.format(FILE_TIMESTAMP_FORMAT),
        LOG_FILE_EXTENSION
    )
}

/// File name prefix shared by every log of one month
pub fn month_prefix(year: i32, month: u32) -> String {
    format!("{}{:04}{:02}", LOG_FILE_PREFIX, year, month)
}

/// Whether `file_name` is a run log for the given month
pub fn is_month_log(file_name: &str, year: i32, month: u32) -> bool {
    file_name.starts_with(&month_prefix(year, month)) && file_name.ends_with(LOG_FILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_separators() {
        assert_eq!(SEPARATOR.len(), 70);
        assert!(SEPARATOR.chars().all(|c| c == '='));
        assert_eq!(STEP_SEPARATOR.len(), 70);
        assert!(STEP_SEPARATOR.chars().all(|c| c == '*'));
    }

    #[test]
    fn test_log_file_name() {
        let started = NaiveDate::from_ymd_opt(2026, 2, 3)
            .unwrap()
            .and_hms_opt(4, 5, 6)
            .unwrap();
        assert_eq!(log_file_name(&started), "security-update_20260203_040506.log");
    }

    #[test]
    fn test_is_month_log() {
        assert!(is_month_log("security-update_20260203_040506.log", 2026, 2));
        assert!(!is_month_log("security-update_20260303_040506.log", 2026, 2));
        assert!(!is_month_log("security-update_20260203_040506.txt", 2026, 2));
        assert!(!is_month_log("other_20260203_040506.log", 2026, 2));
    }
}
