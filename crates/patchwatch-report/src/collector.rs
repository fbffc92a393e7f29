//! Log collection
//!
//! Loads every run log of one month, oldest first. Unreadable files stay in
//! the batch with a visible placeholder so the report still lists them.

use std::fs;
use std::path::Path;

use patchwatch_common::log_format::is_month_log;
use patchwatch_common::text::decode_best_effort;
use tracing::{debug, info, warn};

/// One log file loaded from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// File name without directory
    pub name: String,
    pub content: String,
}

/// Collect `(name, content)` for every log of `year`/`month` in `dir`
///
/// Names embed a zero-padded timestamp, so sorting by name is chronological.
pub fn collect_logs(dir: &Path, year: i32, month: u32) -> Vec<LogFile> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", dir.display(), e);
            info!("Found 0 log(s) for {:04}-{:02}", year, month);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_month_log(name, year, month))
        .collect();
    names.sort();

    info!("Found {} log(s) for {:04}-{:02}", names.len(), year, month);

    names
        .into_iter()
        .map(|name| {
            let path = dir.join(&name);
            let content = match fs::read(&path) {
                Ok(bytes) => decode_best_effort(&bytes),
                Err(e) => {
                    warn!("Could not read {}: {}", path.display(), e);
                    format!("[ERROR reading file: {}]", e)
                }
            };
            LogFile { name, content }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(collect_logs(&temp_dir.path().join("nope"), 2026, 2).is_empty());
    }

    #[test]
    fn test_empty_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("security-update_20260301_010000.log"), "march").unwrap();
        assert!(collect_logs(temp_dir.path(), 2026, 2).is_empty());
    }

    #[test]
    fn test_filters_and_sorts_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("security-update_20260215_030000.log"), "second").unwrap();
        fs::write(dir.join("security-update_20260201_030000.log"), "first").unwrap();
        fs::write(dir.join("security-update_20260228_235959.log"), "third").unwrap();
        fs::write(dir.join("security-update_20260110_030000.log"), "january").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let logs = collect_logs(dir, 2026, 2);
        let contents: Vec<&str> = logs.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(logs[0].name, "security-update_20260201_030000.log");
    }

    #[test]
    fn test_invalid_bytes_are_dropped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("security-update_20260201_030000.log"),
            b"Status  : SUCCESS\xff\n",
        )
        .unwrap();

        let logs = collect_logs(temp_dir.path(), 2026, 2);
        assert_eq!(logs[0].content, "Status  : SUCCESS\n");
    }

    #[test]
    fn test_unreadable_file_gets_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        // A directory with a log-like name cannot be read as a file
        fs::create_dir(temp_dir.path().join("security-update_20260201_030000.log")).unwrap();
        fs::write(temp_dir.path().join("security-update_20260202_030000.log"), "ok").unwrap();

        let logs = collect_logs(temp_dir.path(), 2026, 2);
        assert_eq!(logs.len(), 2);
        assert!(logs[0].content.starts_with("[ERROR reading file:"));
        assert_eq!(logs[1].content, "ok");
    }
}
