//! Update log parser
//!
//! Pure function from log text to [`ParsedEntry`]. Extraction is an ordered
//! list of independent rules; each one falls back to a safe default, so
//! truncated or foreign text never fails to parse.

use once_cell::sync::Lazy;
use patchwatch_common::log_format::{LABEL_FINISHED, LABEL_STARTED, LABEL_STATUS};
use regex::Regex;

/// Placeholder for a missing timestamp
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a missing status line
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Error lines kept per log
pub const MAX_ERROR_LINES: usize = 10;

/// apt download progress lines; they mention mirrors, not failures
pub const PROGRESS_PREFIX: &str = "Get:";

static STARTED_RE: Lazy<Regex> = Lazy::new(|| field_regex(LABEL_STARTED));
static FINISHED_RE: Lazy<Regex> = Lazy::new(|| field_regex(LABEL_FINISHED));
static STATUS_RE: Lazy<Regex> = Lazy::new(|| field_regex(LABEL_STATUS));

// "  libssl3 (3.0.2-0ubuntu1.10 => 3.0.2-0ubuntu1.12)"
static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]+([\w.\-]+)[ \t]+\(([\w.~+:\-]+)[ \t]+=>[ \t]+([\w.~+:\-]+)\)")
        .expect("package pattern is valid")
});

static ERROR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(error|failed|fail)\b").expect("error pattern is valid"));

fn field_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?m)^[ \t]*{}[ \t]*:[ \t]*(.+)$", regex::escape(label)))
        .expect("field pattern is valid")
}

/// One package version change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageChange {
    pub name: String,
    pub old_version: String,
    pub new_version: String,
}

/// Structured facts extracted from one log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub started: String,
    pub finished: String,
    pub status: String,
    /// Every change, in file order
    pub packages: Vec<PackageChange>,
    /// First [`MAX_ERROR_LINES`] error-looking lines, in file order
    pub errors: Vec<String>,
}

/// Parse one log's text
pub fn parse_log(content: &str) -> ParsedEntry {
    ParsedEntry {
        started: extract_field(&STARTED_RE, content).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        finished: extract_field(&FINISHED_RE, content).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        status: extract_field(&STATUS_RE, content).unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        packages: extract_packages(content),
        errors: extract_errors(content),
    }
}

/// First non-empty value of a `Label : value` line
fn extract_field(pattern: &Regex, content: &str) -> Option<String> {
    pattern
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn extract_packages(content: &str) -> Vec<PackageChange> {
    PACKAGE_RE
        .captures_iter(content)
        .map(|caps| PackageChange {
            name: caps[1].to_string(),
            old_version: caps[2].to_string(),
            new_version: caps[3].to_string(),
        })
        .collect()
}

pub fn extract_errors(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with(PROGRESS_PREFIX))
        .filter(|line| ERROR_RE.is_match(line))
        .take(MAX_ERROR_LINES)
        .map(str::to_string)
        .collect()
}
