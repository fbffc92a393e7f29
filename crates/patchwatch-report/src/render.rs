//! Report renderer
//!
//! Turns parsed log entries into the monthly [`Document`]: title, summary
//! table, then one section per run in collection order.

use chrono::NaiveDateTime;
use patchwatch_common::log_format::TIMESTAMP_FORMAT;
use patchwatch_common::Config;

use crate::collector::LogFile;
use crate::document::{palette, Document, Element, Rgb, Table, TableStyle};
use crate::parser::{parse_log, ParsedEntry};
use crate::period::ReportPeriod;

/// Package rows shown per run
pub const MAX_PACKAGE_ROWS: usize = 30;

/// Raw log lines shown per run
pub const MAX_RAW_LINES: usize = 80;

const INCH: f32 = 72.0;

/// Report-wide metadata
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub server_name: String,
    pub environment: String,
    pub period: ReportPeriod,
    pub generated: NaiveDateTime,
}

impl ReportMeta {
    pub fn new(config: &Config, period: ReportPeriod, generated: NaiveDateTime) -> Self {
        Self {
            server_name: config.server_name.clone(),
            environment: config.environment.clone(),
            period,
            generated,
        }
    }
}

/// A collected log together with its parsed facts
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub file: LogFile,
    pub parsed: ParsedEntry,
}

impl ReportEntry {
    pub fn from_file(file: LogFile) -> Self {
        let parsed = parse_log(&file.content);
        Self { file, parsed }
    }
}

/// Banner colour for a status line
pub fn status_color(status: &str) -> Rgb {
    let status = status.to_uppercase();
    if status.contains("SUCCESS") {
        palette::SUCCESS
    } else if status.contains("ERROR") || status.contains("FAIL") {
        palette::FAILURE
    } else {
        palette::WARNING
    }
}

/// Build the monthly report document
pub fn build_report(entries: &[ReportEntry], meta: &ReportMeta) -> Document {
    let mut doc = Document::new(format!(
        "Monthly Security Report - {} - {}",
        meta.server_name,
        meta.period.label()
    ));

    doc.push(Element::Title(vec![
        "Monthly Security Report".to_string(),
        meta.server_name.clone(),
    ]));
    doc.push(Element::Spacer(0.1 * INCH));

    doc.push(Element::Table(Table {
        rows: vec![
            row(&["Report Generated", &meta.generated.format(TIMESTAMP_FORMAT).to_string()]),
            row(&["Period", &meta.period.label()]),
            row(&["Environment", &meta.environment.to_uppercase()]),
            row(&["Server", &meta.server_name]),
            row(&["Total Updates", &entries.len().to_string()]),
        ],
        widths: vec![1.8 * INCH, 4.2 * INCH],
        style: TableStyle::KeyValue,
    }));
    doc.push(Element::Spacer(0.25 * INCH));

    for (index, entry) in entries.iter().enumerate() {
        push_entry(&mut doc, index + 1, entry);
    }

    doc.push(Element::Paragraph(
        "Auto-generated by Security Update Automation System".to_string(),
    ));

    doc
}

fn push_entry(doc: &mut Document, number: usize, entry: &ReportEntry) {
    let parsed = &entry.parsed;

    doc.push(Element::Heading(format!("Update #{} - {}", number, entry.file.name)));

    doc.push(Element::Banner {
        text: parsed.status.clone(),
        fill: status_color(&parsed.status),
    });
    doc.push(Element::Spacer(0.1 * INCH));

    doc.push(Element::Table(Table {
        rows: vec![row(&["Started", &parsed.started, "Finished", &parsed.finished])],
        widths: vec![0.9 * INCH, 2.1 * INCH, 0.9 * INCH, 2.1 * INCH],
        style: TableStyle::Pairs,
    }));
    doc.push(Element::Spacer(0.1 * INCH));

    if !parsed.packages.is_empty() {
        doc.push(Element::Heading("Packages Updated".to_string()));

        let mut rows = vec![row(&["Package", "Old Version", "New Version"])];
        rows.extend(
            parsed
                .packages
                .iter()
                .take(MAX_PACKAGE_ROWS)
                .map(|p| row(&[&p.name, &p.old_version, &p.new_version])),
        );

        doc.push(Element::Table(Table {
            rows,
            widths: vec![2.5 * INCH, 1.75 * INCH, 1.75 * INCH],
            style: TableStyle::Header,
        }));
        doc.push(Element::Spacer(0.1 * INCH));
    }

    if !parsed.errors.is_empty() {
        doc.push(Element::Heading("Errors / Warnings".to_string()));
        for error in &parsed.errors {
            doc.push(Element::Bullet(error.clone()));
        }
        doc.push(Element::Spacer(0.1 * INCH));
    }

    doc.push(Element::Heading("Raw Log Output".to_string()));
    let total_lines = entry.file.content.lines().count();
    for line in entry.file.content.lines().take(MAX_RAW_LINES) {
        doc.push(Element::Code(line.to_string()));
    }
    if total_lines > MAX_RAW_LINES {
        doc.push(Element::Note(format!(
            "... {} more lines truncated. See full log on disk.",
            total_lines - MAX_RAW_LINES
        )));
    }

    doc.push(Element::Spacer(0.3 * INCH));
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn meta() -> ReportMeta {
        ReportMeta {
            server_name: "web-01".to_string(),
            environment: "production".to_string(),
            period: ReportPeriod::new(2026, 2).unwrap(),
            generated: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap(),
        }
    }

    fn entry(name: &str, content: &str) -> ReportEntry {
        ReportEntry::from_file(LogFile {
            name: name.to_string(),
            content: content.to_string(),
        })
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color("SUCCESS"), palette::SUCCESS);
        assert_eq!(status_color("COMPLETED WITH ERRORS"), palette::FAILURE);
        assert_eq!(status_color("failed"), palette::FAILURE);
        assert_eq!(status_color("Unknown"), palette::WARNING);
    }

    #[test]
    fn test_summary_table() {
        let doc = build_report(&[entry("a.log", "Status : SUCCESS\n")], &meta());
        let text = doc.plain_text();

        assert!(text.starts_with("Monthly Security Report\nweb-01\n"));
        assert!(text.contains("Report Generated: 2026-03-01 06:00:00"));
        assert!(text.contains("Period: February 2026"));
        assert!(text.contains("Environment: PRODUCTION"));
        assert!(text.contains("Total Updates: 1"));
        assert!(text.contains("[SUCCESS]"));
    }

    #[test]
    fn test_optional_sections_skipped() {
        let doc = build_report(&[entry("a.log", "Status : SUCCESS\n")], &meta());
        assert_eq!(doc.headings(), vec!["Update #1 - a.log", "Raw Log Output"]);
    }

    #[test]
    fn test_package_rows_capped() {
        let content: String = (0..45).map(|i| format!("  pkg{} (1.{} => 2.{})\n", i, i, i)).collect();
        let doc = build_report(&[entry("a.log", &content)], &meta());

        let package_table = doc
            .elements
            .iter()
            .find_map(|e| match e {
                Element::Table(t) if t.style == TableStyle::Header => Some(t),
                _ => None,
            })
            .unwrap();
        assert_eq!(package_table.rows.len(), MAX_PACKAGE_ROWS + 1);
    }

    #[test]
    fn test_raw_log_truncated() {
        let content: String = (1..=100).map(|i| format!("line {}\n", i)).collect();
        let doc = build_report(&[entry("a.log", &content)], &meta());

        let code_lines = doc.elements.iter().filter(|e| matches!(e, Element::Code(_))).count();
        assert_eq!(code_lines, MAX_RAW_LINES);
        assert!(doc.plain_text().contains("... 20 more lines truncated. See full log on disk."));
    }

    #[test]
    fn test_raw_log_exactly_at_limit_has_no_note() {
        let content: String = (1..=80).map(|i| format!("line {}\n", i)).collect();
        let doc = build_report(&[entry("a.log", &content)], &meta());
        assert!(!doc.plain_text().contains("more lines truncated"));
    }

    #[test]
    fn test_footer_closes_document() {
        let doc = build_report(&[entry("a.log", "Status : SUCCESS\n")], &meta());
        assert_eq!(
            doc.elements.last(),
            Some(&Element::Paragraph(
                "Auto-generated by Security Update Automation System".to_string()
            ))
        );
    }

    #[test]
    fn test_errors_listed() {
        let doc = build_report(&[entry("a.log", "E: Failed to fetch x\n")], &meta());
        assert!(doc.headings().contains(&"Errors / Warnings"));
        assert!(doc.plain_text().contains("- E: Failed to fetch x"));
    }
}
