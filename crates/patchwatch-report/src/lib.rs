//! Patchwatch Report - Monthly security patch summary
//!
//! Pipeline: [`collector`] loads the month's logs, [`parser`] extracts the
//! facts, [`render`] lays them out as a [`document::Document`], [`pdf`]
//! writes it to disk and [`notifier`] pushes it to the chat channel.

pub mod collector;
pub mod document;
pub mod notifier;
pub mod parser;
pub mod pdf;
pub mod period;
pub mod render;
pub mod workflow;

pub use collector::{collect_logs, LogFile};
pub use document::{Document, Element};
pub use notifier::{notify_report, send_report, Delivery, NotifyError, TelegramNotifier};
pub use parser::{parse_log, PackageChange, ParsedEntry};
pub use period::ReportPeriod;
pub use render::{build_report, ReportEntry, ReportMeta};
pub use pdf::{write_pdf, RenderError};
pub use workflow::{generate_monthly_report, report_file_name, ReportOutcome};
