//! Patchwatch Common - Shared configuration and log vocabulary
//!
//! Both the updater and the monthly reporter depend on this crate. The
//! text format in [`log_format`] is the only contract between them: the
//! updater writes it, the reporter parses it back.

pub mod config;
pub mod log_format;
pub mod logging;
pub mod text;

pub use config::{Config, DEFAULT_CONFIG_FILE};
