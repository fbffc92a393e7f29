//! Configuration loader
//!
//! Settings come from a key=value env file (default
//! `/etc/security-updater/config.env`). Every option resolves through the
//! same chain: env file, then process environment, then built-in default.
//! A missing file is never an error.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Default location of the env file
pub const DEFAULT_CONFIG_FILE: &str = "/etc/security-updater/config.env";

/// Option keys, shared between the env file and the process environment
pub const LOG_DIR: &str = "LOG_DIR";
pub const REPORT_DIR: &str = "REPORT_DIR";
pub const SERVER_NAME: &str = "SERVER_NAME";
pub const ENVIRONMENT: &str = "ENVIRONMENT";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const TELEGRAM_API_URL: &str = "TELEGRAM_API_URL";

/// Option table: key and the value used when neither source sets it
pub const OPTIONS: &[(&str, &str)] = &[
    (LOG_DIR, "/var/log/security-updates"),
    (REPORT_DIR, "/var/lib/security-updates/reports"),
    (SERVER_NAME, "EC2-Server"),
    (ENVIRONMENT, "production"),
    (TELEGRAM_BOT_TOKEN, ""),
    (TELEGRAM_CHAT_ID, ""),
    (TELEGRAM_API_URL, "https://api.telegram.org"),
];

/// Process configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where the updater writes run logs and the reporter reads them
    pub log_dir: PathBuf,
    /// Where monthly reports are written
    pub report_dir: PathBuf,
    /// Display name used in log headers, report titles and file names
    pub server_name: String,
    /// Environment label (production, staging, ...)
    pub environment: String,
    /// Chat bot token; empty disables notifications
    pub telegram_bot_token: String,
    /// Target chat id; empty disables notifications
    pub telegram_chat_id: String,
    /// Base URL of the bot API
    pub telegram_api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(&HashMap::new(), |_| None)
    }
}

impl Config {
    /// Load configuration from `path` (or the default file) merged with
    /// the process environment
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let file_values = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Loaded config file {}", path.display());
                parse_env_file(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}, using environment", path.display());
                HashMap::new()
            }
            Err(e) => {
                warn!("Could not read config file {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self::resolve(&file_values, |key| std::env::var(key).ok())
    }

    /// Build a config from parsed file values and an environment lookup
    pub fn resolve<F>(file_values: &HashMap<String, String>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut resolved: HashMap<&str, String> = HashMap::new();
        for &(key, default) in OPTIONS {
            let value = file_values
                .get(key)
                .cloned()
                .or_else(|| env(key))
                .unwrap_or_else(|| default.to_string());
            resolved.insert(key, value);
        }

        let mut take = |key: &str| resolved.remove(key).unwrap_or_default();

        Self {
            log_dir: PathBuf::from(take(LOG_DIR)),
            report_dir: PathBuf::from(take(REPORT_DIR)),
            server_name: take(SERVER_NAME),
            environment: take(ENVIRONMENT),
            telegram_bot_token: take(TELEGRAM_BOT_TOKEN),
            telegram_chat_id: take(TELEGRAM_CHAT_ID),
            telegram_api_url: take(TELEGRAM_API_URL),
        }
    }

    /// Both chat credentials are present
    pub fn notifications_enabled(&self) -> bool {
        !self.telegram_bot_token.is_empty() && !self.telegram_chat_id.is_empty()
    }
}

/// Parse `KEY=value` lines, tolerating comments, `export` and quoting
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        values.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    values
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
