//! Chat notifier
//!
//! Uploads the monthly PDF to a bot-style `sendDocument` endpoint. Delivery
//! is best effort: every failure is logged and folded into [`Delivery`],
//! never returned to the caller.

use std::fs;
use std::path::Path;
use std::time::Duration;

use patchwatch_common::Config;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::period::ReportPeriod;

/// Upload timeout
pub const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("cannot read report {path}: {source}")]
    ReadReport {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    #[error("API rejected the document: {0}")]
    Rejected(String),
}

/// What happened to the report after it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { message_id: i64 },
    /// Token or chat id is empty
    NotConfigured,
    Failed(String),
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent { .. })
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Bot API client bound to one chat
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// `None` when the token or chat id is empty
    pub fn from_config(config: &Config) -> Result<Option<Self>, NotifyError> {
        if !config.notifications_enabled() {
            return Ok(None);
        }

        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;

        Ok(Some(Self {
            client,
            api_url: config.telegram_api_url.trim_end_matches('/').to_string(),
            token: config.telegram_bot_token.clone(),
            chat_id: config.telegram_chat_id.clone(),
        }))
    }

    /// Upload `path` as a PDF document; returns the message id
    pub fn send_document(&self, path: &Path, caption: &str) -> Result<i64, NotifyError> {
        let bytes = fs::read(path).map_err(|source| NotifyError::ReadReport {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.pdf".to_string());

        let document = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .text("parse_mode", "Markdown")
            .part("document", document);

        let url = format!("{}/bot{}/sendDocument", self.api_url, self.token);
        let response = self.client.post(url).multipart(form).send()?;

        // Error bodies carry the description, so parse whatever came back
        let status = response.status();
        let body = response.text()?;
        let parsed: SendResponse = serde_json::from_str(&body)
            .map_err(|e| NotifyError::InvalidResponse(format!("HTTP {}: {}", status, e)))?;

        if !parsed.ok {
            return Err(NotifyError::Rejected(
                parsed.description.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        parsed
            .result
            .map(|message| message.message_id)
            .ok_or_else(|| NotifyError::InvalidResponse("missing result.message_id".to_string()))
    }
}

/// Markdown caption sent with the document
pub fn build_caption(config: &Config, period: &ReportPeriod) -> String {
    format!(
        "\u{1f512} *Security Update Report - {}*\n\n\
         Server: {}\n\
         Environment: {}\n\n\
         _Auto-generated by Security Update Automation System_",
        period.label(),
        config.server_name,
        config.environment
    )
}

/// Push the report to the configured chat
pub fn notify_report(config: &Config, path: &Path, period: &ReportPeriod) -> Delivery {
    let notifier = match TelegramNotifier::from_config(config) {
        Ok(Some(notifier)) => notifier,
        Ok(None) => {
            info!("Notifications not configured - skipping");
            return Delivery::NotConfigured;
        }
        Err(e) => {
            warn!("Notification send failed: {}", e);
            return Delivery::Failed(e.to_string());
        }
    };

    match notifier.send_document(path, &build_caption(config, period)) {
        Ok(message_id) => {
            info!("Notification: report sent (message_id={})", message_id);
            Delivery::Sent { message_id }
        }
        Err(e) => {
            warn!("Notification send failed: {}", e);
            Delivery::Failed(e.to_string())
        }
    }
}

/// `true` only when the document was accepted
pub fn send_report(config: &Config, path: &Path, period: &ReportPeriod) -> bool {
    notify_report(config, path, period).is_sent()
}
