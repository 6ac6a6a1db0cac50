//! Alert notification delivery.
//!
//! The dispatcher hands a [`NotificationRequest`] to a [`NotificationSink`]
//! after a gate-pass. Delivery is best-effort and at-most-once: a failed send
//! is logged and never retried, because the cooldown window was already
//! consumed when the gate fired and a retry could re-order or duplicate
//! alerts.
//!
//! Sinks:
//! - `TelegramSink`: Telegram Bot API over blocking HTTP
//! - `LogSink`: log-only delivery for stub deployments and tests

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

pub mod commands;
pub mod telegram;

pub use commands::CommandListener;
pub use telegram::{TelegramClient, TelegramSink};

/// A ready-to-send alert. Created only on a gate-pass; consumed exactly once.
#[derive(Clone, Debug)]
pub struct NotificationRequest {
    /// Chat identifier of the configured recipient.
    pub recipient: String,
    pub text: String,
    pub detected_at: SystemTime,
}

impl NotificationRequest {
    /// Render the incident alert for a detection observed at `detected_at`.
    pub fn incident(recipient: &str, detected_at: SystemTime, confidence: f32) -> Self {
        let text = format!(
            "\u{1F6A8} Incident detected by the cabin camera at {} UTC (confidence {:.2})",
            format_utc_time(detected_at),
            confidence
        );
        Self {
            recipient: recipient.to_string(),
            text,
            detected_at,
        }
    }
}

/// Delivery seam consumed by the dispatcher.
pub trait NotificationSink: Send + Sync {
    fn send(&self, request: &NotificationRequest) -> Result<()>;
}

/// Log-only sink.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send(&self, request: &NotificationRequest) -> Result<()> {
        log::info!("alert for {}: {}", request.recipient, request.text);
        Ok(())
    }
}

/// `HH:MM:SS` wall-clock rendering of a timestamp, UTC.
fn format_utc_time(at: SystemTime) -> String {
    let secs = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
