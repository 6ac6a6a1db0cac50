//! Telegram Bot API transport.
//!
//! One blocking HTTP client serves both directions: outbound `sendMessage`
//! for alerts and command replies, and inbound `getUpdates` long polling for
//! the command listener. The bot token is embedded in the endpoint path and
//! must never be logged.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::notify::{NotificationRequest, NotificationSink};

/// Long-poll window requested from getUpdates, seconds.
const POLL_TIMEOUT_SECS: u64 = 10;

/// The HTTP timeout must outlast the long-poll window.
const AGENT_TIMEOUT: Duration = Duration::from_secs(POLL_TIMEOUT_SECS + 10);

pub struct TelegramClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl TelegramClient {
    /// `api_url` is the Bot API base (`https://api.telegram.org` or a local
    /// bot-api server).
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        Url::parse(api_url).with_context(|| format!("invalid bot api url '{}'", api_url))?;
        if token.trim().is_empty() {
            return Err(anyhow!("bot token must not be empty"));
        }
        let endpoint = format!("{}/bot{}", api_url.trim_end_matches('/'), token);
        let agent = ureq::AgentBuilder::new().timeout(AGENT_TIMEOUT).build();
        Ok(Self { endpoint, agent })
    }

    pub fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.endpoint);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        match self.agent.post(&url).send_json(body) {
            Ok(response) => {
                let status: ApiStatus = response
                    .into_json()
                    .context("parse sendMessage response")?;
                if !status.ok {
                    return Err(anyhow!(
                        "bot api rejected sendMessage: {}",
                        status.description.unwrap_or_default()
                    ));
                }
                Ok(())
            }
            Err(ureq::Error::Status(code, response)) => {
                let description = response
                    .into_json::<ApiStatus>()
                    .ok()
                    .and_then(|status| status.description)
                    .unwrap_or_default();
                Err(anyhow!(
                    "sendMessage failed: http {} {}",
                    code,
                    description
                ))
            }
            Err(e) => Err(e).context("deliver sendMessage"),
        }
    }

    /// Fetch pending updates at or after `offset`, long-polling the API.
    pub fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.endpoint);
        let body = serde_json::json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
        });

        let response = self
            .agent
            .post(&url)
            .send_json(body)
            .context("poll getUpdates")?;
        let updates: UpdatesResponse = response
            .into_json()
            .context("parse getUpdates response")?;
        if !updates.ok {
            return Err(anyhow!(
                "bot api rejected getUpdates: {}",
                updates.description.unwrap_or_default()
            ));
        }
        Ok(updates.result)
    }
}

/// Telegram sink for incident alerts.
pub struct TelegramSink {
    client: Arc<TelegramClient>,
}

impl TelegramSink {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

impl NotificationSink for TelegramSink {
    fn send(&self, request: &NotificationRequest) -> Result<()> {
        self.client.send_message(&request.recipient, &request.text)
    }
}

// ----------------------------------------------------------------------------
// Bot API wire types
// ----------------------------------------------------------------------------

/// Minimal `ok`/`description` envelope shared by Bot API responses.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    #[serde(default)]
    description: Option<String>,
}

/// One inbound update. Non-message updates deserialize with `message: None`
/// and are skipped by the listener.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    /// Absent for stickers, photos and other non-text messages.
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_the_token_once() {
        let client = TelegramClient::new("https://api.telegram.org/", "123:abc").unwrap();
        assert_eq!(client.endpoint, "https://api.telegram.org/bot123:abc");
    }

    #[test]
    fn invalid_api_url_is_rejected() {
        assert!(TelegramClient::new("not a url", "123:abc").is_err());
        assert!(TelegramClient::new("https://api.telegram.org", " ").is_err());
    }

    #[test]
    fn updates_parse_with_and_without_text() {
        let payload = r#"{
            "ok": true,
            "result": [
                {"update_id": 7, "message": {"chat": {"id": 99}, "text": "/start"}},
                {"update_id": 8, "message": {"chat": {"id": 99}}},
                {"update_id": 9}
            ]
        }"#;
        let parsed: UpdatesResponse = serde_json::from_str(payload).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result.len(), 3);
        assert_eq!(
            parsed.result[0].message.as_ref().unwrap().text.as_deref(),
            Some("/start")
        );
        assert!(parsed.result[1].message.as_ref().unwrap().text.is_none());
        assert!(parsed.result[2].message.is_none());
    }

    #[test]
    fn error_status_parses_description() {
        let payload = r#"{"ok": false, "description": "Unauthorized"}"#;
        let parsed: ApiStatus = serde_json::from_str(payload).unwrap();
        assert!(!parsed.ok);
        assert_eq!(parsed.description.as_deref(), Some("Unauthorized"));
    }
}
