use crate::error::{MonitorError, Result};
use crate::notify::{Message, Sink};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SINK_NAME: &str = "telegram";

/// Telegram bot settings
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Overridable for tests and self-hosted bot API servers
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_enabled() -> bool {
    true
}

fn default_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self { bot_token: bot_token.into(), chat_id: chat_id.into(), enabled: true, api_base: default_api_base() }
    }

    /// Builder method: toggle the sink
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method: point at another bot API server
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base.trim_end_matches('/'), self.bot_token)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("enabled", &self.enabled)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Sends messages through the Telegram Bot API in HTML parse mode
pub struct TelegramSink {
    config: TelegramConfig,
    client: Client,
}

impl TelegramSink {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| failure(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

impl Sink for TelegramSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn send(&self, message: &Message) -> Result<()> {
        let text = message.render_html();
        let request = SendMessageRequest {
            chat_id: &self.config.chat_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.config.send_message_url())
            .json(&request)
            .send()
            .map_err(|e| failure(format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        let body: Option<TelegramResponse> = response.json().ok();
        match body {
            Some(TelegramResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(TelegramResponse { description, .. }) => Err(failure(format!(
                "API error ({}): {}",
                status,
                description.unwrap_or_else(|| "no description".to_string())
            ))),
            None => Err(failure(format!("API error ({})", status))),
        }
    }
}

fn failure(reason: String) -> MonitorError {
    MonitorError::Notification { sink: SINK_NAME.to_string(), reason }
}
