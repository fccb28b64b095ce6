use crate::error::{MonitorError, Result};
use crate::notify::{Message, Sink};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Discord's per-message content limit, in characters
const CONTENT_LIMIT: usize = 2000;
const SINK_NAME: &str = "discord";

/// Discord webhook settings
#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl DiscordConfig {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self { webhook_url: webhook_url.into(), enabled: true }
    }

    /// Builder method: toggle the sink
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The webhook URL embeds its secret token
        f.debug_struct("DiscordConfig")
            .field("webhook_url", &"<redacted>")
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// Posts Markdown messages to a Discord webhook
pub struct DiscordSink {
    config: DiscordConfig,
    client: Client,
}

impl DiscordSink {
    pub fn new(config: DiscordConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| failure(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

impl Sink for DiscordSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn send(&self, message: &Message) -> Result<()> {
        let chunks = split_message(&message.render_markdown(), CONTENT_LIMIT);

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                std::thread::sleep(Duration::from_millis(500));
            }

            let response = self
                .client
                .post(&self.config.webhook_url)
                .json(&WebhookMessage { content: chunk })
                .send()
                .map_err(|e| failure(format!("Request failed: {}", e.without_url())))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(failure(format!("Webhook error ({}): {}", status, body.trim())));
            }
        }

        Ok(())
    }
}

fn failure(reason: String) -> MonitorError {
    MonitorError::Notification { sink: SINK_NAME.to_string(), reason }
}

/// Split `text` into chunks of at most `max_chars` characters, preferring line breaks
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > max_chars {
        let byte_limit = remaining.char_indices().nth(max_chars).map_or(remaining.len(), |(i, _)| i);
        let split_at = remaining[..byte_limit].rfind('\n').map_or(byte_limit, |i| i + 1);

        chunks.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_one_chunk() {
        assert_eq!(split_message("hello", CONTENT_LIMIT), vec!["hello"]);
    }

    #[test]
    fn test_prefers_line_breaks() {
        let chunks = split_message("aaaa\nbbbb\ncc\nd", 7);
        assert_eq!(chunks, vec!["aaaa\n", "bbbb\n", "cc\nd"]);
    }

    #[test]
    fn test_hard_split_is_char_safe() {
        let text = "₹".repeat(5);
        let chunks = split_message(&text, 2);

        assert_eq!(chunks, vec!["₹₹", "₹₹", "₹"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 2));
    }

    #[test]
    fn test_chunks_reassemble() {
        let text = format!("{}\n{}", "x".repeat(2500), "y".repeat(10));
        let chunks = split_message(&text, CONTENT_LIMIT);

        assert!(chunks.iter().all(|c| c.chars().count() <= CONTENT_LIMIT));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_webhook_body() {
        let json = serde_json::to_value(WebhookMessage { content: "**hi**" }).unwrap();
        assert_eq!(json, serde_json::json!({ "content": "**hi**" }));
    }

    #[test]
    fn test_debug_redacts_webhook() {
        let debug = format!("{:?}", DiscordConfig::new("https://discord.com/api/webhooks/1/secret"));
        assert!(!debug.contains("secret"));
    }
}
