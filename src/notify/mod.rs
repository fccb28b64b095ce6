//! Notification sinks and message formatting
//!
//! A [`Message`] is channel-neutral; each [`Sink`] renders it in the markup its
//! transport understands (HTML for Telegram, Markdown for Discord).

pub mod discord;
pub mod dispatcher;
pub mod telegram;

pub use discord::{DiscordConfig, DiscordSink};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use telegram::{TelegramConfig, TelegramSink};

use crate::error::Result;
use crate::record::{Record, ValueRange};
use chrono::{DateTime, TimeZone};
use std::fmt::Write;

/// An external channel that accepts text notifications
pub trait Sink {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn send(&self, message: &Message) -> Result<()>;
}

/// Channel-neutral notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub headline: String,

    /// Labelled lines, in display order
    pub fields: Vec<(String, String)>,

    pub footer: Option<String>,
}

impl Message {
    pub fn new(headline: impl Into<String>) -> Self {
        Self { headline: headline.into(), fields: Vec::new(), footer: None }
    }

    /// Builder method: append a labelled line
    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((label.into(), value.into()));
        self
    }

    /// Builder method: set the closing line
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Render for Telegram's HTML parse mode
    pub fn render_html(&self) -> String {
        let mut out = format!("<b>{}</b>\n", escape_html(&self.headline));
        if !self.fields.is_empty() {
            out.push('\n');
        }
        for (label, value) in &self.fields {
            let _ = writeln!(out, "<b>{}:</b> {}", escape_html(label), escape_html(value));
        }
        if let Some(footer) = &self.footer {
            let _ = write!(out, "\n{}", escape_html(footer));
        }
        out.trim_end().to_string()
    }

    /// Render as Markdown
    pub fn render_markdown(&self) -> String {
        let mut out = format!("**{}**\n", self.headline);
        if !self.fields.is_empty() {
            out.push('\n');
        }
        for (label, value) in &self.fields {
            let _ = writeln!(out, "**{}:** {}", label, value);
        }
        if let Some(footer) = &self.footer {
            let _ = write!(out, "\n{}", footer);
        }
        out.trim_end().to_string()
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Summary sent before the per-record messages of a cycle
pub fn header_message<Tz: TimeZone>(count: usize, at: &DateTime<Tz>) -> Message
where
    Tz::Offset: std::fmt::Display,
{
    let noun = if count == 1 { "listing" } else { "listings" };
    Message::new(format!("LISTING ALERT - {} new {}", count, noun))
        .field("Checked", at.format("%d-%b-%Y %H:%M").to_string())
}

/// One message per newly published record
pub fn record_message(record: &Record, listing_url: &str) -> Message {
    Message::new("NEW LISTING")
        .field("Listing", &record.name)
        .field("Package", format!("{} LPA", range_text(&record.package, "N/A")))
        .field("Stipend", range_text(&record.stipend, "0"))
        .field("Type", or_na(&record.placement_type))
        .field("Location", record.location.as_deref().unwrap_or("Not specified"))
        .field("Registration start", or_na(&record.registration_open))
        .field("Registration end", or_na(&record.registration_close))
        .field("Academic year", or_na(&record.academic_year))
        .footer(format!("Apply: {}", listing_url))
}

fn range_text(range: &ValueRange, missing: &str) -> String {
    format!(
        "₹{} - ₹{}",
        range.min.as_deref().unwrap_or(missing),
        range.max.as_deref().unwrap_or(missing)
    )
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn acme() -> Record {
        let mut record = Record::new("Acme & Sons", "01-Jan-2024");
        record.registration_close = "05-Jan-2024".to_string();
        record.package = ValueRange::from_text("6", "12");
        record.stipend = ValueRange { min: None, max: Some("25000".to_string()) };
        record.placement_type = "Internship".to_string();
        record
    }

    #[test]
    fn test_record_message_fields() {
        let message = record_message(&acme(), "https://portal.example/company-dashboard");

        assert_eq!(message.headline, "NEW LISTING");
        assert!(message.fields.contains(&("Package".to_string(), "₹6 - ₹12 LPA".to_string())));
        assert!(message.fields.contains(&("Stipend".to_string(), "₹0 - ₹25000".to_string())));
        assert!(message.fields.contains(&("Location".to_string(), "Not specified".to_string())));
        assert!(message.fields.contains(&("Academic year".to_string(), "N/A".to_string())));
        assert_eq!(message.footer.as_deref(), Some("Apply: https://portal.example/company-dashboard"));
    }

    #[test]
    fn test_header_message() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();

        let message = header_message(3, &at);
        assert_eq!(message.headline, "LISTING ALERT - 3 new listings");
        assert_eq!(message.fields, vec![("Checked".to_string(), "09-Mar-2024 14:05".to_string())]);

        assert_eq!(header_message(1, &at).headline, "LISTING ALERT - 1 new listing");
    }

    #[test]
    fn test_render_html_escapes_values() {
        let html = record_message(&acme(), "https://x").render_html();

        assert!(html.starts_with("<b>NEW LISTING</b>\n\n"));
        assert!(html.contains("<b>Listing:</b> Acme &amp; Sons"));
        assert!(html.ends_with("Apply: https://x"));
    }

    #[test]
    fn test_render_markdown() {
        let markdown = Message::new("Monitor started").field("Interval", "30 minutes").render_markdown();
        assert_eq!(markdown, "**Monitor started**\n\n**Interval:** 30 minutes");
    }

    #[test]
    fn test_render_headline_only() {
        assert_eq!(Message::new("Monitor stopped").render_html(), "<b>Monitor stopped</b>");
    }
}
