use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::notify::{DiscordSink, Message, Sink, TelegramSink, header_message, record_message};
use crate::record::Record;
use chrono::{DateTime, Local};
use std::time::Duration;

/// Longest error text forwarded in an error notice
const ERROR_NOTICE_LIMIT: usize = 200;

/// Delivery summary for one batch of new records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// At least one sink accepted the header
    pub header_accepted: bool,

    /// Records accepted by at least one sink
    pub delivered: usize,

    /// Records no sink accepted
    pub failed: usize,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.header_accepted
    }
}

/// Fans messages out to every configured sink, independently
pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink + Send>>,
    send_pause: Duration,
    listing_url: String,
}

impl Dispatcher {
    pub fn new(listing_url: impl Into<String>, send_pause: Duration) -> Self {
        Self { sinks: Vec::new(), send_pause, listing_url: listing_url.into() }
    }

    /// Build a dispatcher holding every enabled sink of `config`
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let mut dispatcher = Self::new(&config.portal.listing_url, config.timings.send_pause);

        if let Some(telegram) = config.telegram.as_ref().filter(|t| t.enabled) {
            dispatcher = dispatcher.with_sink(TelegramSink::new(telegram.clone())?);
            log::info!("Telegram notifications enabled");
        }
        if let Some(discord) = config.discord.as_ref().filter(|d| d.enabled) {
            dispatcher = dispatcher.with_sink(DiscordSink::new(discord.clone())?);
            log::info!("Discord notifications enabled");
        }

        Ok(dispatcher)
    }

    /// Builder method: add a sink
    pub fn with_sink(mut self, sink: impl Sink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Send the header and then one message per record.
    ///
    /// Every message goes to every sink; a failure is logged and never stops
    /// the remaining messages or sinks. Nothing is retried.
    pub fn dispatch(&self, records: &[Record], at: &DateTime<Local>) -> DispatchReport {
        let mut report = DispatchReport::default();
        if records.is_empty() {
            return report;
        }

        report.header_accepted = self.broadcast(&header_message(records.len(), at)) > 0;

        for record in records {
            std::thread::sleep(self.send_pause);
            if self.broadcast(&record_message(record, &self.listing_url)) > 0 {
                report.delivered += 1;
                log::info!("Notified about: {}", record.name);
            } else {
                report.failed += 1;
                log::warn!("No sink accepted the notice for {}", record.name);
            }
        }

        report
    }

    /// Send a service notice; returns whether any sink accepted it
    pub fn announce(&self, message: &Message) -> bool {
        self.broadcast(message) > 0
    }

    /// Notice sent when the service starts polling
    pub fn announce_started(&self, interval: Duration, at: &DateTime<Local>) -> bool {
        let minutes = (interval.as_secs() as f64 / 60.0).round() as u64;
        self.announce(
            &Message::new("Listing monitor started")
                .field("Monitoring", &self.listing_url)
                .field("Check interval", format!("{} minutes", minutes))
                .footer(format!("Service started at {}", at.format("%d-%b-%Y %H:%M"))),
        )
    }

    pub fn announce_stopped(&self) -> bool {
        self.announce(&Message::new("Listing monitor stopped"))
    }

    /// Best-effort notice about a failed cycle
    pub fn announce_error(&self, error: &MonitorError) -> bool {
        let text: String = error.to_string().chars().take(ERROR_NOTICE_LIMIT).collect();
        self.announce(&Message::new("Listing monitor error").field("Error", text))
    }

    /// Send to all sinks, returning how many accepted
    fn broadcast(&self, message: &Message) -> usize {
        if self.sinks.is_empty() {
            log::info!("No sink configured, dropping notice: {}", message.headline);
            return 0;
        }

        self.sinks
            .iter()
            .filter(|sink| match sink.send(message) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("Failed to send '{}' via {}: {}", message.headline, sink.name(), e);
                    false
                }
            })
            .count()
    }
}
