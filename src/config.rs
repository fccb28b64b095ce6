//! Monitor configuration
//!
//! Built once at process start and handed down by reference; nothing in the
//! crate reads the environment on its own.

use crate::browser::LaunchOptions;
use crate::error::{MonitorError, Result};
use crate::notify::{DiscordConfig, TelegramConfig};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// What to conclude when the post-login URL carries no known marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginVerification {
    /// Treat the session as authenticated anyway; the portal often keeps the login URL
    #[default]
    Optimistic,

    /// Fail the login
    Strict,
}

/// Portal location and credentials
#[derive(Clone)]
pub struct PortalConfig {
    pub login_url: String,

    /// Page holding the listing table
    pub listing_url: String,

    pub username: String,
    pub password: String,

    /// URL substrings that indicate the post-login area (matched case-insensitively)
    pub post_login_markers: Vec<String>,

    pub login_verification: LoginVerification,
}

impl PortalConfig {
    pub fn new(
        login_url: impl Into<String>,
        listing_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            login_url: login_url.into(),
            listing_url: listing_url.into(),
            username: username.into(),
            password: password.into(),
            post_login_markers: vec!["dashboard".to_string()],
            login_verification: LoginVerification::Optimistic,
        }
    }

    /// Builder method: set the login verification policy
    pub fn login_verification(mut self, policy: LoginVerification) -> Self {
        self.login_verification = policy;
        self
    }
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("login_url", &self.login_url)
            .field("listing_url", &self.listing_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("post_login_markers", &self.post_login_markers)
            .field("login_verification", &self.login_verification)
            .finish()
    }
}

/// Bounded waits used while driving the page. Each applies per wait, not per cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    /// Upper bound for the login form to render
    pub render_timeout: Duration,

    /// Pause after opening the login page
    pub initial_settle: Duration,

    /// Pause after submitting credentials
    pub submit_settle: Duration,

    /// Pause after (re)opening the listing page
    pub listing_settle: Duration,

    /// Pause after opening a record's detail view
    pub detail_settle: Duration,

    /// Pause between scroll steps
    pub scroll_pause: Duration,

    /// Pause between outgoing notifications
    pub send_pause: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            render_timeout: Duration::from_secs(15),
            initial_settle: Duration::from_secs(3),
            submit_settle: Duration::from_secs(5),
            listing_settle: Duration::from_secs(2),
            detail_settle: Duration::from_secs(2),
            scroll_pause: Duration::from_secs(1),
            send_pause: Duration::from_millis(500),
        }
    }
}

impl Timings {
    /// No waiting at all
    pub fn immediate() -> Self {
        Self {
            render_timeout: Duration::ZERO,
            initial_settle: Duration::ZERO,
            submit_settle: Duration::ZERO,
            listing_settle: Duration::ZERO,
            detail_settle: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            send_pause: Duration::ZERO,
        }
    }
}

/// Labels shown on the detail view, in extraction order
#[derive(Debug, Clone, PartialEq)]
pub struct DetailLabels {
    pub max_stipend: String,
    pub min_stipend: String,
    pub location: String,
}

impl Default for DetailLabels {
    fn default() -> Self {
        Self {
            max_stipend: "Max Stipend".to_string(),
            min_stipend: "Min Stipend".to_string(),
            location: "Job Locations".to_string(),
        }
    }
}

/// Harvester limits and switches
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    /// Hard cap on scroll steps in case the page height never settles
    pub max_scroll_rounds: usize,

    /// Visit each record's detail view for stipend and location
    pub enrich_details: bool,

    pub detail_labels: DetailLabels,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self { max_scroll_rounds: 50, enrich_details: true, detail_labels: DetailLabels::default() }
    }
}

/// Full monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub portal: PortalConfig,
    pub timings: Timings,
    pub harvest: HarvestConfig,

    /// Delay between the end of one cycle and the start of the next
    pub poll_interval: Duration,

    /// Where the baseline snapshot is persisted
    pub data_file: PathBuf,

    pub launch: LaunchOptions,

    pub telegram: Option<TelegramConfig>,
    pub discord: Option<DiscordConfig>,
}

impl MonitorConfig {
    pub fn new(portal: PortalConfig) -> Self {
        Self {
            portal,
            timings: Timings::default(),
            harvest: HarvestConfig::default(),
            poll_interval: Duration::from_secs(30 * 60),
            data_file: PathBuf::from("known_listings.json"),
            launch: LaunchOptions::default(),
            telegram: None,
            discord: None,
        }
    }

    /// Builder method: set poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Builder method: set baseline file
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }

    /// Builder method: set wait timings
    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Builder method: set browser launch options
    pub fn launch(mut self, launch: LaunchOptions) -> Self {
        self.launch = launch;
        self
    }

    /// Builder method: configure the Telegram sink
    pub fn telegram(mut self, telegram: TelegramConfig) -> Self {
        self.telegram = Some(telegram);
        self
    }

    /// Builder method: configure the Discord sink
    pub fn discord(mut self, discord: DiscordConfig) -> Self {
        self.discord = Some(discord);
        self
    }

    /// Whether any notification sink is configured and enabled
    pub fn has_enabled_sink(&self) -> bool {
        self.telegram.as_ref().is_some_and(|t| t.enabled) || self.discord.as_ref().is_some_and(|d| d.enabled)
    }

    /// Reject configurations the monitor cannot run with
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("login URL", &self.portal.login_url),
            ("listing URL", &self.portal.listing_url),
            ("username", &self.portal.username),
            ("password", &self.portal.password),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(MonitorError::Config(format!("{} must not be empty", name)));
            }
        }

        if self.poll_interval.is_zero() {
            return Err(MonitorError::Config("poll interval must be at least one second".to_string()));
        }

        if let Some(telegram) = self.telegram.as_ref().filter(|t| t.enabled) {
            if telegram.bot_token.is_empty() || telegram.chat_id.is_empty() {
                return Err(MonitorError::Config("Telegram is enabled but token or chat id is missing".to_string()));
            }
        }

        if let Some(discord) = self.discord.as_ref().filter(|d| d.enabled) {
            if discord.webhook_url.is_empty() {
                return Err(MonitorError::Config("Discord is enabled but the webhook URL is missing".to_string()));
            }
        }

        if !self.has_enabled_sink() {
            log::warn!("No notification sink enabled; new listings will only be logged");
        }

        Ok(())
    }
}
