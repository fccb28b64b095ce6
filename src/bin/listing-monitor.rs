//! Listing monitor service
//!
//! Polls the portal's listing dashboard and sends a notification for every
//! newly published listing. Every option can also be set through the
//! environment variable named in `--help`.

use anyhow::Context;
use clap::{ArgAction, Parser};
use listing_monitor::{
    ChromeLauncher, DiscordConfig, Dispatcher, JsonFileStore, LaunchOptions, LoginVerification, Monitor,
    MonitorConfig, PortalConfig, Scheduler, StopHandle, TelegramConfig, stop_channel,
};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// Listing page used when none is configured, relative to the portal URL
const DEFAULT_LISTING_PATH: &str = "company-dashboard";

#[derive(Parser)]
#[command(name = "listing-monitor")]
#[command(version)]
#[command(about = "Sends alerts for newly published portal listings", long_about = None)]
struct Cli {
    /// Login page of the portal
    #[arg(long, env = "PORTAL_URL")]
    portal_url: String,

    /// Listing dashboard (default: <PORTAL_URL>/company-dashboard)
    #[arg(long, env = "PORTAL_LISTING_URL")]
    listing_url: Option<String>,

    #[arg(long, env = "PORTAL_USERNAME")]
    username: String,

    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    password: String,

    /// Seconds between checks
    #[arg(long, env = "CHECK_INTERVAL", default_value_t = 1800)]
    interval: u64,

    /// Where known listings are stored between checks
    #[arg(long, env = "DATA_FILE", default_value = "known_listings.json")]
    data_file: PathBuf,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,

    #[arg(long, env = "TELEGRAM_ENABLED", default_value_t = true, action = ArgAction::Set)]
    telegram_enabled: bool,

    #[arg(long, env = "DISCORD_WEBHOOK_URL", hide_env_values = true)]
    discord_webhook: Option<String>,

    #[arg(long, env = "DISCORD_ENABLED", default_value_t = true, action = ArgAction::Set)]
    discord_enabled: bool,

    /// Path to custom browser executable
    #[arg(long, env = "CHROME_BINARY", value_name = "PATH")]
    chrome_binary: Option<PathBuf>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Treat a login that does not land on the dashboard as failed
    #[arg(long)]
    strict_login: bool,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn to_config(&self) -> anyhow::Result<MonitorConfig> {
        let listing_url = match &self.listing_url {
            Some(url) => url.clone(),
            None => reqwest::Url::parse(&self.portal_url)
                .and_then(|base| base.join(DEFAULT_LISTING_PATH))
                .with_context(|| format!("Invalid portal URL: {}", self.portal_url))?
                .to_string(),
        };

        let verification = if self.strict_login { LoginVerification::Strict } else { LoginVerification::Optimistic };
        let portal = PortalConfig::new(&self.portal_url, listing_url, &self.username, &self.password)
            .login_verification(verification);

        let mut launch = LaunchOptions::new().headless(!self.headed);
        if let Some(path) = &self.chrome_binary {
            launch = launch.chrome_path(path);
        }

        let mut config = MonitorConfig::new(portal)
            .poll_interval(Duration::from_secs(self.interval))
            .data_file(&self.data_file)
            .launch(launch);

        if self.telegram_token.is_some() || self.telegram_chat_id.is_some() {
            let token = self.telegram_token.clone().unwrap_or_default();
            let chat_id = self.telegram_chat_id.clone().unwrap_or_default();
            config = config.telegram(TelegramConfig::new(token, chat_id).enabled(self.telegram_enabled));
        }
        if let Some(webhook) = &self.discord_webhook {
            config = config.discord(DiscordConfig::new(webhook).enabled(self.discord_enabled));
        }

        Ok(config)
    }
}

/// Turn the first Ctrl-C into a stop request.
///
/// If the listener cannot be installed the service keeps running, and `stop`
/// is held forever since dropping it would also stop the scheduler.
async fn stop_on_ctrl_c(listener: impl Future<Output = std::io::Result<()>>, stop: StopHandle) {
    match listener.await {
        Ok(()) => {
            log::info!("Stop requested, finishing the current check");
            stop.stop();
        }
        Err(e) => {
            log::error!("Failed to listen for Ctrl-C, the service can only be stopped externally: {}", e);
            std::future::pending::<()>().await;
            drop(stop);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.to_config()?;
    config.validate()?;

    let (stop, signal) = stop_channel();
    if !cli.once {
        tokio::spawn(stop_on_ctrl_c(tokio::signal::ctrl_c(), stop));
    }

    let once = cli.once;
    tokio::task::spawn_blocking(move || -> listing_monitor::Result<()> {
        let monitor = Monitor::new(
            config.clone(),
            ChromeLauncher::new(config.launch.clone()),
            JsonFileStore::new(&config.data_file),
            Dispatcher::from_config(&config)?,
        );

        let mut scheduler = Scheduler::new(monitor, config.poll_interval);
        if once {
            scheduler.run_once();
        } else {
            scheduler.run_forever(&signal);
        }
        Ok(())
    })
    .await
    .context("Monitor thread failed")??;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_ctrl_c_requests_stop() {
        let (stop, signal) = stop_channel();
        tokio::spawn(stop_on_ctrl_c(async { Ok::<(), std::io::Error>(()) }, stop));
        settle().await;

        assert!(signal.is_stopped());
    }

    #[tokio::test]
    async fn test_listener_failure_keeps_running() {
        let (stop, signal) = stop_channel();
        let failed = async { Err::<(), _>(std::io::Error::other("no signal support")) };
        tokio::spawn(stop_on_ctrl_c(failed, stop));
        settle().await;

        assert!(!signal.is_stopped());
    }

    #[test]
    fn test_listing_url_defaults_to_dashboard_path() {
        let cli = Cli::parse_from([
            "listing-monitor",
            "--portal-url",
            "https://portal.example/",
            "--username",
            "me",
            "--password",
            "secret",
        ]);

        let config = cli.to_config().unwrap();
        assert_eq!(config.portal.listing_url, "https://portal.example/company-dashboard");
    }
}
