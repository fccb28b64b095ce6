//! # listing-monitor
//!
//! Watches a login-protected, client-rendered listing dashboard and announces
//! newly published listings to Telegram and Discord.
//!
//! ## Features
//!
//! - **Headless browsing**: Chrome driven over the DevTools Protocol, one fresh session per cycle
//! - **Resilient login**: ordered locator strategies per form field, with an explicit verification policy
//! - **Harvesting**: exhaustive scrolling, positional table extraction and per-record detail enrichment
//! - **Change detection**: fingerprint-based diff against a persisted baseline
//! - **Notifications**: independent sinks, one failure never blocks another
//!
//! ## Running the service
//!
//! ```bash
//! # Poll every CHECK_INTERVAL seconds until Ctrl-C
//! PORTAL_URL=https://portal.example/ PORTAL_USERNAME=me PORTAL_PASSWORD=secret \
//!     cargo run --bin listing-monitor
//!
//! # Single check, for cron
//! cargo run --bin listing-monitor -- --once
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use listing_monitor::{
//!     ChromeLauncher, Dispatcher, JsonFileStore, Monitor, MonitorConfig, PortalConfig, Scheduler,
//! };
//!
//! # fn main() -> listing_monitor::Result<()> {
//! let portal = PortalConfig::new(
//!     "https://portal.example/",
//!     "https://portal.example/company-dashboard",
//!     "student@example.edu",
//!     "secret",
//! );
//! let config = MonitorConfig::new(portal);
//! config.validate()?;
//!
//! let monitor = Monitor::new(
//!     config.clone(),
//!     ChromeLauncher::new(config.launch.clone()),
//!     JsonFileStore::new(&config.data_file),
//!     Dispatcher::from_config(&config)?,
//! );
//!
//! let report = monitor.run_cycle()?;
//! println!("{} listings, {} new", report.harvested, report.new_records.len());
//!
//! // Or keep polling, surviving failed cycles
//! let mut scheduler = Scheduler::new(monitor, config.poll_interval);
//! scheduler.run_once();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: remote DOM abstraction and the headless Chrome session
//! - [`locate`]: locator strategies and semantic field resolution
//! - [`login`]: session acquisition state machine
//! - [`harvest`]: listing table and detail view extraction
//! - [`record`], [`diff`], [`baseline`]: data model, change detection, persistence
//! - [`notify`]: message formatting, sinks and the dispatcher
//! - [`monitor`], [`scheduler`]: the cycle and the polling loop
//! - [`config`], [`error`]: configuration values and error types

pub mod baseline;
pub mod browser;
pub mod config;
pub mod diff;
pub mod error;
pub mod harvest;
pub mod locate;
pub mod login;
pub mod monitor;
pub mod notify;
pub mod record;
pub mod scheduler;

pub use baseline::{Baseline, BaselineStore, JsonFileStore, MemoryStore};
pub use browser::{BrowserSession, ChromeLauncher, LaunchOptions, NodeRef, Query, RemoteDom, SessionFactory};
pub use config::{LoginVerification, MonitorConfig, PortalConfig, Timings};
pub use diff::{ChangeSet, diff};
pub use error::{MonitorError, Result};
pub use harvest::Harvester;
pub use login::{LoginOutcome, SessionAcquirer};
pub use monitor::{CycleReport, Monitor};
pub use notify::{DiscordConfig, Dispatcher, Message, Sink, TelegramConfig};
pub use record::{Fingerprint, Record, ValueRange};
pub use scheduler::{Cycle, Scheduler, SchedulerState, StopHandle, StopSignal, stop_channel};
