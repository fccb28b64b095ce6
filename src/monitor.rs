//! One polling cycle: login, harvest, diff, notify, persist

use crate::baseline::BaselineStore;
use crate::browser::{SessionFactory, SessionGuard};
use crate::config::MonitorConfig;
use crate::diff::diff;
use crate::error::{MonitorError, Result};
use crate::harvest::Harvester;
use crate::login::SessionAcquirer;
use crate::notify::{DispatchReport, Dispatcher};
use crate::record::Record;
use crate::scheduler::Cycle;
use chrono::{Local, Utc};
use std::time::Duration;

/// Outcome of a completed cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Records in the harvest, which is now the baseline
    pub harvested: usize,

    /// Records not present in the previous baseline
    pub new_records: Vec<Record>,

    /// `None` when there was nothing to announce
    pub notified: Option<DispatchReport>,
}

/// Runs cycles against one portal with a fresh session per cycle
pub struct Monitor<F: SessionFactory, S: BaselineStore> {
    config: MonitorConfig,
    factory: F,
    store: S,
    dispatcher: Dispatcher,
}

impl<F: SessionFactory, S: BaselineStore> Monitor<F, S> {
    pub fn new(config: MonitorConfig, factory: F, store: S, dispatcher: Dispatcher) -> Self {
        Self { config, factory, store, dispatcher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one cycle.
    ///
    /// Login failures, transport errors and empty harvests abort the cycle
    /// before the baseline is touched. Once a harvest succeeds the baseline is
    /// replaced by it, whatever happened to the notifications.
    pub fn run_cycle(&self) -> Result<CycleReport> {
        log::info!("Starting listing check...");

        let baseline = self.store.load();
        log::info!("Loaded {} known listings", baseline.len());

        let harvest = self.collect()?;
        let harvested = harvest.len();
        let changes = diff(&baseline, harvest);

        let notified = if changes.new_records.is_empty() {
            log::info!("No new listings found");
            None
        } else {
            log::info!("Found {} new listings", changes.new_records.len());
            Some(self.dispatcher.dispatch(&changes.new_records, &Local::now()))
        };

        self.store.save(&changes.baseline.checked_at(Utc::now()))?;

        Ok(CycleReport { harvested, new_records: changes.new_records, notified })
    }

    /// Log in and harvest over a session that is closed before returning
    fn collect(&self) -> Result<Vec<Record>> {
        let session = SessionGuard::new(self.factory.open()?);

        SessionAcquirer::new(&*session, &self.config.portal, &self.config.timings)
            .run()
            .into_result()?;

        let records =
            Harvester::new(&*session, &self.config.portal.listing_url, &self.config.timings, &self.config.harvest)
                .harvest()?;
        Ok(records)
    }
}

impl<F: SessionFactory, S: BaselineStore> Cycle for Monitor<F, S> {
    fn run_cycle(&self) -> Result<CycleReport> {
        Monitor::run_cycle(self)
    }

    fn on_started(&self, interval: Duration) {
        self.dispatcher.announce_started(interval, &Local::now());
    }

    fn on_stopped(&self) {
        self.dispatcher.announce_stopped();
    }

    fn on_failure(&self, error: &MonitorError) {
        if error.is_reportable() {
            self.dispatcher.announce_error(error);
        }
    }
}
