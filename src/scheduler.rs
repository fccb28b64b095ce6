//! Polling scheduler
//!
//! Cycles run strictly one after another on the calling thread. A failed or
//! panicking cycle is logged and followed by the normal sleep; only the stop
//! signal ends [`Scheduler::run_forever`], and it is only observed while
//! sleeping between cycles.

use crate::error::{MonitorError, Result};
use crate::monitor::CycleReport;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Work performed once per polling interval
pub trait Cycle {
    fn run_cycle(&self) -> Result<CycleReport>;

    /// Called once before the first cycle of a run-forever loop
    fn on_started(&self, _interval: Duration) {}

    /// Called once after a run-forever loop was stopped
    fn on_stopped(&self) {}

    /// Called with the error of every failed cycle
    fn on_failure(&self, _error: &MonitorError) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningCycle,
    Sleeping,
    Stopped,
}

/// Requests the scheduler to stop
#[derive(Debug, Clone)]
pub struct StopHandle(mpsc::Sender<()>);

impl StopHandle {
    pub fn stop(&self) {
        // A closed receiver means the scheduler is already gone
        let _ = self.0.send(());
    }
}

/// Interruptible sleep, observed by the scheduler between cycles.
///
/// Dropping every [`StopHandle`] also counts as a stop request.
#[derive(Debug)]
pub struct StopSignal(mpsc::Receiver<()>);

impl StopSignal {
    /// Sleep for up to `timeout`; returns true if a stop was requested
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.0.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        match self.0.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}

pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = mpsc::channel();
    (StopHandle(tx), StopSignal(rx))
}

/// Runs a [`Cycle`] once or on a fixed interval
pub struct Scheduler<C: Cycle> {
    cycle: C,
    interval: Duration,
    state: SchedulerState,
    completed: usize,
    failed: usize,
}

impl<C: Cycle> Scheduler<C> {
    pub fn new(cycle: C, interval: Duration) -> Self {
        Self { cycle, interval, state: SchedulerState::Idle, completed: 0, failed: 0 }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cycle(&self) -> &C {
        &self.cycle
    }

    /// Cycles that ran to completion
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Cycles that returned an error or panicked
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Run exactly one cycle; `None` if it failed
    pub fn run_once(&mut self) -> Option<CycleReport> {
        log::info!("Running single check...");
        let report = self.run_guarded();
        self.state = SchedulerState::Idle;
        log::info!("Check complete");
        report
    }

    /// Run cycles until `stop` fires, sleeping `interval` between them
    pub fn run_forever(&mut self, stop: &StopSignal) {
        log::info!(
            "Listing monitor started, check interval: {} seconds ({:.1} minutes)",
            self.interval.as_secs(),
            self.interval.as_secs_f64() / 60.0
        );
        self.cycle.on_started(self.interval);

        loop {
            self.run_guarded();

            self.state = SchedulerState::Sleeping;
            log::info!("Sleeping for {} seconds...", self.interval.as_secs());
            if stop.wait(self.interval) {
                break;
            }
        }

        self.state = SchedulerState::Stopped;
        log::info!("Service stopped after {} cycles ({} failed)", self.completed + self.failed, self.failed);
        self.cycle.on_stopped();
    }

    /// Run one cycle, containing both errors and panics
    fn run_guarded(&mut self) -> Option<CycleReport> {
        self.state = SchedulerState::RunningCycle;

        match catch_unwind(AssertUnwindSafe(|| self.cycle.run_cycle())) {
            Ok(Ok(report)) => {
                self.completed += 1;
                Some(report)
            }
            Ok(Err(MonitorError::EmptyHarvest)) => {
                self.failed += 1;
                log::warn!("No listings found, skipping update");
                self.cycle.on_failure(&MonitorError::EmptyHarvest);
                None
            }
            Ok(Err(e)) => {
                self.failed += 1;
                log::error!("Error during check: {}", e);
                self.cycle.on_failure(&e);
                None
            }
            Err(panic) => {
                self.failed += 1;
                log::error!("Check panicked: {}", panic_message(&*panic));
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
