//! Day-rollover monitor.
//!
//! A best-effort wall-clock check, not a midnight trigger: a missed tick
//! delays detection by at most one period. [`RolloverMonitor::tick`] is the
//! whole check and can be called directly; [`RolloverMonitor::spawn`] runs it
//! on a background thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::aggregator::DayCheck;
use crate::dashboard::Dashboard;
use crate::error::Result;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A previous tick or another session operation was still running.
    Skipped,
    Checked(DayCheck),
}

pub struct RolloverMonitor {
    session: Arc<Mutex<Dashboard>>,
    period: Duration,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RolloverMonitor {
    pub fn new(session: Arc<Mutex<Dashboard>>, period: Duration) -> Self {
        Self {
            session,
            period,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs one check unless one is already running or the session is busy.
    /// Never waits: a busy tick is skipped, not queued.
    pub fn tick(&self) -> Result<TickOutcome> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Ok(TickOutcome::Skipped);
        }
        let _guard = InFlight(&self.in_flight);

        let mut session = match self.session.try_lock() {
            Ok(session) => session,
            Err(TryLockError::WouldBlock) => return Ok(TickOutcome::Skipped),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        session.check_day_change().map(TickOutcome::Checked)
    }

    /// Starts ticking every `period` on a background thread. Deadlines that
    /// pass while a tick runs are dropped rather than caught up.
    pub fn spawn(self: Arc<Self>) -> MonitorHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let monitor = self;

        let thread = thread::Builder::new()
            .name("rollover-monitor".into())
            .spawn(move || {
                let mut next = Instant::now() + monitor.period;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    match monitor.tick() {
                        Ok(TickOutcome::Skipped) => tracing::debug!("rollover check skipped, session busy"),
                        Ok(TickOutcome::Checked(DayCheck::RolledOver(agg))) => {
                            tracing::info!(date = %agg.date, "rolled over to new day")
                        }
                        Ok(TickOutcome::Checked(_)) => {}
                        // Already reported to the session listener.
                        Err(e) => tracing::warn!(error = %e, "rollover check failed"),
                    }

                    next += monitor.period;
                    let now = Instant::now();
                    if next <= now {
                        tracing::debug!("rollover check overran its period, skipping missed ticks");
                        next = now + monitor.period;
                    }
                }
                tracing::debug!("rollover monitor stopped");
            });

        match thread {
            Ok(handle) => MonitorHandle {
                stop: Some(stop_tx),
                thread: Some(handle),
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to start rollover monitor");
                MonitorHandle {
                    stop: None,
                    thread: None,
                }
            }
        }
    }
}

/// Stops the monitor thread when stopped or dropped.
pub struct MonitorHandle {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
