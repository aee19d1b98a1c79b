//! Background runner for the redelivery job.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use tracing::{error, info};

use super::{PendingRedeliveryJob, Schedule, SweepOutcome};
use crate::lock::LockManager;

/// Statistics from the job runner.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JobStats {
    /// Scheduled slots reached.
    pub runs: usize,
    /// Runs that held the lock and swept.
    pub sweeps: usize,
    /// Runs skipped because another process held the lock.
    pub skipped: usize,
    /// Runs that could not reach the lock service.
    pub failures: usize,
    pub redelivered: usize,
}

/// A background thread that runs a [`PendingRedeliveryJob`] on a
/// [`Schedule`].
///
/// ## Example
///
/// ```ignore
/// let job = PendingRedeliveryJob::new(&template, container.listeners(), locks);
/// let runner = RedeliveryJobThread::spawn(job, template.config().redelivery.schedule());
///
/// // ... serve traffic ...
///
/// let stats = runner.stop();
/// println!("redelivered {} entries", stats.redelivered);
/// ```
pub struct RedeliveryJobThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<JobStats>>,
}

impl RedeliveryJobThread {
    /// Spawn the runner. It sleeps until each slot of `schedule`, waking
    /// early only to stop.
    pub fn spawn<L>(job: PendingRedeliveryJob<L>, schedule: Schedule) -> Self
    where
        L: LockManager + 'static,
    {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = JobStats::default();
            info!(lock_key = %job.lock_key(), period_ms = schedule.period().as_millis() as u64, "redelivery job started");

            loop {
                let delay = schedule.delay_until_next(SystemTime::now());
                match stop_rx.recv_timeout(delay) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }

                stats.runs += 1;
                match job.run() {
                    Ok(SweepOutcome::Completed(report)) => {
                        stats.sweeps += 1;
                        stats.redelivered += report.redelivered;
                    }
                    Ok(SweepOutcome::Skipped) => stats.skipped += 1,
                    Err(err) => {
                        error!(lock_key = %job.lock_key(), error = %err, "redelivery run failed");
                        stats.failures += 1;
                    }
                }
            }

            info!(runs = stats.runs, redelivered = stats.redelivered, "redelivery job stopped");
            stats
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Stop the runner and wait for it. Returns the stats.
    pub fn stop(mut self) -> JobStats {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            JobStats::default()
        }
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for RedeliveryJobThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
