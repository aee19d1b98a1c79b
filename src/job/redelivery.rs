use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::MqError;
use crate::listener::StreamConsumer;
use crate::lock::{HeldLock, LockManager};
use crate::store::{EntryRange, Store};
use crate::template::MqTemplate;

/// Counts from one completed sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub listeners_scanned: usize,
    /// Listeners whose sweep hit a store error and was abandoned.
    pub listeners_failed: usize,
    /// Pending entries looked at.
    pub inspected: usize,
    /// Entries re-appended and acknowledged.
    pub redelivered: usize,
    /// Stale entries whose payload was gone from the stream.
    pub skipped: usize,
}

impl SweepReport {
    fn absorb(&mut self, other: ListenerSweep) {
        self.inspected += other.inspected;
        self.redelivered += other.redelivered;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Another process holds the cluster lock; nothing was touched.
    Skipped,
    Completed(SweepReport),
}

#[derive(Debug, Default)]
struct ListenerSweep {
    inspected: usize,
    redelivered: usize,
    skipped: usize,
}

/// Re-injects stream entries that sat unacknowledged for too long.
///
/// An entry stays pending when its consumer failed, crashed, or was shut
/// down mid-flight. Each run takes the cluster lock with `try_lock`, then
/// for every registered stream listener re-appends stale entries to the
/// tail of their stream and acknowledges the originals, so a live consumer
/// in the group picks them up again. Delivery is at-least-once: a consumer
/// that was merely slow may still finish the original.
pub struct PendingRedeliveryJob<L: LockManager> {
    store: Arc<dyn Store>,
    listeners: Vec<Arc<dyn StreamConsumer>>,
    locks: Arc<L>,
    lock_key: String,
    expire_after: Duration,
}

impl<L: LockManager> PendingRedeliveryJob<L> {
    /// Job over `listeners`, with lock key and threshold from the template's
    /// config.
    pub fn new(
        template: &MqTemplate,
        listeners: Vec<Arc<dyn StreamConsumer>>,
        locks: Arc<L>,
    ) -> Self {
        let redelivery = &template.config().redelivery;
        Self {
            store: Arc::clone(template.store()),
            listeners,
            locks,
            lock_key: redelivery.lock_key.clone(),
            expire_after: redelivery.expire_after(),
        }
    }

    pub fn with_expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = expire_after;
        self
    }

    pub fn with_lock_key(mut self, key: impl Into<String>) -> Self {
        self.lock_key = key.into();
        self
    }

    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    pub fn expire_after(&self) -> Duration {
        self.expire_after
    }

    /// Run one sweep if the cluster lock is free.
    ///
    /// Only a failure to reach the lock service is an `Err`; store errors
    /// are confined to the listener they happened on.
    pub fn run(&self) -> Result<SweepOutcome, MqError> {
        let lock = self.locks.get_lock(&self.lock_key)?;
        let Some(_held) = HeldLock::try_acquire(lock, self.lock_key.as_str())? else {
            debug!(lock_key = %self.lock_key, "redelivery lock busy, skipping run");
            return Ok(SweepOutcome::Skipped);
        };

        let mut report = SweepReport::default();
        for listener in &self.listeners {
            report.listeners_scanned += 1;
            match self.sweep(listener.as_ref()) {
                Ok(sweep) => report.absorb(sweep),
                Err(err) => {
                    error!(
                        stream = %listener.stream_key(),
                        group = %listener.group(),
                        error = %err,
                        "pending sweep failed"
                    );
                    report.listeners_failed += 1;
                }
            }
        }

        if report.redelivered > 0 || report.listeners_failed > 0 {
            info!(
                redelivered = report.redelivered,
                skipped = report.skipped,
                failed = report.listeners_failed,
                "pending sweep finished"
            );
        }
        Ok(SweepOutcome::Completed(report))
    }

    fn sweep(&self, listener: &dyn StreamConsumer) -> Result<ListenerSweep, MqError> {
        let stream = listener.stream_key();
        let group = listener.group();
        let mut sweep = ListenerSweep::default();

        let summary = self.store.stream_pending_summary(stream, group)?;
        if summary.is_empty() {
            return Ok(sweep);
        }

        for (consumer, count) in &summary.consumers {
            let pending = self.store.stream_pending_detail(
                stream,
                group,
                consumer,
                &EntryRange::unbounded(),
                *count as usize,
            )?;

            for entry in pending {
                sweep.inspected += 1;
                if entry.elapsed < self.expire_after {
                    continue;
                }

                let Some(original) = self
                    .store
                    .stream_range(stream, &EntryRange::single(entry.id))?
                    .into_iter()
                    .next()
                else {
                    debug!(stream = %stream, id = %entry.id, "pending entry no longer in stream");
                    sweep.skipped += 1;
                    continue;
                };

                let new_id = self.store.stream_append(stream, &original.payload)?;
                self.store.stream_ack(stream, group, &entry.id)?;
                info!(
                    stream = %stream,
                    group = %group,
                    consumer = %consumer,
                    id = %entry.id,
                    new_id = %new_id,
                    elapsed_secs = entry.elapsed.as_secs(),
                    "redelivered pending entry"
                );
                sweep.redelivered += 1;
            }
        }

        Ok(sweep)
    }
}
