//! Startup registries that connect listeners to the store.

use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use super::{ChannelConsumer, StreamConsumer};
use crate::error::MqError;
use crate::store::{Store, StoreError, SubscriptionCallback, SubscriptionId};
use crate::template::MqTemplate;

/// Subscribes broadcast listeners to their channels.
///
/// Messages are dispatched on whatever context the store invokes its
/// subscription callbacks on.
pub struct ChannelListenerContainer {
    store: Arc<dyn Store>,
    subscriptions: Vec<(String, SubscriptionId)>,
}

impl ChannelListenerContainer {
    pub fn new(template: &MqTemplate) -> Self {
        Self {
            store: Arc::clone(template.store()),
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe a listener to its channel.
    pub fn register<L: ChannelConsumer + 'static>(
        &mut self,
        listener: L,
    ) -> Result<SubscriptionId, MqError> {
        let listener = Arc::new(listener);
        let channel = listener.channel().to_string();
        let callback: SubscriptionCallback =
            Arc::new(move |payload: &[u8]| listener.on_message(payload));
        let id = self.store.subscribe(&channel, callback)?;
        info!(channel = %channel, "registered channel listener");
        self.subscriptions.push((channel, id));
        Ok(id)
    }

    pub fn channels(&self) -> Vec<&str> {
        self.subscriptions.iter().map(|(c, _)| c.as_str()).collect()
    }

    /// Unsubscribe every registered listener.
    pub fn shutdown(mut self) -> Result<(), MqError> {
        for (channel, id) in self.subscriptions.drain(..) {
            self.store.unsubscribe(id)?;
            info!(channel = %channel, "unregistered channel listener");
        }
        Ok(())
    }
}

/// Statistics from stream polling.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContainerStats {
    /// Entries handled and acknowledged.
    pub handled: usize,
    /// Entries whose handling failed; they stay pending.
    pub failed: usize,
    /// Poll passes completed.
    pub polls: usize,
}

impl ContainerStats {
    fn absorb(&mut self, other: ContainerStats) {
        self.handled += other.handled;
        self.failed += other.failed;
        self.polls += other.polls;
    }
}

/// Reads consumer-group streams for registered listeners and dispatches
/// the entries.
///
/// Every listener reads under this process's consumer name, in batches of
/// `stream_batch_size`. Use [`poll_once`](Self::poll_once) to drive it by
/// hand or [`start`](Self::start) to poll on a background thread.
pub struct StreamListenerContainer {
    store: Arc<dyn Store>,
    consumer_name: String,
    batch_size: usize,
    listeners: Vec<Arc<dyn StreamConsumer>>,
}

impl StreamListenerContainer {
    pub fn new(template: &MqTemplate) -> Self {
        let config = template.config();
        Self {
            store: Arc::clone(template.store()),
            consumer_name: config.consumer_name.clone(),
            batch_size: config.stream_batch_size.max(1),
            listeners: Vec::new(),
        }
    }

    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Register a listener, creating its consumer group if needed.
    pub fn register<L: StreamConsumer + 'static>(&mut self, listener: L) -> Result<(), MqError> {
        match self
            .store
            .stream_create_group(listener.stream_key(), listener.group())
        {
            Ok(()) | Err(StoreError::GroupExists { .. }) => {}
            Err(err) => return Err(err.into()),
        }
        info!(
            stream = %listener.stream_key(),
            group = %listener.group(),
            consumer = %self.consumer_name,
            "registered stream listener"
        );
        self.listeners.push(Arc::new(listener));
        Ok(())
    }

    /// The registered listeners, for the redelivery job.
    pub fn listeners(&self) -> Vec<Arc<dyn StreamConsumer>> {
        self.listeners.clone()
    }

    /// Read one batch per listener and dispatch it.
    pub fn poll_once(&self) -> ContainerStats {
        let mut stats = ContainerStats {
            polls: 1,
            ..ContainerStats::default()
        };

        for listener in &self.listeners {
            let entries = match self.store.stream_read_group(
                listener.stream_key(),
                listener.group(),
                &self.consumer_name,
                self.batch_size,
            ) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(stream = %listener.stream_key(), error = %err, "stream read failed");
                    continue;
                }
            };

            for entry in &entries {
                match listener.on_entry(entry) {
                    Ok(()) => stats.handled += 1,
                    Err(err) => {
                        warn!(
                            stream = %listener.stream_key(),
                            id = %entry.id,
                            error = %err,
                            "entry left pending"
                        );
                        stats.failed += 1;
                    }
                }
            }
        }

        stats
    }

    /// Poll on a background thread until stopped. Sleeps `poll_interval`
    /// after a pass that found nothing.
    pub fn start(self, poll_interval: Duration) -> ContainerHandle {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = ContainerStats::default();
            info!(consumer = %self.consumer_name, listeners = self.listeners.len(), "stream container started");

            loop {
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }

                let pass = self.poll_once();
                let idle = pass.handled == 0 && pass.failed == 0;
                stats.absorb(pass);

                if idle {
                    thread::sleep(poll_interval);
                }
            }

            info!(consumer = %self.consumer_name, handled = stats.handled, failed = stats.failed, "stream container stopped");
            stats
        });

        ContainerHandle {
            stop_tx,
            handle: Some(handle),
        }
    }
}

/// Handle to a running stream container. Drop or call `stop()` to shut down.
pub struct ContainerHandle {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<ContainerStats>>,
}

impl ContainerHandle {
    /// Stop polling and wait for the thread. Returns the stats.
    pub fn stop(mut self) -> ContainerStats {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            ContainerStats::default()
        }
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for ContainerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
