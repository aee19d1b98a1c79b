//! In-memory store for testing and single-process deployments.
//!
//! Implements the full [`Store`] contract, including consumer groups and
//! pending-entry bookkeeping, so the messaging layer can be exercised without
//! a running server.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::{
    EntryId, EntryRange, PendingEntry, PendingSummary, Store, StoreError, StreamEntry,
    SubscriptionCallback, SubscriptionId,
};

struct Subscription {
    id: SubscriptionId,
    callback: SubscriptionCallback,
}

struct PendingRecord {
    consumer: String,
    delivered_at: Duration,
    delivery_count: u64,
}

struct GroupState {
    last_delivered: EntryId,
    pending: BTreeMap<EntryId, PendingRecord>,
    acked: Vec<EntryId>,
}

#[derive(Default)]
struct StreamState {
    entries: BTreeMap<EntryId, Vec<u8>>,
    last_id: EntryId,
    groups: HashMap<String, GroupState>,
}

/// In-memory store.
///
/// Features:
/// - Thread-safe (clones share the same state, like connections to one server)
/// - Broadcast callbacks run synchronously on the publishing thread
/// - Streams with consumer groups, pending lists and acknowledgement
/// - A skewable clock so pending-entry ages can be tested without sleeping
/// - An availability switch to simulate an unreachable server
///
/// ## Example
///
/// ```
/// use redis_mq::store::{EntryRange, InMemoryStore, Store};
///
/// let store = InMemoryStore::new();
/// store.stream_create_group("Job", "svc").unwrap();
/// let id = store.stream_append("Job", br#"{"id":42}"#).unwrap();
///
/// let entries = store.stream_read_group("Job", "svc", "svc-1", 10).unwrap();
/// assert_eq!(entries[0].id, id);
/// assert_eq!(store.stream_pending_summary("Job", "svc").unwrap().total, 1);
///
/// assert!(store.stream_ack("Job", "svc", &id).unwrap());
/// assert!(store.stream_pending_summary("Job", "svc").unwrap().is_empty());
/// assert_eq!(store.stream_range("Job", &EntryRange::single(id)).unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    channels: Arc<RwLock<HashMap<String, Vec<Subscription>>>>,
    streams: Arc<RwLock<HashMap<String, StreamState>>>,
    next_subscription: Arc<AtomicU64>,
    clock_skew: Arc<Mutex<Duration>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            streams: Arc::new(RwLock::new(HashMap::new())),
            next_subscription: Arc::new(AtomicU64::new(1)),
            clock_skew: Arc::new(Mutex::new(Duration::ZERO)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Move the store's clock forward. Pending entries age accordingly and new
    /// entry IDs are generated from the advanced time.
    pub fn advance_clock(&self, by: Duration) {
        if let Ok(mut skew) = self.clock_skew.lock() {
            *skew += by;
        }
    }

    /// Simulate the server going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live subscriptions on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .map(|channels| channels.get(channel).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Number of entries currently stored in a stream.
    pub fn stream_len(&self, stream: &str) -> usize {
        self.streams
            .read()
            .map(|streams| streams.get(stream).map_or(0, |s| s.entries.len()))
            .unwrap_or(0)
    }

    /// All entries of a stream in ID order.
    pub fn stream_entries(&self, stream: &str) -> Vec<StreamEntry> {
        self.stream_range(stream, &EntryRange::unbounded())
            .unwrap_or_default()
    }

    /// IDs successfully acknowledged on a group, in acknowledgement order.
    pub fn acknowledged(&self, stream: &str, group: &str) -> Vec<EntryId> {
        self.streams
            .read()
            .ok()
            .and_then(|streams| {
                streams
                    .get(stream)
                    .and_then(|s| s.groups.get(group))
                    .map(|g| g.acked.clone())
            })
            .unwrap_or_default()
    }

    /// Remove an entry from a stream, like `XDEL`. Consumer-group pending
    /// lists keep referring to it. Returns `false` if there was no such entry.
    pub fn stream_delete(&self, stream: &str, id: &EntryId) -> bool {
        self.streams
            .write()
            .map(|mut streams| {
                streams
                    .get_mut(stream)
                    .map_or(false, |s| s.entries.remove(id).is_some())
            })
            .unwrap_or(false)
    }

    fn now(&self) -> Duration {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let skew = self.clock_skew.lock().map(|s| *s).unwrap_or_default();
        wall + skew
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store switched off".into()))
        }
    }

    fn read_streams(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StreamState>>, StoreError> {
        self.streams.read().map_err(|_| StoreError::Poisoned("read"))
    }

    fn write_streams(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, StreamState>>, StoreError> {
        self.streams.write().map_err(|_| StoreError::Poisoned("write"))
    }
}

fn no_such_group(stream: &str, group: &str) -> StoreError {
    StoreError::NoSuchGroup {
        stream: stream.to_string(),
        group: group.to_string(),
    }
}

impl Store for InMemoryStore {
    fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize, StoreError> {
        self.ensure_available()?;

        // Snapshot the callbacks so handlers may publish or subscribe re-entrantly.
        let callbacks: Vec<SubscriptionCallback> = {
            let channels = self
                .channels
                .read()
                .map_err(|_| StoreError::Poisoned("publish"))?;
            channels
                .get(channel)
                .map(|subs| subs.iter().map(|s| Arc::clone(&s.callback)).collect())
                .unwrap_or_default()
        };

        for callback in &callbacks {
            if let Err(err) = callback(payload) {
                warn!(channel = %channel, error = %err, "subscriber callback failed");
            }
        }

        Ok(callbacks.len())
    }

    fn subscribe(
        &self,
        channel: &str,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionId, StoreError> {
        self.ensure_available()?;
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.channels
            .write()
            .map_err(|_| StoreError::Poisoned("subscribe"))?
            .entry(channel.to_string())
            .or_default()
            .push(Subscription { id, callback });
        debug!(channel = %channel, subscription = id.0, "subscribed");
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, StoreError> {
        let mut channels = self
            .channels
            .write()
            .map_err(|_| StoreError::Poisoned("unsubscribe"))?;
        for subs in channels.values_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn stream_append(&self, stream: &str, payload: &[u8]) -> Result<EntryId, StoreError> {
        self.ensure_available()?;
        let now_millis = self.now().as_millis() as u64;
        let mut streams = self.write_streams()?;
        let state = streams.entry(stream.to_string()).or_default();
        let id = state.last_id.next_after(now_millis);
        state.last_id = id;
        state.entries.insert(id, payload.to_vec());
        Ok(id)
    }

    fn stream_create_group(&self, stream: &str, group: &str) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut streams = self.write_streams()?;
        let state = streams.entry(stream.to_string()).or_default();
        if state.groups.contains_key(group) {
            return Err(StoreError::GroupExists {
                stream: stream.to_string(),
                group: group.to_string(),
            });
        }
        let tail = state.last_id;
        state.groups.insert(
            group.to_string(),
            GroupState {
                last_delivered: tail,
                pending: BTreeMap::new(),
                acked: Vec::new(),
            },
        );
        Ok(())
    }

    fn stream_read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        self.ensure_available()?;
        let now = self.now();
        let mut streams = self.write_streams()?;
        let state = streams
            .get_mut(stream)
            .ok_or_else(|| no_such_group(stream, group))?;
        let group_state = state
            .groups
            .get_mut(group)
            .ok_or_else(|| no_such_group(stream, group))?;

        let delivered: Vec<StreamEntry> = state
            .entries
            .range((Bound::Excluded(group_state.last_delivered), Bound::Unbounded))
            .take(count)
            .map(|(id, payload)| StreamEntry::new(*id, payload.clone()))
            .collect();

        for entry in &delivered {
            group_state.last_delivered = entry.id;
            group_state.pending.insert(
                entry.id,
                PendingRecord {
                    consumer: consumer.to_string(),
                    delivered_at: now,
                    delivery_count: 1,
                },
            );
        }

        Ok(delivered)
    }

    fn stream_ack(&self, stream: &str, group: &str, id: &EntryId) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let mut streams = self.write_streams()?;
        let Some(group_state) = streams
            .get_mut(stream)
            .and_then(|s| s.groups.get_mut(group))
        else {
            return Ok(false);
        };
        if group_state.pending.remove(id).is_some() {
            group_state.acked.push(*id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn stream_pending_summary(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<PendingSummary, StoreError> {
        self.ensure_available()?;
        let streams = self.read_streams()?;
        let group_state = streams
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .ok_or_else(|| no_such_group(stream, group))?;

        let mut summary = PendingSummary {
            total: group_state.pending.len() as u64,
            lowest: group_state.pending.keys().next().copied(),
            highest: group_state.pending.keys().next_back().copied(),
            consumers: BTreeMap::new(),
        };
        for record in group_state.pending.values() {
            *summary.consumers.entry(record.consumer.clone()).or_insert(0) += 1;
        }
        Ok(summary)
    }

    fn stream_pending_detail(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        range: &EntryRange,
        count: usize,
    ) -> Result<Vec<PendingEntry>, StoreError> {
        self.ensure_available()?;
        let now = self.now();
        let streams = self.read_streams()?;
        let group_state = streams
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .ok_or_else(|| no_such_group(stream, group))?;

        Ok(group_state
            .pending
            .iter()
            .filter(|(id, record)| record.consumer == consumer && range.contains(id))
            .take(count)
            .map(|(id, record)| PendingEntry {
                id: *id,
                consumer: record.consumer.clone(),
                elapsed: now.saturating_sub(record.delivered_at),
                delivery_count: record.delivery_count,
            })
            .collect())
    }

    fn stream_range(
        &self,
        stream: &str,
        range: &EntryRange,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        self.ensure_available()?;
        let streams = self.read_streams()?;
        Ok(streams
            .get(stream)
            .map(|state| {
                state
                    .entries
                    .iter()
                    .filter(|(id, _)| range.contains(id))
                    .map(|(id, payload)| StreamEntry::new(*id, payload.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
