use std::sync::Arc;

use super::{EntryId, EntryRange, PendingEntry, PendingSummary, StoreError, StreamEntry};
use crate::error::MqError;

/// Callback invoked with the raw bytes of every message published to a
/// subscribed channel.
///
/// An `Err` is reported back to the store, which applies its own policy
/// (the in-memory store logs it and keeps delivering).
pub type SubscriptionCallback = Arc<dyn Fn(&[u8]) -> Result<(), MqError> + Send + Sync>;

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// The key-value/stream store the messaging layer runs on.
///
/// The operations mirror the Redis commands the layer relies on:
/// `PUBLISH`/`SUBSCRIBE` for broadcast, and `XADD`, `XGROUP CREATE`,
/// `XREADGROUP`, `XACK`, `XPENDING` and `XRANGE` for consumer-group streams.
/// Implementations must be safe to share across threads.
pub trait Store: Send + Sync {
    /// Publish a payload to every current subscriber of `channel`.
    /// Returns the number of subscribers that received it.
    fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize, StoreError>;

    /// Register a callback for every future message on `channel`.
    fn subscribe(
        &self,
        channel: &str,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionId, StoreError>;

    /// Remove a subscription. Returns `false` if it was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, StoreError>;

    /// Append a payload to `stream`, creating the stream if needed.
    fn stream_append(&self, stream: &str, payload: &[u8]) -> Result<EntryId, StoreError>;

    /// Create a consumer group positioned at the stream's tail, creating the
    /// stream if needed. Fails with [`StoreError::GroupExists`] if present.
    fn stream_create_group(&self, stream: &str, group: &str) -> Result<(), StoreError>;

    /// Read up to `count` never-delivered entries for `consumer` in `group`.
    /// Returned entries become pending for that consumer.
    fn stream_read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError>;

    /// Acknowledge an entry. Returns `true` if it was pending.
    fn stream_ack(&self, stream: &str, group: &str, id: &EntryId) -> Result<bool, StoreError>;

    /// Summarise the group's pending-entry list.
    fn stream_pending_summary(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<PendingSummary, StoreError>;

    /// List up to `count` pending entries of one consumer within `range`.
    fn stream_pending_detail(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        range: &EntryRange,
        count: usize,
    ) -> Result<Vec<PendingEntry>, StoreError>;

    /// Read the entries of `stream` within `range`, in ID order.
    fn stream_range(&self, stream: &str, range: &EntryRange)
        -> Result<Vec<StreamEntry>, StoreError>;
}
