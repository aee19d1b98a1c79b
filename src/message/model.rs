//! Delivery models: how a message type reaches its consumers.

use std::fmt;

use crate::store::{EntryId, Store, StoreError};

/// Which delivery model a message, listener or hook invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryKind {
    /// Pub/sub: every live subscriber gets a copy, nothing is acknowledged.
    Broadcast,
    /// Consumer-group stream: one member per entry, acknowledged on success.
    Stream,
}

impl fmt::Display for DeliveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryKind::Broadcast => write!(f, "channel"),
            DeliveryKind::Stream => write!(f, "stream"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Broadcast {}
    impl Sealed for super::Streaming {}
}

/// Marker implemented by [`Broadcast`] and [`Streaming`].
///
/// The model decides which store primitive a send uses and what the
/// sender gets back.
pub trait DeliveryModel: sealed::Sealed + Send + Sync + 'static {
    /// What a successful send returns.
    type Receipt: fmt::Debug;

    const KIND: DeliveryKind;

    #[doc(hidden)]
    fn write(store: &dyn Store, routing_key: &str, payload: &[u8])
        -> Result<Self::Receipt, StoreError>;

    /// The stream entry a receipt names, if any.
    fn assigned_id(receipt: &Self::Receipt) -> Option<EntryId>;
}

/// Broadcast publish/subscribe. The routing key is a channel name.
#[derive(Debug)]
pub enum Broadcast {}

/// Consumer-group stream. The routing key is a stream key.
#[derive(Debug)]
pub enum Streaming {}

impl DeliveryModel for Broadcast {
    type Receipt = ();

    const KIND: DeliveryKind = DeliveryKind::Broadcast;

    fn write(store: &dyn Store, routing_key: &str, payload: &[u8]) -> Result<(), StoreError> {
        store.publish(routing_key, payload).map(|_| ())
    }

    fn assigned_id(_receipt: &()) -> Option<EntryId> {
        None
    }
}

impl DeliveryModel for Streaming {
    type Receipt = EntryId;

    const KIND: DeliveryKind = DeliveryKind::Stream;

    fn write(store: &dyn Store, routing_key: &str, payload: &[u8]) -> Result<EntryId, StoreError> {
        store.stream_append(routing_key, payload)
    }

    fn assigned_id(receipt: &EntryId) -> Option<EntryId> {
        Some(*receipt)
    }
}
