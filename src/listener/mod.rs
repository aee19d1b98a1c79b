//! Typed listeners and the containers that drive them.
//!
//! ```text
//!   ChannelListener<M> ──► ChannelListenerContainer ──► Store::subscribe
//!   StreamListener<M>  ──► StreamListenerContainer  ──► Store::stream_read_group
//!                                  │
//!                                  └─► listeners() ──► PendingRedeliveryJob
//! ```
//!
//! Containers hold listeners behind the object-safe [`ChannelConsumer`] and
//! [`StreamConsumer`] traits, so listeners of different message types share
//! one registry.

mod channel;
mod container;
mod stream;

pub use channel::ChannelListener;
pub use container::{
    ChannelListenerContainer, ContainerHandle, ContainerStats, StreamListenerContainer,
};
pub use stream::StreamListener;

use crate::error::MqError;
use crate::store::StreamEntry;

/// A listener on one broadcast channel, with its message type erased.
pub trait ChannelConsumer: Send + Sync {
    fn channel(&self) -> &str;

    /// Handle one raw message published to the channel.
    fn on_message(&self, payload: &[u8]) -> Result<(), MqError>;
}

/// A listener on one consumer-group stream, with its message type erased.
pub trait StreamConsumer: Send + Sync {
    fn stream_key(&self) -> &str;

    fn group(&self) -> &str;

    /// Handle one entry delivered to this process. `Ok` means the entry was
    /// acknowledged; on `Err` it stays pending.
    fn on_entry(&self, entry: &StreamEntry) -> Result<(), MqError>;
}
