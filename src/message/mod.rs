//! Message model: envelopes, headers, delivery models and routing keys.
//!
//! A message type is a plain serde struct that implements [`Message`] and
//! names its delivery model:
//!
//! ```
//! use redis_mq::message::{Broadcast, Message, Streaming};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Ping { text: String }
//!
//! impl Message for Ping {
//!     type Model = Broadcast;
//! }
//!
//! #[derive(Serialize, Deserialize)]
//! struct Job { id: u64 }
//!
//! impl Message for Job {
//!     type Model = Streaming;
//!
//!     fn routing_key() -> std::borrow::Cow<'static, str> {
//!         "jobs.v1".into()
//!     }
//! }
//!
//! assert_eq!(Ping::routing_key(), "Ping");
//! assert_eq!(Job::routing_key(), "jobs.v1");
//! ```

mod envelope;
mod headers;
pub mod model;

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::MqError;

pub use envelope::{EncodeError, Envelope, HEADERS_FIELD};
pub use headers::Headers;
pub use model::{Broadcast, DeliveryKind, DeliveryModel, Streaming};

/// A message type that can be sent through the template.
///
/// The routing key (channel or stream key) defaults to the type's simple
/// name. It is part of the wire contract: renaming the type reroutes it
/// unless `routing_key` is overridden.
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Broadcast or Streaming.
    type Model: DeliveryModel;

    fn routing_key() -> Cow<'static, str> {
        Cow::Borrowed(simple_type_name::<Self>())
    }
}

/// Message types delivered by pub/sub.
pub trait ChannelMessage: Message<Model = Broadcast> {}

impl<M: Message<Model = Broadcast>> ChannelMessage for M {}

/// Message types delivered through consumer-group streams.
pub trait StreamMessage: Message<Model = Streaming> {}

impl<M: Message<Model = Streaming>> StreamMessage for M {}

/// What a successful send of `M` returns: `()` or the new entry ID.
pub type Receipt<M> = <<M as Message>::Model as DeliveryModel>::Receipt;

/// Last path segment of a type's name, without generic arguments.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Reject keys the store cannot route on.
pub(crate) fn validate_routing_key(key: &str) -> Result<(), MqError> {
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(MqError::InvalidRoutingKey(key.to_string()));
    }
    Ok(())
}
