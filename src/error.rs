use std::error::Error as StdError;

use thiserror::Error;

use crate::interceptor::InterceptorError;
use crate::lock::LockError;
use crate::message::EncodeError;
use crate::store::StoreError;

/// Error returned by a listener's handler.
///
/// For broadcast listeners the error is handed back to the store's callback
/// invoker; for stream listeners it leaves the entry unacknowledged.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Business logic rejected or failed to process the message.
    #[error("handler failed: {0}")]
    Failed(String),
    /// Any other error raised while handling.
    #[error("handler error: {0}")]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// Umbrella error for sends, consumes and the redelivery sweep.
#[derive(Debug, Error)]
pub enum MqError {
    /// The store rejected or could not perform an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The envelope could not be serialized.
    #[error("failed to encode message for {routing_key}: {source}")]
    Encode {
        routing_key: String,
        source: EncodeError,
    },
    /// Raw bytes did not decode into the listener's payload type.
    #[error("failed to decode message from {routing_key}: {source}")]
    Decode {
        routing_key: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Interceptor(#[from] InterceptorError),
    /// A listener or message type derived a routing key the store cannot use.
    #[error("invalid routing key {0:?}")]
    InvalidRoutingKey(String),
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
}

impl MqError {
    /// True when the failure came from the handler rather than the plumbing.
    pub fn is_handler(&self) -> bool {
        matches!(self, MqError::Handler(_))
    }
}
