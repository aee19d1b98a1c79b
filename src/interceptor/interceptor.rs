use thiserror::Error;

use crate::error::MqError;
use crate::message::{DeliveryKind, Headers};
use crate::store::EntryId;

/// Raised by an interceptor hook to abort (before) or fail (after) an
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("interceptor rejected message: {0}")]
pub struct InterceptorError(pub String);

impl InterceptorError {
    pub fn new(msg: impl Into<String>) -> Self {
        InterceptorError(msg.into())
    }
}

/// What a hook sees of the message it runs around.
///
/// Hooks get the routing information and mutable access to the envelope's
/// headers; the payload itself stays opaque.
pub struct MessageContext<'a> {
    kind: DeliveryKind,
    routing_key: &'a str,
    entry_id: Option<EntryId>,
    headers: &'a mut Headers,
}

impl<'a> MessageContext<'a> {
    pub(crate) fn new(
        kind: DeliveryKind,
        routing_key: &'a str,
        entry_id: Option<EntryId>,
        headers: &'a mut Headers,
    ) -> Self {
        Self {
            kind,
            routing_key,
            entry_id,
            headers,
        }
    }

    pub fn kind(&self) -> DeliveryKind {
        self.kind
    }

    /// Channel name or stream key.
    pub fn routing_key(&self) -> &str {
        self.routing_key
    }

    /// The stream entry being consumed. `None` when sending and for broadcasts.
    pub fn entry_id(&self) -> Option<EntryId> {
        self.entry_id
    }

    pub fn headers(&self) -> &Headers {
        self.headers
    }

    /// Headers written before a send end up in the serialized envelope.
    pub fn headers_mut(&mut self) -> &mut Headers {
        self.headers
    }
}

/// Before/after hooks around every send and every consume.
///
/// Interceptors registered on one template form an onion: before-hooks run
/// in registration order, after-hooks in reverse. An after-hook runs only if
/// the same interceptor's before-hook succeeded, and it runs whether or not
/// the wrapped operation failed; `failure` carries that error.
///
/// Interceptors are shared by every sender and consumer thread, so they hold
/// no per-message state.
pub trait Interceptor: Send + Sync {
    fn before_send(&self, _ctx: &mut MessageContext<'_>) -> Result<(), InterceptorError> {
        Ok(())
    }

    fn after_send(
        &self,
        _ctx: &mut MessageContext<'_>,
        _failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        Ok(())
    }

    fn before_consume(&self, _ctx: &mut MessageContext<'_>) -> Result<(), InterceptorError> {
        Ok(())
    }

    fn after_consume(
        &self,
        _ctx: &mut MessageContext<'_>,
        _failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        Ok(())
    }
}
