use std::marker::PhantomData;

use tracing::warn;

use super::ChannelConsumer;
use crate::error::{HandlerResult, MqError};
use crate::interceptor::{InterceptorChain, Route};
use crate::message::{validate_routing_key, ChannelMessage, DeliveryKind, Envelope};
use crate::template::MqTemplate;

type Handler<M> = Box<dyn Fn(&Envelope<M>) -> HandlerResult + Send + Sync>;

/// Broadcast listener for one message type.
///
/// The channel is derived from `M` once, at construction. Every message
/// published there while the listener is subscribed is decoded and handed
/// to the handler between the template's consume hooks. Nothing is
/// acknowledged: a process that was down at publish time misses the message.
///
/// The listener copies the template's interceptor chain instead of holding
/// the template, so a store holding its subscription callback does not keep
/// the template alive.
pub struct ChannelListener<M> {
    interceptors: InterceptorChain,
    channel: String,
    handler: Handler<M>,
    _message: PhantomData<fn() -> M>,
}

impl<M: ChannelMessage> ChannelListener<M> {
    /// Fails fast if `M`'s routing key is unusable, rather than dropping
    /// traffic later.
    pub fn new<F>(template: &MqTemplate, handler: F) -> Result<Self, MqError>
    where
        F: Fn(&Envelope<M>) -> HandlerResult + Send + Sync + 'static,
    {
        let channel = M::routing_key().into_owned();
        validate_routing_key(&channel)?;
        Ok(Self {
            interceptors: template.interceptors().clone(),
            channel,
            handler: Box::new(handler),
            _message: PhantomData,
        })
    }

    pub fn decode(&self, payload: &[u8]) -> Result<Envelope<M>, MqError> {
        Envelope::decode(payload).map_err(|source| MqError::Decode {
            routing_key: self.channel.clone(),
            source,
        })
    }
}

impl<M: ChannelMessage> ChannelConsumer for ChannelListener<M> {
    fn channel(&self) -> &str {
        &self.channel
    }

    /// Undecodable payloads are logged and dropped (`Ok`); a handler error is
    /// returned after the after-consume hooks ran.
    fn on_message(&self, payload: &[u8]) -> Result<(), MqError> {
        let mut envelope = match self.decode(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(channel = %self.channel, error = %err, "dropping undecodable message");
                return Ok(());
            }
        };

        self.interceptors.around_consume(
            Route::new(DeliveryKind::Broadcast, &self.channel),
            &mut envelope,
            |envelope| (self.handler)(envelope).map_err(MqError::from),
        )
    }
}
