use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

use super::StreamConsumer;
use crate::error::{HandlerResult, MqError};
use crate::interceptor::Route;
use crate::message::{validate_routing_key, Envelope, StreamMessage};
use crate::store::{EntryId, StreamEntry};
use crate::template::MqTemplate;

type Handler<M> = Box<dyn Fn(&Envelope<M>) -> HandlerResult + Send + Sync>;

/// Consumer-group listener for one message type.
///
/// The stream key comes from `M`; the group defaults to the template's
/// application name so membership survives restarts. An entry is
/// acknowledged only when the handler and every after-consume hook
/// succeeded; otherwise it stays pending until the redelivery job picks it up.
pub struct StreamListener<M> {
    template: Arc<MqTemplate>,
    stream_key: String,
    group: String,
    handler: Handler<M>,
    _message: PhantomData<fn() -> M>,
}

impl<M: StreamMessage> StreamListener<M> {
    pub fn new<F>(template: Arc<MqTemplate>, handler: F) -> Result<Self, MqError>
    where
        F: Fn(&Envelope<M>) -> HandlerResult + Send + Sync + 'static,
    {
        let stream_key = M::routing_key().into_owned();
        validate_routing_key(&stream_key)?;
        let group = template.config().application_name.clone();
        validate_routing_key(&group)?;
        Ok(Self {
            template,
            stream_key,
            group,
            handler: Box::new(handler),
            _message: PhantomData,
        })
    }

    /// Use an explicit consumer group instead of the application name.
    pub fn with_group(mut self, group: impl Into<String>) -> Result<Self, MqError> {
        let group = group.into();
        validate_routing_key(&group)?;
        self.group = group;
        Ok(self)
    }

    pub fn decode(&self, payload: &[u8]) -> Result<Envelope<M>, MqError> {
        Envelope::decode(payload).map_err(|source| MqError::Decode {
            routing_key: self.stream_key.clone(),
            source,
        })
    }

    fn acknowledge(&self, id: &EntryId) -> Result<(), MqError> {
        let acked = self
            .template
            .store()
            .stream_ack(&self.stream_key, &self.group, id)?;
        if !acked {
            debug!(stream = %self.stream_key, group = %self.group, id = %id, "entry was no longer pending");
        }
        Ok(())
    }
}

impl<M: StreamMessage> StreamConsumer for StreamListener<M> {
    fn stream_key(&self) -> &str {
        &self.stream_key
    }

    fn group(&self) -> &str {
        &self.group
    }

    /// An undecodable entry is logged and acknowledged, so it is dropped
    /// rather than redelivered forever.
    fn on_entry(&self, entry: &StreamEntry) -> Result<(), MqError> {
        let mut envelope = match self.decode(&entry.payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(stream = %self.stream_key, id = %entry.id, error = %err, "dropping undecodable entry");
                return self.acknowledge(&entry.id);
            }
        };

        self.template.interceptors().around_consume(
            Route::entry(&self.stream_key, entry.id),
            &mut envelope,
            |envelope| (self.handler)(envelope).map_err(MqError::from),
        )?;

        self.acknowledge(&entry.id)
    }
}
