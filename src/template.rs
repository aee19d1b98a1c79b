//! The send template: the single entry point for producers.

use std::sync::Arc;

use tracing::debug;

use crate::config::MqConfig;
use crate::error::MqError;
use crate::interceptor::{Interceptor, InterceptorChain, Route};
use crate::message::{validate_routing_key, DeliveryModel, Envelope, Message, Receipt};
use crate::store::Store;

/// Sends messages to the store, wrapped by the interceptor chain.
///
/// Broadcast messages are published to their channel; stream messages are
/// appended to their stream and the new entry ID is returned. Which path a
/// send takes is decided by the message type's `Model`, at compile time.
///
/// Store failures are returned as-is and never retried here; retry policy
/// belongs to the caller.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use redis_mq::message::{Message, Streaming};
/// use redis_mq::store::InMemoryStore;
/// use redis_mq::MqTemplate;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Job { id: u64 }
///
/// impl Message for Job {
///     type Model = Streaming;
/// }
///
/// let store = InMemoryStore::new();
/// let template = MqTemplate::new(Arc::new(store.clone()));
///
/// let id = template.send(Job { id: 42 }).unwrap();
/// assert_eq!(store.stream_entries("Job")[0].id, id);
/// ```
pub struct MqTemplate {
    store: Arc<dyn Store>,
    interceptors: InterceptorChain,
    config: MqConfig,
}

impl MqTemplate {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, MqConfig::default())
    }

    pub fn with_config(store: Arc<dyn Store>, config: MqConfig) -> Self {
        Self {
            store,
            interceptors: InterceptorChain::new(),
            config,
        }
    }

    /// Register an interceptor. Uses builder pattern, returns `self`.
    pub fn with_interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.add_interceptor(Arc::new(interceptor));
        self
    }

    /// Register an interceptor after the ones already present.
    ///
    /// Only meant for startup wiring: once the template is shared, the chain
    /// is read-only.
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Send a message with empty headers.
    pub fn send<M: Message>(&self, message: M) -> Result<Receipt<M>, MqError> {
        self.send_envelope(Envelope::new(message))
    }

    /// Send a message with headers already set.
    ///
    /// After-send hooks run whether or not the store write succeeded; a
    /// failed write is returned once they have. On a successful stream
    /// append they see the new entry's ID.
    pub fn send_envelope<M: Message>(
        &self,
        mut envelope: Envelope<M>,
    ) -> Result<Receipt<M>, MqError> {
        let routing_key = M::routing_key();
        validate_routing_key(&routing_key)?;
        let kind = <M::Model as DeliveryModel>::KIND;
        let store = self.store.as_ref();

        let receipt = self.interceptors.around_send(
            Route::new(kind, &routing_key),
            &mut envelope,
            M::Model::assigned_id,
            |envelope| {
                let payload = envelope.encode().map_err(|source| MqError::Encode {
                    routing_key: routing_key.to_string(),
                    source,
                })?;
                Ok(M::Model::write(store, &routing_key, &payload)?)
            },
        )?;

        debug!(%kind, routing_key = %routing_key, receipt = ?receipt, "message sent");
        Ok(receipt)
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &MqConfig {
        &self.config
    }
}
