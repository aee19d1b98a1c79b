use std::sync::Arc;

use tracing::warn;

use super::{Interceptor, InterceptorError, MessageContext};
use crate::error::MqError;
use crate::message::{DeliveryKind, Envelope};
use crate::store::EntryId;

/// Where the wrapped operation is headed (send) or came from (consume).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Route<'a> {
    pub kind: DeliveryKind,
    pub routing_key: &'a str,
    pub entry_id: Option<EntryId>,
}

impl<'a> Route<'a> {
    pub fn new(kind: DeliveryKind, routing_key: &'a str) -> Self {
        Self {
            kind,
            routing_key,
            entry_id: None,
        }
    }

    pub fn entry(routing_key: &'a str, entry_id: EntryId) -> Self {
        Self {
            kind: DeliveryKind::Stream,
            routing_key,
            entry_id: Some(entry_id),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Send,
    Consume,
}

impl Stage {
    fn before(
        self,
        interceptor: &dyn Interceptor,
        ctx: &mut MessageContext<'_>,
    ) -> Result<(), InterceptorError> {
        match self {
            Stage::Send => interceptor.before_send(ctx),
            Stage::Consume => interceptor.before_consume(ctx),
        }
    }

    fn after(
        self,
        interceptor: &dyn Interceptor,
        ctx: &mut MessageContext<'_>,
        failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        match self {
            Stage::Send => interceptor.after_send(ctx, failure),
            Stage::Consume => interceptor.after_consume(ctx, failure),
        }
    }
}

/// Ordered interceptors of one template.
///
/// Built once at startup and then only read, so it is shared between
/// threads without locking.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// `assigned_id` extracts the entry ID a successful write produced, so
    /// after-send hooks can see it.
    pub(crate) fn around_send<T, R, F>(
        &self,
        route: Route<'_>,
        envelope: &mut Envelope<T>,
        assigned_id: fn(&R) -> Option<EntryId>,
        op: F,
    ) -> Result<R, MqError>
    where
        F: FnOnce(&Envelope<T>) -> Result<R, MqError>,
    {
        self.wrap(0, Stage::Send, route, envelope, assigned_id, op)
    }

    pub(crate) fn around_consume<T, R, F>(
        &self,
        route: Route<'_>,
        envelope: &mut Envelope<T>,
        op: F,
    ) -> Result<R, MqError>
    where
        F: FnOnce(&Envelope<T>) -> Result<R, MqError>,
    {
        self.wrap(0, Stage::Consume, route, envelope, |_| None, op)
    }

    /// Runs interceptor `index`'s before-hook, everything inside it, then its
    /// after-hook. Unwinding the recursion yields the reverse after order.
    fn wrap<T, R, F>(
        &self,
        index: usize,
        stage: Stage,
        route: Route<'_>,
        envelope: &mut Envelope<T>,
        assigned_id: fn(&R) -> Option<EntryId>,
        op: F,
    ) -> Result<R, MqError>
    where
        F: FnOnce(&Envelope<T>) -> Result<R, MqError>,
    {
        let Some(interceptor) = self.interceptors.get(index) else {
            return op(&*envelope);
        };

        let mut ctx = MessageContext::new(
            route.kind,
            route.routing_key,
            route.entry_id,
            &mut envelope.headers,
        );
        stage.before(interceptor.as_ref(), &mut ctx)?;

        let result = self.wrap(index + 1, stage, route, envelope, assigned_id, op);

        let entry_id = route
            .entry_id
            .or_else(|| result.as_ref().ok().and_then(assigned_id));
        let mut ctx =
            MessageContext::new(route.kind, route.routing_key, entry_id, &mut envelope.headers);
        let after = stage.after(interceptor.as_ref(), &mut ctx, result.as_ref().err());

        match (result, after) {
            (result, Ok(())) => result,
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(original), Err(err)) => {
                // The operation's own failure is the one worth reporting.
                warn!(
                    routing_key = %route.routing_key,
                    error = %err,
                    "after-hook failed on an already failed operation"
                );
                Err(original)
            }
        }
    }
}
