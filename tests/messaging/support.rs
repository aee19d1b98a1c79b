use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use redis_mq::store::{
    EntryId, EntryRange, InMemoryStore, PendingEntry, PendingSummary, Store, StoreError,
    StreamEntry, SubscriptionCallback, SubscriptionId,
};
use redis_mq::{
    Broadcast, Interceptor, InterceptorError, Message, MessageContext, MqConfig, MqError,
    MqTemplate, Streaming,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub text: String,
}

impl Message for Ping {
    type Model = Broadcast;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
}

impl Message for Job {
    type Model = Streaming;
}

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Template for application `svc` whose consumer name is `svc-1`.
pub fn template(store: &InMemoryStore) -> MqTemplate {
    let mut config = MqConfig::for_application("svc");
    config.consumer_name = "svc-1".into();
    MqTemplate::with_config(Arc::new(store.clone()), config)
}

/// Records every hook as `<name>:<hook>` and stamps a header on send.
pub struct Recorder {
    pub name: &'static str,
    pub log: Log,
}

impl Recorder {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Arc::clone(log),
        }
    }

    fn record(&self, hook: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, hook));
    }
}

impl Interceptor for Recorder {
    fn before_send(&self, ctx: &mut MessageContext<'_>) -> Result<(), InterceptorError> {
        self.record("before_send");
        ctx.headers_mut().insert(self.name, "1");
        Ok(())
    }

    fn after_send(
        &self,
        _ctx: &mut MessageContext<'_>,
        failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        self.record(if failure.is_some() { "after_send!" } else { "after_send" });
        Ok(())
    }

    fn before_consume(&self, ctx: &mut MessageContext<'_>) -> Result<(), InterceptorError> {
        let seen = ctx.headers().contains(self.name);
        self.record(if seen { "before_consume+" } else { "before_consume" });
        Ok(())
    }

    fn after_consume(
        &self,
        _ctx: &mut MessageContext<'_>,
        failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        self.record(if failure.is_some() { "after_consume!" } else { "after_consume" });
        Ok(())
    }
}

/// Fails every after-consume hook.
pub struct FailingAfterConsume;

impl Interceptor for FailingAfterConsume {
    fn after_consume(
        &self,
        _ctx: &mut MessageContext<'_>,
        _failure: Option<&MqError>,
    ) -> Result<(), InterceptorError> {
        Err(InterceptorError::new("metrics sink down"))
    }
}

/// An in-memory store whose pending-summary reads take `delay`, to widen the
/// window in which two redelivery runs overlap.
pub struct SlowStore {
    pub inner: InMemoryStore,
    pub delay: Duration,
}

impl Store for SlowStore {
    fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize, StoreError> {
        self.inner.publish(channel, payload)
    }

    fn subscribe(
        &self,
        channel: &str,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionId, StoreError> {
        self.inner.subscribe(channel, callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, StoreError> {
        self.inner.unsubscribe(id)
    }

    fn stream_append(&self, stream: &str, payload: &[u8]) -> Result<EntryId, StoreError> {
        self.inner.stream_append(stream, payload)
    }

    fn stream_create_group(&self, stream: &str, group: &str) -> Result<(), StoreError> {
        self.inner.stream_create_group(stream, group)
    }

    fn stream_read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        self.inner.stream_read_group(stream, group, consumer, count)
    }

    fn stream_ack(&self, stream: &str, group: &str, id: &EntryId) -> Result<bool, StoreError> {
        self.inner.stream_ack(stream, group, id)
    }

    fn stream_pending_summary(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<PendingSummary, StoreError> {
        thread::sleep(self.delay);
        self.inner.stream_pending_summary(stream, group)
    }

    fn stream_pending_detail(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        range: &EntryRange,
        count: usize,
    ) -> Result<Vec<PendingEntry>, StoreError> {
        self.inner
            .stream_pending_detail(stream, group, consumer, range, count)
    }

    fn stream_range(
        &self,
        stream: &str,
        range: &EntryRange,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        self.inner.stream_range(stream, range)
    }
}
