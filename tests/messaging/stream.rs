use std::sync::{Arc, Mutex};

use redis_mq::store::{InMemoryStore, Store};
use redis_mq::{Envelope, HandlerError, StreamListener, StreamListenerContainer};

use crate::support::{entries, template, FailingAfterConsume, Job, Log, Recorder};

#[test]
fn handled_entry_is_acked_once_and_leaves_pending() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let mut container = StreamListenerContainer::new(&template);
    container
        .register(
            StreamListener::new(template.clone(), move |envelope: &Envelope<Job>| {
                sink.lock().unwrap().push(envelope.payload.clone());
                Ok(())
            })
            .unwrap(),
        )
        .unwrap();

    let id = template.send(Job { id: 42 }).unwrap();
    let stats = container.poll_once();
    container.poll_once();

    assert_eq!(stats.handled, 1);
    assert_eq!(*seen.lock().unwrap(), vec![Job { id: 42 }]);
    assert_eq!(store.acknowledged("Job", "svc"), vec![id]);
    assert!(store.stream_pending_summary("Job", "svc").unwrap().is_empty());
}

#[test]
fn failed_handler_leaves_entry_pending_for_its_consumer() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));

    let mut container = StreamListenerContainer::new(&template);
    container
        .register(
            StreamListener::new(template.clone(), |_: &Envelope<Job>| {
                Err(HandlerError::failed("db down"))
            })
            .unwrap(),
        )
        .unwrap();

    template.send(Job { id: 42 }).unwrap();
    let stats = container.poll_once();

    assert_eq!(stats.failed, 1);
    assert!(store.acknowledged("Job", "svc").is_empty());
    let summary = store.stream_pending_summary("Job", "svc").unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.consumers.get("svc-1"), Some(&1));
}

#[test]
fn failing_after_consume_hook_blocks_the_ack() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store).with_interceptor(FailingAfterConsume));

    let mut container = StreamListenerContainer::new(&template);
    container
        .register(StreamListener::new(template.clone(), |_: &Envelope<Job>| Ok(())).unwrap())
        .unwrap();

    template.send(Job { id: 1 }).unwrap();

    assert_eq!(container.poll_once().failed, 1);
    assert_eq!(store.stream_pending_summary("Job", "svc").unwrap().total, 1);
}

#[test]
fn group_members_share_the_stream() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));
    let mut first = StreamListenerContainer::new(&template).with_consumer_name("svc-1");
    let mut second = StreamListenerContainer::new(&template).with_consumer_name("svc-2");
    for container in [&mut first, &mut second] {
        container
            .register(StreamListener::new(template.clone(), |_: &Envelope<Job>| Ok(())).unwrap())
            .unwrap();
    }

    template.send(Job { id: 1 }).unwrap();
    template.send(Job { id: 2 }).unwrap();

    let a = first.poll_once();
    let b = second.poll_once();
    assert_eq!(a.handled + b.handled, 2);
    assert_eq!(store.acknowledged("Job", "svc").len(), 2);
}

#[test]
fn separate_groups_each_see_every_entry() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));
    let mut container = StreamListenerContainer::new(&template);
    container
        .register(StreamListener::new(template.clone(), |_: &Envelope<Job>| Ok(())).unwrap())
        .unwrap();
    container
        .register(
            StreamListener::new(template.clone(), |_: &Envelope<Job>| Ok(()))
                .unwrap()
                .with_group("audit")
                .unwrap(),
        )
        .unwrap();

    template.send(Job { id: 1 }).unwrap();

    assert_eq!(container.poll_once().handled, 2);
    assert_eq!(store.acknowledged("Job", "svc").len(), 1);
    assert_eq!(store.acknowledged("Job", "audit").len(), 1);
}

#[test]
fn consume_hooks_see_entry_headers() {
    let store = InMemoryStore::new();
    let log: Log = Arc::default();
    let template = Arc::new(template(&store).with_interceptor(Recorder::new("tenant", &log)));

    let mut container = StreamListenerContainer::new(&template);
    container
        .register(StreamListener::new(template.clone(), |_: &Envelope<Job>| Ok(())).unwrap())
        .unwrap();

    template.send(Job { id: 1 }).unwrap();
    container.poll_once();

    assert_eq!(
        entries(&log),
        vec![
            "tenant:before_send",
            "tenant:after_send",
            "tenant:before_consume+",
            "tenant:after_consume",
        ]
    );
}
