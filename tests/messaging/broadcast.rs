use std::sync::{Arc, Mutex};

use redis_mq::store::InMemoryStore;
use redis_mq::{ChannelListener, ChannelListenerContainer, Envelope, HandlerError, MqTemplate};

use crate::support::{entries, template, Log, Ping, Recorder};

fn collecting(template: &MqTemplate, sink: &Arc<Mutex<Vec<String>>>) -> ChannelListener<Ping> {
    let sink = Arc::clone(sink);
    ChannelListener::new(template, move |envelope: &Envelope<Ping>| {
        sink.lock().unwrap().push(envelope.payload.text.clone());
        Ok(())
    })
    .unwrap()
}

#[test]
fn every_live_subscriber_gets_one_copy() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));
    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));
    let late = Arc::new(Mutex::new(Vec::new()));

    let mut container = ChannelListenerContainer::new(&template);
    container.register(collecting(&template, &first)).unwrap();
    container.register(collecting(&template, &second)).unwrap();

    template.send(Ping { text: "hello".into() }).unwrap();
    container.register(collecting(&template, &late)).unwrap();

    assert_eq!(*first.lock().unwrap(), vec!["hello".to_string()]);
    assert_eq!(*second.lock().unwrap(), vec!["hello".to_string()]);
    assert!(late.lock().unwrap().is_empty());
    assert_eq!(store.subscriber_count("Ping"), 3);
}

#[test]
fn payload_survives_the_round_trip() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let mut container = ChannelListenerContainer::new(&template);
    container
        .register(
            ChannelListener::new(&template, move |envelope: &Envelope<Ping>| {
                sink.lock().unwrap().push(envelope.payload.clone());
                Ok(())
            })
            .unwrap(),
        )
        .unwrap();

    let sent = Ping {
        text: "ünïcode \"quoted\"".into(),
    };
    template.send(sent.clone()).unwrap();

    assert_eq!(*received.lock().unwrap(), vec![sent]);
}

#[test]
fn hooks_wrap_send_and_consume_symmetrically() {
    let store = InMemoryStore::new();
    let log: Log = Arc::default();
    let template = Arc::new(
        template(&store)
            .with_interceptor(Recorder::new("a", &log))
            .with_interceptor(Recorder::new("b", &log)),
    );
    let handled = log.clone();

    let mut container = ChannelListenerContainer::new(&template);
    container
        .register(
            ChannelListener::new(&template, move |_: &Envelope<Ping>| {
                handled.lock().unwrap().push("handler".into());
                Ok(())
            })
            .unwrap(),
        )
        .unwrap();

    template.send(Ping { text: "x".into() }).unwrap();

    // Delivery is synchronous, so consume runs inside the store write.
    assert_eq!(
        entries(&log),
        vec![
            "a:before_send",
            "b:before_send",
            "a:before_consume+",
            "b:before_consume+",
            "handler",
            "b:after_consume",
            "a:after_consume",
            "b:after_send",
            "a:after_send",
        ]
    );
}

#[test]
fn failing_handler_does_not_fail_the_sender() {
    let store = InMemoryStore::new();
    let log: Log = Arc::default();
    let template = Arc::new(template(&store).with_interceptor(Recorder::new("a", &log)));

    let mut container = ChannelListenerContainer::new(&template);
    container
        .register(
            ChannelListener::new(&template, |_: &Envelope<Ping>| {
                Err(HandlerError::failed("nope"))
            })
            .unwrap(),
        )
        .unwrap();

    template.send(Ping { text: "x".into() }).unwrap();

    assert!(entries(&log).contains(&"a:after_consume!".to_string()));
    assert_eq!(entries(&log).last().map(String::as_str), Some("a:after_send"));
}

#[test]
fn send_failure_still_runs_after_hooks_in_reverse() {
    let store = InMemoryStore::new();
    let log: Log = Arc::default();
    let template = template(&store)
        .with_interceptor(Recorder::new("a", &log))
        .with_interceptor(Recorder::new("b", &log));

    store.set_available(false);
    assert!(template.send(Ping { text: "x".into() }).is_err());

    assert_eq!(
        entries(&log),
        vec!["a:before_send", "b:before_send", "b:after_send!", "a:after_send!"]
    );
}
