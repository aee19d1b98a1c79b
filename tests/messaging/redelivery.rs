use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use redis_mq::lock::{InMemoryLockManager, Lock, LockManager};
use redis_mq::store::{InMemoryStore, Store};
use redis_mq::{
    Envelope, HandlerError, MqTemplate, PendingRedeliveryJob, StreamListener,
    StreamListenerContainer, SweepOutcome,
};

use crate::support::{template, Job, SlowStore};

/// A `Job` container in group `svc` whose handler fails while `healthy` is false.
fn flaky_container(
    template: &Arc<MqTemplate>,
    healthy: &Arc<AtomicBool>,
    seen: &Arc<Mutex<Vec<u64>>>,
) -> StreamListenerContainer {
    let healthy = Arc::clone(healthy);
    let seen = Arc::clone(seen);
    let mut container = StreamListenerContainer::new(template);
    container
        .register(
            StreamListener::new(Arc::clone(template), move |envelope: &Envelope<Job>| {
                if !healthy.load(Ordering::SeqCst) {
                    return Err(HandlerError::failed("downstream unavailable"));
                }
                seen.lock().unwrap().push(envelope.payload.id);
                Ok(())
            })
            .unwrap(),
        )
        .unwrap();
    container
}

fn report(outcome: SweepOutcome) -> redis_mq::SweepReport {
    match outcome {
        SweepOutcome::Completed(report) => report,
        SweepOutcome::Skipped => panic!("expected a completed sweep"),
    }
}

#[test]
fn stuck_entry_is_redelivered_and_consumed() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));
    let healthy = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let container = flaky_container(&template, &healthy, &seen);
    let locks = Arc::new(InMemoryLockManager::new());
    let job = PendingRedeliveryJob::new(&template, container.listeners(), locks);

    let original = template.send(Job { id: 42 }).unwrap();
    assert_eq!(container.poll_once().failed, 1);

    // Nothing happens until the entry has been pending for five minutes.
    store.advance_clock(Duration::from_secs(120));
    assert_eq!(report(job.run().unwrap()).redelivered, 0);

    store.advance_clock(Duration::from_secs(181));
    assert_eq!(report(job.run().unwrap()).redelivered, 1);

    let entries = store.stream_entries("Job");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].payload, entries[1].payload);
    assert_eq!(store.acknowledged("Job", "svc"), vec![original]);

    healthy.store(true, Ordering::SeqCst);
    assert_eq!(container.poll_once().handled, 1);
    assert_eq!(*seen.lock().unwrap(), vec![42]);
    assert_eq!(store.acknowledged("Job", "svc"), vec![original, entries[1].id]);
    assert!(store.stream_pending_summary("Job", "svc").unwrap().is_empty());
}

#[test]
fn only_stale_entries_are_touched() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));
    let healthy = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let container = flaky_container(&template, &healthy, &seen);
    let job = PendingRedeliveryJob::new(
        &template,
        container.listeners(),
        Arc::new(InMemoryLockManager::new()),
    );

    template.send(Job { id: 1 }).unwrap();
    container.poll_once();
    store.advance_clock(Duration::from_secs(200));
    template.send(Job { id: 2 }).unwrap();
    container.poll_once();
    store.advance_clock(Duration::from_secs(100));

    let report = report(job.run().unwrap());
    assert_eq!(report.inspected, 2);
    assert_eq!(report.redelivered, 1);

    let summary = store.stream_pending_summary("Job", "svc").unwrap();
    assert_eq!(summary.total, 1);
    let entries = store.stream_entries("Job");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].payload_str(), Some(r#"{"id":1}"#));
}

#[test]
fn held_lock_means_no_mutations() {
    let store = InMemoryStore::new();
    let template = Arc::new(template(&store));
    let healthy = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let container = flaky_container(&template, &healthy, &seen);
    let locks = Arc::new(InMemoryLockManager::new());
    let job = PendingRedeliveryJob::new(&template, container.listeners(), locks.clone());

    template.send(Job { id: 1 }).unwrap();
    container.poll_once();
    store.advance_clock(Duration::from_secs(900));

    let other_process = locks.get_lock(job.lock_key()).unwrap();
    let token = other_process.try_lock().unwrap().unwrap();

    assert_eq!(job.run().unwrap(), SweepOutcome::Skipped);
    assert_eq!(store.stream_len("Job"), 1);
    assert_eq!(store.stream_pending_summary("Job", "svc").unwrap().total, 1);

    assert!(other_process.unlock(token).unwrap());
    assert_eq!(report(job.run().unwrap()).redelivered, 1);
}

#[test]
fn concurrent_runs_sweep_exactly_once() {
    let inner = InMemoryStore::new();
    let slow = Arc::new(SlowStore {
        inner: inner.clone(),
        delay: Duration::from_millis(200),
    });
    let template = Arc::new(MqTemplate::with_config(
        slow,
        crate::support::template(&inner).config().clone(),
    ));
    let healthy = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let container = flaky_container(&template, &healthy, &seen);

    template.send(Job { id: 7 }).unwrap();
    container.poll_once();
    inner.advance_clock(Duration::from_secs(301));

    let locks = Arc::new(InMemoryLockManager::new());
    let barrier = Arc::new(Barrier::new(2));
    let runs: Vec<_> = (0..2)
        .map(|_| {
            let job = PendingRedeliveryJob::new(&template, container.listeners(), locks.clone());
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                job.run().unwrap()
            })
        })
        .collect();

    let outcomes: Vec<SweepOutcome> = runs.into_iter().map(|h| h.join().unwrap()).collect();
    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, SweepOutcome::Completed(_)))
        .count();

    assert_eq!(completed, 1);
    assert!(outcomes.contains(&SweepOutcome::Skipped));
    assert_eq!(inner.stream_len("Job"), 2);
    assert_eq!(inner.acknowledged("Job", "svc").len(), 1);
}
