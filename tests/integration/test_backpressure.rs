//! Admission backpressure and rejection, with the components wired by hand so
//! the tests can hold the workers back.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use factpipe_lib::admission::FairSemaphore;
use factpipe_lib::counters::PipelineCounters;
use factpipe_lib::error_sink::ErrorSink;
use factpipe_lib::message::Message;
use factpipe_lib::rate_limiter::RateLimiter;
use factpipe_lib::reader::{LineReader, TailSettings};
use factpipe_lib::worker_pool::WorkerPool;
use factpipe_lib::writer::ResultWriter;

use crate::helpers::{Gated, Workspace, factorials};

fn once() -> TailSettings {
    TailSettings { follow_idle: Duration::ZERO, poll_interval: Duration::from_millis(10) }
}

#[test]
fn test_reader_stalls_while_the_only_worker_is_busy() {
    let ws = Workspace::with_lines(&["3", "4", "5"]);
    let (gate_tx, gate_rx) = unbounded();
    let (results_tx, results_rx) = unbounded();
    let counters = Arc::new(PipelineCounters::new());
    let slots = Arc::new(FairSemaphore::new(1));

    let mut pool = WorkerPool::start(
        1,
        4,
        Arc::new(Gated { inner: factorials(), gate: gate_rx }),
        Arc::new(RateLimiter::new(100_000)),
        results_tx.clone(),
        Arc::clone(&counters),
    )
    .unwrap();

    let reader = LineReader::new(
        &ws.input,
        results_tx.clone(),
        ErrorSink::to_file(&ws.errors).unwrap(),
        pool.submitter().unwrap(),
        Arc::clone(&slots),
        Arc::clone(&counters),
        once(),
    );
    let reader = thread::spawn(move || reader.run());

    // The first job holds the single admission unit; the reader blocks on the
    // second line instead of queueing it.
    thread::sleep(Duration::from_millis(200));
    assert_eq!(counters.submitted(), 1);
    assert_eq!(counters.lines_read(), 2);
    assert_eq!(slots.available_permits(), 0);
    assert!(!reader.is_finished());

    for _ in 0..3 {
        gate_tx.send(()).unwrap();
    }
    assert_eq!(reader.join().unwrap().unwrap(), 3);
    counters.wait_for_drain();
    pool.shutdown();
    results_tx.send(Message::Poison).unwrap();

    let mut out = Vec::new();
    let stats = ResultWriter::new(&mut out).run(&results_rx).unwrap();
    assert_eq!(stats.lines_written, 3);
    assert_eq!(String::from_utf8(out).unwrap(), "3 = 6\n4 = 24\n5 = 120\n");
    assert_eq!(counters.errors(), 0);
}

#[test]
fn test_rejected_lines_are_skipped_and_counted_once() {
    let ws = Workspace::with_lines(&["3", "bad", "4", "5"]);
    let (results_tx, results_rx) = unbounded();
    let counters = Arc::new(PipelineCounters::new());

    let mut pool = WorkerPool::start(
        2,
        8,
        Arc::new(factorials()),
        Arc::new(RateLimiter::new(100_000)),
        results_tx.clone(),
        Arc::clone(&counters),
    )
    .unwrap();
    // A closed pool rejects every submission.
    pool.close();

    let slots = Arc::new(FairSemaphore::new(2));
    let reader = LineReader::new(
        &ws.input,
        results_tx.clone(),
        ErrorSink::to_file(&ws.errors).unwrap(),
        pool.submitter().unwrap(),
        Arc::clone(&slots),
        Arc::clone(&counters),
        once(),
    );
    assert_eq!(reader.run().unwrap(), 4);
    pool.shutdown();
    results_tx.send(Message::Poison).unwrap();

    let mut out = Vec::new();
    let stats = ResultWriter::new(&mut out).run(&results_rx).unwrap();

    assert!(out.is_empty());
    assert_eq!(stats.indices_consumed, 4);
    assert_eq!(counters.submitted(), 0);
    // Three rejections plus one malformed line.
    assert_eq!(counters.errors(), 4);
    assert_eq!(slots.available_permits(), 2);
    assert_eq!(ws.error_lines(), vec!["Line 2: [bad] -> not a valid integer"]);
}
