//! Ordering, rate limiting and accounting under concurrent execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use factpipe_lib::compute::Evaluate;
use factpipe_lib::errors::ComputeError;
use factpipe_lib::pipeline::Pipeline;
use num_bigint::BigUint;

use crate::helpers::{ReversedDelays, Workspace, assert_correct_factorials, factorials};

#[test]
fn test_later_completions_do_not_overtake_earlier_lines() {
    let ws = Workspace::with_lines(&["1", "2", "3", "4", "5", "6", "7", "8"]);
    let evaluator = Arc::new(ReversedDelays {
        inner: factorials(),
        unit: Duration::from_millis(15),
        max: 8,
    });

    let summary = Pipeline::with_evaluator(ws.config(8), evaluator).run().unwrap();

    let expected: Vec<String> =
        ["1 = 1", "2 = 2", "3 = 6", "4 = 24", "5 = 120", "6 = 720", "7 = 5040", "8 = 40320"]
            .iter()
            .map(ToString::to_string)
            .collect();
    assert_eq!(ws.output_lines(), expected);
    assert_eq!(summary.counters.completed, 8);
}

#[test]
fn test_rate_limit_spaces_completions() {
    let ws = Workspace::with_lines(&["1", "2", "3", "4", "5", "6"]);
    let mut config = ws.config(3);
    config.rate_per_second = 10;

    let start = Instant::now();
    let summary = Pipeline::new(config).run().unwrap();
    let elapsed = start.elapsed();

    // Six permits at 10/s: the first is free, the other five are 100 ms apart.
    assert!(elapsed >= Duration::from_millis(480), "finished in {elapsed:?}");
    assert_eq!(summary.rate_per_second, 10);
    assert_eq!(ws.output_lines().len(), 6);
}

#[test]
fn test_non_positive_rate_is_clamped_to_one() {
    let ws = Workspace::with_lines(&["3"]);
    let mut config = ws.config(1);
    config.rate_per_second = 0;

    let summary = Pipeline::new(config).run().unwrap();
    assert_eq!(summary.rate_per_second, 1);
    assert_eq!(ws.output_lines(), vec!["3 = 6"]);
}

#[test]
fn test_all_submitted_jobs_complete_before_shutdown() {
    let lines: Vec<String> = (0..200).map(|i| (i % 60).to_string()).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let ws = Workspace::with_lines(&refs);

    let summary = Pipeline::new(ws.config(6)).run().unwrap();

    assert_eq!(summary.counters.submitted, 200);
    assert_eq!(summary.counters.completed, 200);
    assert_eq!(summary.lines_written, 200);
    let output = ws.output_lines();
    assert_eq!(output.len(), 200);
    assert_correct_factorials(&output);
    for (i, line) in output.iter().enumerate() {
        assert!(line.starts_with(&format!("{} = ", i % 60)), "line {i}: {line}");
    }
}

/// Fails every third evaluation by panicking.
struct Flaky {
    calls: AtomicUsize,
}

impl Evaluate for Flaky {
    fn evaluate(&self, n: i64) -> Result<Arc<BigUint>, ComputeError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 3 == 2 {
            panic!("injected failure for {n}");
        }
        factorials().evaluate(n)
    }
}

#[test]
fn test_failing_evaluations_are_skipped_and_counted() {
    let ws = Workspace::with_lines(&["1", "2", "3", "4", "5", "6"]);
    let evaluator = Arc::new(Flaky { calls: AtomicUsize::new(0) });

    let summary = Pipeline::with_evaluator(ws.config(1), evaluator).run().unwrap();

    assert_eq!(ws.output_lines(), vec!["1 = 1", "2 = 2", "4 = 24", "5 = 120"]);
    assert_eq!(summary.counters.submitted, 6);
    assert_eq!(summary.counters.completed, 6);
    assert_eq!(summary.counters.errors, 2);
    assert!(summary.is_success());
}

#[test]
fn test_shared_cache_is_consistent_across_workers() {
    let lines: Vec<&str> = std::iter::repeat_n("150", 40).collect();
    let ws = Workspace::with_lines(&lines);

    Pipeline::new(ws.config(8)).run().unwrap();

    let output = ws.output_lines();
    assert_eq!(output.len(), 40);
    assert!(output.windows(2).all(|w| w[0] == w[1]));
    assert_correct_factorials(&output[..1]);
}
