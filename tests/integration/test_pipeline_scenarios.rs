//! End-to-end pipeline runs over fixed inputs.

use std::fs;

use factpipe_lib::counters::CounterSnapshot;
use factpipe_lib::error_sink::ErrorMode;
use factpipe_lib::pipeline::Pipeline;
use rstest::rstest;

use crate::helpers::{Workspace, assert_ascending_inputs, assert_correct_factorials};

#[test]
fn test_invalid_lines_go_to_errors_file() {
    let ws = Workspace::with_lines(&["3", "-1", "x", "5"]);
    let summary = Pipeline::new(ws.config(2)).run().unwrap();

    assert_eq!(ws.output_lines(), vec!["3 = 6", "5 = 120"]);
    assert_eq!(
        ws.error_lines(),
        vec!["Line 2: [-1] -> negative number not allowed", "Line 3: [x] -> not a valid integer"]
    );
    assert_eq!(summary.counters, CounterSnapshot {
        lines_read: 4,
        submitted: 2,
        completed: 2,
        errors: 2
    });
    assert_eq!(summary.mode, ErrorMode::SeparateFile);
}

#[test]
fn test_shared_destination_merges_raw_lines() {
    let ws = Workspace::with_lines(&["4", "y", "6"]);
    let mut config = ws.config(2);
    config.errors_path = ws.dir.path().join(".").join("output.txt");

    let summary = Pipeline::new(config).run().unwrap();

    assert_eq!(ws.output_lines(), vec!["4 = 24", "y", "6 = 720"]);
    assert_eq!(summary.mode, ErrorMode::InlineToOutput);
    assert!(!ws.errors.exists());
}

#[test]
fn test_single_worker_is_trivially_ordered() {
    let ws = Workspace::with_lines(&["2", "3", "4"]);
    Pipeline::new(ws.config(1)).run().unwrap();
    assert_eq!(ws.output_lines(), vec!["2 = 2", "3 = 6", "4 = 24"]);
}

#[test]
fn test_empty_input() {
    let ws = Workspace::with_contents("");
    let summary = Pipeline::new(ws.config(2)).run().unwrap();

    assert_eq!(fs::read_to_string(&ws.output).unwrap(), "");
    assert!(ws.error_lines().is_empty());
    assert_eq!(summary.counters, CounterSnapshot::default());
    assert_eq!(summary.lines_written, 0);
}

#[test]
fn test_every_malformed_kind_is_reported() {
    let ws = Workspace::with_contents("   \n+7\n007\n1.5\n-0\n99999999999999999999\n");
    let summary = Pipeline::new(ws.config(3)).run().unwrap();

    // Results echo the parsed value, not the original text.
    assert_eq!(ws.output_lines(), vec!["7 = 5040", "7 = 5040", "0 = 1"]);
    assert_eq!(ws.error_lines(), vec![
        "Line 1: [   ] -> empty/whitespace line",
        "Line 4: [1.5] -> not a valid integer",
        "Line 6: [99999999999999999999] -> not a valid integer",
    ]);
    assert_eq!(summary.counters.errors, 3);
}

#[test]
fn test_unterminated_last_line_is_processed() {
    let ws = Workspace::with_contents("5\n6");
    Pipeline::new(ws.config(2)).run().unwrap();
    assert_eq!(ws.output_lines(), vec!["5 = 120", "6 = 720"]);
}

#[test]
fn test_crlf_input() {
    let ws = Workspace::with_contents("3\r\nz\r\n4\r\n");
    Pipeline::new(ws.config(2)).run().unwrap();
    assert_eq!(ws.output_lines(), vec!["3 = 6", "4 = 24"]);
    assert_eq!(ws.error_lines(), vec!["Line 2: [z] -> not a valid integer"]);
}

#[test]
fn test_large_values_are_exact() {
    let ws = Workspace::with_lines(&["25", "50", "100", "21"]);
    Pipeline::new(ws.config(4)).run().unwrap();

    let lines = ws.output_lines();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "25 = 15511210043330985984000000");
    assert_correct_factorials(&lines);
}

#[test]
fn test_rerun_is_byte_identical() {
    let ws = Workspace::with_lines(&["10", "oops", "30", "", "25", "-3", "0", "40"]);
    let config = ws.config(3);

    Pipeline::new(config.clone()).run().unwrap();
    let first_output = fs::read(&ws.output).unwrap();
    let first_errors = fs::read(&ws.errors).unwrap();

    Pipeline::new(config).run().unwrap();
    assert_eq!(fs::read(&ws.output).unwrap(), first_output);
    assert_eq!(fs::read(&ws.errors).unwrap(), first_errors);
}

#[test]
fn test_stale_output_and_errors_are_truncated() {
    let ws = Workspace::with_lines(&["1"]);
    fs::write(&ws.output, "old output\nmore\n").unwrap();
    fs::write(&ws.errors, "old errors\n").unwrap();

    Pipeline::new(ws.config(1)).run().unwrap();
    assert_eq!(ws.output_lines(), vec!["1 = 1"]);
    assert!(ws.error_lines().is_empty());
}

#[test]
fn test_output_directories_are_created() {
    let ws = Workspace::with_lines(&["2", "q"]);
    let mut config = ws.config(1);
    config.output_path = ws.dir.path().join("out").join("results.txt");
    config.errors_path = ws.dir.path().join("logs").join("errors.txt");

    Pipeline::new(config.clone()).run().unwrap();
    assert_eq!(fs::read_to_string(&config.output_path).unwrap(), "2 = 2\n");
    assert_eq!(
        fs::read_to_string(&config.errors_path).unwrap(),
        "Line 2: [q] -> not a valid integer\n"
    );
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(8)]
fn test_output_matches_valid_lines_for_any_pool_size(#[case] pool_size: usize) {
    let lines: Vec<String> = (0..60)
        .map(|i| if i % 7 == 3 { format!("bad{i}") } else { i.to_string() })
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let ws = Workspace::with_lines(&refs);

    let summary = Pipeline::new(ws.config(pool_size)).run().unwrap();

    let output = ws.output_lines();
    let expected: Vec<i64> = (0..60).filter(|i| i % 7 != 3).collect();
    let written: Vec<i64> =
        output.iter().map(|l| crate::helpers::parse_result_line(l).0).collect();
    assert_eq!(written, expected);
    assert_ascending_inputs(&output);
    assert_correct_factorials(&output);

    assert_eq!(summary.counters.submitted, expected.len() as u64);
    assert_eq!(summary.counters.completed, summary.counters.submitted);
    assert_eq!(summary.counters.errors, 60 - expected.len() as u64);
    assert_eq!(summary.counters.lines_read, 60);
}
