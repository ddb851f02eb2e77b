//! Custom assertion helpers for integration tests.

#![allow(dead_code)]

/// Parses a `"<n> = <value>"` output line.
///
/// # Panics
///
/// Panics if the line is not a result line.
pub fn parse_result_line(line: &str) -> (i64, String) {
    let (input, value) = line.split_once(" = ").unwrap_or_else(|| panic!("Not a result: {line}"));
    (input.parse().unwrap_or_else(|_| panic!("Bad input in {line}")), value.to_string())
}

/// Asserts every line is a correct factorial result.
pub fn assert_correct_factorials(lines: &[String]) {
    for line in lines {
        let (n, value) = parse_result_line(line);
        assert_eq!(value, factorial(n).to_string(), "Wrong value for {n}");
    }
}

/// Reference factorial, computed independently of the library.
pub fn factorial(n: i64) -> num_bigint::BigUint {
    (1..=n.max(0) as u64).fold(num_bigint::BigUint::from(1u32), |acc, i| acc * i)
}

/// Asserts that result lines appear with strictly ascending inputs, for inputs
/// that were written in ascending order.
pub fn assert_ascending_inputs(lines: &[String]) {
    let inputs: Vec<i64> = lines.iter().map(|l| parse_result_line(l).0).collect();
    for pair in inputs.windows(2) {
        assert!(pair[0] < pair[1], "Out of order: {} before {}", pair[0], pair[1]);
    }
}
