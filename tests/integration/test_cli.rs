//! End-to-end CLI tests.
//!
//! These run the actual `factpipe` binary.

use std::fs;
use std::process::Command;

use crate::helpers::Workspace;

fn factpipe() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_factpipe"));
    command.env("RUST_LOG", "warn");
    command
}

#[test]
fn test_run_command_with_flags() {
    let ws = Workspace::with_lines(&["3", "-1", "x", "5"]);

    let output = factpipe()
        .current_dir(ws.dir.path())
        .args([
            "run",
            "--input",
            ws.input.to_str().unwrap(),
            "--output",
            ws.output.to_str().unwrap(),
            "--errors",
            ws.errors.to_str().unwrap(),
            "--pool-size",
            "2",
            "--follow-idle-ms",
            "0",
            "--progress-interval-ms",
            "0",
        ])
        .output()
        .expect("Failed to run factpipe");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(ws.output_lines(), vec!["3 = 6", "5 = 120"]);
    assert_eq!(ws.error_lines().len(), 2);

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Progress | read 4 | submitted 2 | completed 2 | errors 2 | pool 2 |"));
    assert!(stdout.contains("mode=SEPARATE_FILE"));
}

#[test]
fn test_run_command_reads_config_file() {
    let ws = Workspace::with_lines(&["4", "y", "6"]);
    fs::write(
        ws.dir.path().join("factpipe.toml"),
        "input_path = \"input.txt\"\n\
         output_path = \"output.txt\"\n\
         errors_path = \"output.txt\"\n\
         pool_size = 3\n\
         follow_idle_ms = 0\n\
         progress_interval_ms = 0\n",
    )
    .unwrap();

    let output = factpipe()
        .current_dir(ws.dir.path())
        .args(["run", "--rate", "-5"])
        .output()
        .expect("Failed to run factpipe");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(ws.output_lines(), vec!["4 = 24", "y", "6 = 720"]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("pool 3 | rate 1/s | mode=INLINE_TO_OUTPUT"), "{stdout}");
}

#[test]
fn test_run_command_fails_on_missing_input() {
    let ws = Workspace::with_contents("");
    let missing = ws.dir.path().join("missing.txt");

    let status = factpipe()
        .current_dir(ws.dir.path())
        .args(["run", "-i", missing.to_str().unwrap(), "-f", "0"])
        .status()
        .expect("Failed to run factpipe");
    assert!(!status.success());
}

#[test]
fn test_run_command_rejects_zero_pool_size() {
    let ws = Workspace::with_lines(&["1"]);

    let status = factpipe()
        .current_dir(ws.dir.path())
        .args(["run", "-i", ws.input.to_str().unwrap(), "-t", "0", "-f", "0"])
        .status()
        .expect("Failed to run factpipe");
    assert!(!status.success());
    assert!(!ws.output.exists());
}

#[test]
fn test_run_command_rejects_bad_config() {
    let ws = Workspace::with_lines(&["1"]);
    let config = ws.dir.path().join("bad.toml");
    fs::write(&config, "pool_size = \"many\"\n").unwrap();

    let output = factpipe()
        .current_dir(ws.dir.path())
        .args(["run", "--config", config.to_str().unwrap()])
        .output()
        .expect("Failed to run factpipe");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bad.toml"));
}

#[test]
fn test_factorial_command() {
    let output = factpipe().args(["factorial", "25"]).output().expect("Failed to run factpipe");
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "25 = 15511210043330985984000000\n");
}

#[test]
fn test_factorial_command_rejects_negative() {
    let output = factpipe().args(["factorial", "-3"]).output().expect("Failed to run factpipe");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("negative"));
}

#[test]
fn test_factorial_command_rejects_out_of_range_arguments() {
    let output =
        factpipe().args(["factorial", "2147483648"]).output().expect("Failed to run factpipe");
    assert!(!output.status.success());

    let output = factpipe()
        .args(["factorial", "5", "--small-max", "100001"])
        .output()
        .expect("Failed to run factpipe");
    assert!(!output.status.success());
}
