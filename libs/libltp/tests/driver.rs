//! End-to-end checks of the test driver: spawn the tst_verdicts helper and
//! verify the verdict bits it encodes into its exit status.

use std::process::{Command, Output};

fn run_verdicts(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tst_verdicts"))
        .args(args)
        .env_remove("LTP_COLORIZE_OUTPUT")
        .output()
        .expect("spawning tst_verdicts")
}

#[test]
fn passing_test_exits_zero() {
    let out = run_verdicts(&[]);
    assert_eq!(out.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("passed   1"), "stdout: {}", stdout);
    assert!(stdout.contains("failed   0"), "stdout: {}", stdout);
}

#[test]
fn failing_test_sets_fail_bit() {
    let out = run_verdicts(&["-f"]);
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("failed   1"), "stdout: {}", stdout);
}

#[test]
fn conf_break_sets_conf_bit() {
    let out = run_verdicts(&["-c"]);
    assert_eq!(out.status.code(), Some(32));
}

#[test]
fn silent_test_is_broken() {
    let out = run_verdicts(&["-n"]);
    assert_eq!(out.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("hasn't reported results"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn warning_sets_warn_bit() {
    let out = run_verdicts(&["-w"]);
    assert_eq!(out.status.code(), Some(4));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("warnings 1"), "stdout: {}", stdout);
}
