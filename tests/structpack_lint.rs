//! Runs the `structpack_lint` binary over arguments and stdin.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn lint(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_structpack_lint"))
        .args(args)
        .output()
        .expect("run structpack_lint")
}

fn lint_stdin(input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_structpack_lint"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn structpack_lint");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for structpack_lint")
}

#[test]
fn test_valid_formats_pass() {
    let out = lint(&[">4s h i 4(4B Q)", "B"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, ["arg1: ok: 23 fields, 58 bytes", "arg2: ok: 1 fields, 1 bytes"]);
}

#[test]
fn test_invalid_format_reports_column_and_rule() {
    let out = lint(&["B", ">4s h i 4(4P Q)", "[2B"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        [
            "arg1: ok: 1 fields, 1 bytes",
            "arg2:12: error: invalid format string: invalid character 'P' at 11 [invalid-character]",
            "arg3:1: error: invalid array syntax at 0 [array-syntax]",
        ]
    );
    assert!(String::from_utf8_lossy(&out.stderr).contains("lint: 2 of 3 format string(s) invalid"));
}

#[test]
fn test_stdin_skips_blank_and_comment_lines() {
    let out = lint_stdin("# record formats\n\n<B\n(B)\n");
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        [
            "<stdin>:3: ok: 1 fields, 1 bytes",
            "<stdin>:4:1: error: invalid format string: group at 0 has no repeat count [group-start]",
        ]
    );
}

#[test]
fn test_layout_flag_prints_table() {
    let out = lint(&["--layout", "2(H)"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("arg1: ok: 2 fields, 4 bytes"));
    assert_eq!(lines.next(), Some("2(H) (little-endian, 2 fields, 4 bytes)"));
    assert_eq!(stdout.lines().count(), 1 + 2 + 2);
}
