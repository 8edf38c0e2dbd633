//! Helpers for driving the runner against stub executables.

// Each test binary compiles its own copy; not all of them use every helper.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Shell preamble for stubs that records each invocation's argv,
/// tab-separated one line per call, in `calls.log` beside the script.
pub const LOG_ARGS: &str = concat!(
    "dir=$(dirname \"$0\")\n",
    "printf '%s\\t' \"$@\" >> \"$dir/calls.log\"\n",
    "printf '\\n' >> \"$dir/calls.log\"",
);

/// Write an executable shell script that stands in for the claude binary.
#[cfg(unix)]
pub fn fake_claude(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("claude-stub");
    let script = format!("#!/bin/sh\n{}\n", body);
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Argument vectors recorded by a [`LOG_ARGS`] stub, one per invocation.
pub fn recorded_calls(dir: &Path) -> Vec<Vec<String>> {
    let raw = std::fs::read_to_string(dir.join("calls.log")).unwrap_or_default();
    raw.lines()
        .map(|line| {
            line.split('\t')
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// The `-p` value of one recorded invocation.
pub fn prompt_of(call: &[String]) -> &str {
    assert_eq!(call.first().map(String::as_str), Some("-p"));
    &call[1]
}

/// Whether a recorded invocation carries `--resume <session_id>`.
pub fn resumes_with(call: &[String], session_id: &str) -> bool {
    call.windows(2)
        .any(|pair| pair[0] == "--resume" && pair[1] == session_id)
}
