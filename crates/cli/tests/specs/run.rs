// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `sbx run`.

use crate::prelude::*;

#[test]
fn echo_prints_and_succeeds() {
    let sandbox = Sandbox::new();
    sandbox
        .sbx()
        .args(&["run", "--", "echo Hello, World!"])
        .passes()
        .stdout_has("Hello, World!")
        .stderr_has("success");
}

#[test]
fn directive_outputs_are_reported_in_json() {
    let sandbox = Sandbox::new();
    let out = sandbox
        .sbx()
        .args(&["run", "--format", "json", "--", r#"echo '::{"outputs":{"someOutput":"X"}}::'"#, "echo plain"])
        .passes();
    let json = out.json();

    assert_eq!(json["state"], "success");
    assert_eq!(json["outputs"]["someOutput"], "X");
    assert_eq!(json["std_out_line_count"], 2);
    assert!(out.stderr().contains("plain"));
}

#[test]
fn failing_command_exit_code_is_propagated() {
    let sandbox = Sandbox::new();
    sandbox.sbx().args(&["run", "--", "echo partial", "exit 7"]).exits(7).stderr_has("failed");
}

#[test]
fn stderr_output_is_a_warning_but_exits_zero() {
    let sandbox = Sandbox::new();
    sandbox.sbx().args(&["run", "--", "echo careful >&2"]).passes().stderr_has("warning");
    sandbox
        .sbx()
        .args(&["run", "--no-warning-on-stderr", "--", "echo careful >&2"])
        .passes()
        .stderr_has("success");
}

#[test]
fn timeout_exits_124() {
    let sandbox = Sandbox::new();
    sandbox.sbx().args(&["run", "--timeout", "1", "--", "echo started", "sleep 30"]).exits(124).stderr_has("timed out");
}

#[test]
fn missing_required_output_exits_3() {
    let sandbox = Sandbox::new();
    sandbox
        .sbx()
        .args(&["run", "--require-output", "report.json", "--", "true"])
        .exits(3)
        .stderr_has("report.json");
}

#[test]
fn inputs_are_staged_and_outputs_stored() {
    let sandbox = Sandbox::new();
    let input = sandbox.file("host/names.txt", "ada\ngrace\n");
    let out = sandbox
        .sbx()
        .args(&[
            "run",
            "--format",
            "json",
            "--input",
            &format!("names.txt={}", input.display()),
            "--output",
            "*.out",
            "--",
            "sort -r names.txt > sorted.out",
        ])
        .passes();

    let json = out.json();
    let key = json["output_files"]["sorted.out"].as_str().unwrap();
    assert_eq!(std::fs::read_to_string(sandbox.store().join(key)).unwrap(), "grace\nada\n");
}

#[test]
fn template_vars_and_env_reach_the_script() {
    let sandbox = Sandbox::new();
    sandbox
        .sbx()
        .args(&["run", "--var", "name=world", "-e", "GREETING=hi", "--", "echo {{ name }}-$GREETING"])
        .passes()
        .stdout_has("world-hi");
}

#[test]
fn argv_mode_with_unknown_program_is_infrastructure_error() {
    let sandbox = Sandbox::new();
    sandbox.sbx().args(&["run", "--argv", "--", "sbx-no-such-program"]).exits(125);
}

#[test]
fn container_flags_need_container_runner() {
    let sandbox = Sandbox::new();
    sandbox
        .sbx()
        .args(&["run", "--image", "alpine", "--", "true"])
        .exits(2)
        .stderr_has("container runner");
}

#[test]
fn log_dir_receives_run_log() {
    let sandbox = Sandbox::new();
    let logs = sandbox.logs();
    sandbox
        .sbx()
        .args(&["run", "--log-dir", logs.to_str().unwrap(), "--", "echo logged", "echo oops >&2"])
        .passes();

    let run_logs: Vec<_> = std::fs::read_dir(logs.join("run")).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(run_logs.len(), 1);
    let content = std::fs::read_to_string(&run_logs[0]).unwrap();
    assert!(content.contains("[stdout] logged"), "{content}");
    assert!(content.contains("[stderr] oops"), "{content}");
}

#[test]
fn working_directory_is_cleaned_up() {
    let sandbox = Sandbox::new();
    sandbox.sbx().args(&["run", "--", "touch scratch"]).passes();
    assert_eq!(std::fs::read_dir(sandbox.work()).unwrap().count(), 0);
}

#[test]
fn config_defaults_apply() {
    let sandbox = Sandbox::new();
    let config = sandbox.file("sbx.toml", "[defaults]\nwarning_on_stderr = false\nenv = { FROM_CONFIG = \"yes\" }\n");
    sandbox
        .sbx()
        .args(&["--config", config.to_str().unwrap(), "run", "--", "echo $FROM_CONFIG", "echo noise >&2"])
        .passes()
        .stdout_has("yes")
        .stderr_has("success");
}
