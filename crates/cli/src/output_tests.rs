// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::time::Duration;

use sbx_core::{LogStats, Metric};
use serial_test::serial;

use super::*;

fn sample() -> RunResult {
    RunResult::builder()
        .run_id("run-abc")
        .exit_code(0)
        .std_out_line_count(3)
        .std_err_line_count(1)
        .outputs(BTreeMap::from([("answer".to_string(), "42".to_string())]))
        .metrics(vec![Metric::counter("rows", 12.0)])
        .duration(Duration::from_millis(250))
        .build()
}

#[yare::parameterized(
    plain_stdout     = { Stream::StdOut, LogLevel::Info,  "hello", "hello" },
    plain_stderr     = { Stream::StdErr, LogLevel::Warn,  "oops",  "oops" },
    directive_error  = { Stream::StdOut, LogLevel::Error, "boom",  "[ERROR] boom" },
    directive_debug  = { Stream::StdErr, LogLevel::Debug, "trace", "[DEBUG] trace" },
)]
fn line_formatting(stream: Stream, level: LogLevel, message: &str, expected: &str) {
    assert_eq!(format_line(stream, level, message), expected);
}

#[test]
fn result_json_includes_state_and_counts() {
    let json: serde_json::Value = serde_json::from_str(&result_json(&sample()).unwrap()).unwrap();

    assert_eq!(json["state"], "warning");
    assert_eq!(json["final_state"], "WARNING");
    assert_eq!(json["run_id"], "run-abc");
    assert_eq!(json["exit_code"], 0);
    assert_eq!(json["std_out_line_count"], 3);
    assert_eq!(json["outputs"]["answer"], "42");
    assert_eq!(json["metrics"][0]["name"], "rows");
    assert_eq!(json["duration_ms"], 250);
}

#[test]
fn timeout_json_carries_partial_counts() {
    let err = RunError::Timeout {
        timeout: Duration::from_secs(1),
        partial: Box::new(LogStats { std_out_line_count: 5, ..Default::default() }),
    };
    let json: serde_json::Value = serde_json::from_str(&error_json(&err).unwrap()).unwrap();

    assert_eq!(json["state"], "failed");
    assert_eq!(json["error"], "timeout");
    assert_eq!(json["partial"]["std_out_line_count"], 5);
    assert!(json.get("result").is_none());
}

#[test]
fn missing_outputs_json_embeds_result() {
    let err = RunError::MissingOutputs { missing: vec!["report.json".into()], result: Box::new(sample()) };
    let json: serde_json::Value = serde_json::from_str(&error_json(&err).unwrap()).unwrap();

    assert_eq!(json["error"], "staging");
    assert!(json["message"].as_str().unwrap().contains("report.json"));
    assert_eq!(json["result"]["outputs"]["answer"], "42");
}

#[test]
#[serial]
fn result_text_lists_outputs_and_metrics() {
    std::env::set_var("NO_COLOR", "1");
    let text = result_text(&sample());

    assert!(text.starts_with("run-abc warning (exit 0, 3 stdout / 1 stderr lines, 250ms)"), "{text}");
    assert!(text.contains("output answer = 42"));
    assert!(text.contains("metric rows = 12 (counter)"));
}
