// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[yare::parameterized(
    clean_exit               = { 0, 0, true,  None },
    stderr_warns             = { 0, 3, true,  Some(FinalState::Warning) },
    stderr_ignored           = { 0, 3, false, None },
    failed_without_stderr    = { 1, 0, true,  Some(FinalState::Failed) },
    failed_beats_warning     = { 2, 9, true,  Some(FinalState::Failed) },
    negative_exit_fails      = { -1, 0, false, Some(FinalState::Failed) },
)]
fn final_state_cases(exit_code: i32, stderr: u64, warn: bool, expected: Option<FinalState>) {
    let result = RunResult::builder()
        .exit_code(exit_code)
        .std_err_line_count(stderr)
        .warning_on_stderr(warn)
        .build();
    assert_eq!(result.final_state(), expected);
}

proptest! {
    #[test]
    fn nonzero_exit_always_fails(
        exit_code in any::<i32>().prop_filter("non-zero", |c| *c != 0),
        stderr in any::<u64>(),
        warn in any::<bool>(),
    ) {
        let result = RunResult::builder()
            .exit_code(exit_code)
            .std_err_line_count(stderr)
            .warning_on_stderr(warn)
            .build();
        prop_assert_eq!(result.final_state(), Some(FinalState::Failed));
        prop_assert_eq!(result.run_state(), RunState::Failed);
    }

    #[test]
    fn zero_exit_without_warning_flag_has_no_override(stderr in any::<u64>(), stdout in any::<u64>()) {
        let result = RunResult::builder()
            .std_out_line_count(stdout)
            .std_err_line_count(stderr)
            .warning_on_stderr(false)
            .build();
        prop_assert_eq!(result.final_state(), None);
    }

    #[test]
    fn zero_exit_with_warning_flag_depends_only_on_stderr_count(stderr in any::<u64>()) {
        let result = RunResult::builder().std_err_line_count(stderr).build();
        let expected = if stderr > 0 { Some(FinalState::Warning) } else { None };
        prop_assert_eq!(result.final_state(), expected);
    }
}

#[test]
fn new_copies_stats() {
    let stats = LogStats {
        std_out_line_count: 2,
        std_err_line_count: 1,
        outputs: BTreeMap::from([("k".to_string(), "v".to_string())]),
        metrics: vec![Metric::counter("m", 1.0)],
    };
    let result = RunResult::new(RunId::from("run-abc"), 0, stats, false)
        .with_duration(Duration::from_millis(1500));

    assert_eq!(result.run_id(), "run-abc");
    assert_eq!(result.std_out_line_count(), 2);
    assert_eq!(result.std_err_line_count(), 1);
    assert_eq!(result.outputs()["k"], "v");
    assert_eq!(result.metrics().len(), 1);
    assert_eq!(result.run_state(), RunState::Success);
    assert_eq!(result.duration(), Duration::from_millis(1500));
}

#[test]
fn serializes_duration_in_millis() {
    let result = RunResult::builder().duration(Duration::from_millis(250)).build();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["duration_ms"], 250);
    assert_eq!(json["run_id"], "run-test");
    assert_eq!(json["exit_code"], 0);
}

#[test]
fn state_display() {
    assert_eq!(FinalState::Warning.to_string(), "WARNING");
    assert_eq!(RunState::from(Some(FinalState::Failed)).to_string(), "failed");
}
