// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn force_color() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");
}

fn disable_color() {
    std::env::set_var("NO_COLOR", "1");
    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn styles_returns_plain_when_no_color() {
    disable_color();
    assert_eq!(format!("{:?}", styles()), format!("{:?}", Styles::plain()));
}

#[test]
#[serial]
fn styles_returns_styled_when_color_forced() {
    force_color();
    assert_ne!(format!("{:?}", styles()), format!("{:?}", Styles::plain()));
}

#[yare::parameterized(
    success = { RunState::Success, "\x1b[38;5;108m" },
    warning = { RunState::Warning, "\x1b[38;5;179m" },
    failed  = { RunState::Failed,  "\x1b[38;5;167m" },
)]
#[serial]
fn state_uses_state_color(run_state: RunState, prefix: &str) {
    force_color();
    let painted = state(run_state);
    assert!(painted.starts_with(prefix), "{painted:?}");
    assert!(painted.contains(&run_state.to_string()));
    assert!(painted.ends_with("\x1b[0m"));
}

#[test]
#[serial]
fn no_color_returns_plain_text() {
    disable_color();
    assert_eq!(header("run"), "run");
    assert_eq!(muted("12ms"), "12ms");
    assert_eq!(state(RunState::Warning), "warning");
}
