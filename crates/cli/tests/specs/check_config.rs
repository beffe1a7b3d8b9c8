// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `sbx check-config`.

use crate::prelude::*;

#[test]
fn no_config_uses_defaults() {
    let sandbox = Sandbox::new();
    sandbox.sbx().args(&["check-config"]).passes().stdout_has("using defaults");
}

#[test]
fn valid_config_is_reported() {
    let sandbox = Sandbox::new();
    let config = sandbox.file("sbx.toml", "[container]\nimage = \"python:3.12-slim\"\n");
    let out = sandbox
        .sbx()
        .args(&["--config", config.to_str().unwrap(), "check-config", "--format", "json"])
        .passes();

    let json = out.json();
    assert_eq!(json["config"]["container"]["image"], "python:3.12-slim");
    assert_eq!(json["effective"]["image"], "python:3.12-slim");
}

#[test]
fn env_config_path_is_used() {
    let sandbox = Sandbox::new();
    let config = sandbox.file("env.toml", "[defaults]\ntimeout_secs = 9\n");
    sandbox.sbx().env("SBX_CONFIG", &config).args(&["check-config"]).passes().stdout_has("9000ms");
}

#[test]
fn invalid_config_exits_2() {
    let sandbox = Sandbox::new();
    let config = sandbox.file("bad.toml", "[container]\nmemory = \"lots\"\n");
    sandbox
        .sbx()
        .args(&["--config", config.to_str().unwrap(), "check-config"])
        .exits(2)
        .stderr_has("invalid size");
}
