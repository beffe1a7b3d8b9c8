// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::path::PathBuf;
use std::time::Duration;

/// Config file override (`SBX_CONFIG`).
pub fn config_path() -> Option<PathBuf> {
    std::env::var("SBX_CONFIG").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Default config file location: `<config dir>/sbx/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sbx").join("config.toml"))
}

/// Container image used when neither the task nor the config names one.
pub fn default_image() -> Option<String> {
    std::env::var("SBX_DEFAULT_IMAGE").ok().filter(|s| !s.is_empty())
}

/// Run timeout (`SBX_TIMEOUT_MS`).
pub fn timeout() -> Option<Duration> {
    std::env::var("SBX_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Parent of per-run working directories. Defaults to the system temp dir.
pub fn work_root() -> Option<PathBuf> {
    std::env::var("SBX_WORK_ROOT").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Resolve the file store root: SBX_STORE_DIR > <data dir>/sbx/store > <tmp>/sbx-store
pub fn store_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SBX_STORE_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::data_local_dir() {
        Some(dir) => dir.join("sbx").join("store"),
        None => std::env::temp_dir().join("sbx-store"),
    }
}

/// How long stream readers may keep draining after a kill
/// (default 5s, configurable via `SBX_DRAIN_GRACE_MS`).
pub fn drain_grace() -> Duration {
    std::env::var("SBX_DRAIN_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Docker socket override (`SBX_DOCKER_SOCKET`).
pub fn docker_socket() -> Option<String> {
    std::env::var("SBX_DOCKER_SOCKET").ok().filter(|s| !s.is_empty())
}

/// Tracing filter directive (`SBX_LOG`, default `info`).
pub fn log_filter() -> String {
    std::env::var("SBX_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
