// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to flush logs before terminating.

use std::fmt;

use sbx_engine::ErrorKind;

/// Process exit codes.
pub mod codes {
    pub const SUCCESS: i32 = 0;
    /// Fallback when a failed command reports no usable exit code.
    pub const FAILURE: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const STAGING: i32 = 3;
    pub const TIMEOUT: i32 = 124;
    pub const INFRASTRUCTURE: i32 = 125;
}

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Exit with `code` without printing anything further.
    pub fn silent(code: i32) -> Self {
        Self::new(code, "")
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(codes::CONFIGURATION, message)
    }

    /// Exit code for a run that failed before producing a result.
    pub fn code_for(kind: ErrorKind) -> i32 {
        match kind {
            ErrorKind::Configuration => codes::CONFIGURATION,
            ErrorKind::Staging => codes::STAGING,
            ErrorKind::Timeout => codes::TIMEOUT,
            ErrorKind::Infrastructure => codes::INFRASTRUCTURE,
        }
    }

    /// Exit code for a failed command: its own code when it fits a process
    /// status, otherwise [`codes::FAILURE`].
    pub fn code_for_exit(exit_code: i32) -> i32 {
        if (1..=255).contains(&exit_code) {
            exit_code
        } else {
            codes::FAILURE
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
