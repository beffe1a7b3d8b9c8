// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output stream and severity tags for forwarded log lines.

use serde::{Deserialize, Serialize};

/// Which output stream of the running command a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    StdOut,
    StdErr,
}

crate::simple_display! {
    Stream {
        StdOut => "stdout",
        StdErr => "stderr",
    }
}

impl Stream {
    /// Severity a plain line from this stream is forwarded at.
    pub fn default_level(self) -> LogLevel {
        match self {
            Stream::StdOut => LogLevel::Info,
            Stream::StdErr => LogLevel::Warn,
        }
    }
}

/// Severity of a forwarded log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Trace => "TRACE",
        Debug => "DEBUG",
        Info => "INFO",
        Warn => "WARN",
        Error => "ERROR",
    }
}

impl LogLevel {
    /// Parse a level name case-insensitively (`"warning"` is accepted for `Warn`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}
