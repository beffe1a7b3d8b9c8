// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-run log file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sbx_core::{LogLevel, RunId, Stream};

use crate::log_sink::LogSink;

/// Path of the log file for a run: `<log_dir>/run/<run_id>.log`.
pub fn run_log_path(log_dir: &Path, run_id: &RunId) -> PathBuf {
    log_dir.join("run").join(format!("{run_id}.log"))
}

/// Writes every forwarded line to the run's log file.
///
/// Format: `2026-01-30T08:14:09Z [stdout] message`. Lines forwarded at a
/// level other than the stream's default carry the level:
/// `2026-01-30T08:14:09Z [stdout] ERROR message`.
///
/// The file is opened on first write and kept open for the run. Failures
/// are logged via tracing and never propagate.
pub struct RunLogSink {
    run_id: RunId,
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl RunLogSink {
    pub fn new(log_dir: &Path, run_id: RunId) -> Self {
        let path = run_log_path(log_dir, &run_id);
        Self { run_id, path, file: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, stream: Stream, level: LogLevel, message: &str) -> std::io::Result<()> {
        let mut guard = self.file.lock();
        let file = match guard.take() {
            Some(file) => file,
            None => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                OpenOptions::new().create(true).append(true).open(&self.path)?
            }
        };
        let file = guard.insert(file);
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        if level == stream.default_level() {
            writeln!(file, "{ts} [{stream}] {message}")
        } else {
            writeln!(file, "{ts} [{stream}] {level} {message}")
        }
    }
}

impl LogSink for RunLogSink {
    fn log(&self, stream: Stream, level: LogLevel, message: &str) {
        if let Err(e) = self.write_line(stream, level, message) {
            tracing::warn!(
                run_id = %self.run_id,
                path = %self.path.display(),
                error = %e,
                "failed to write run log"
            );
        }
    }
}

#[cfg(test)]
#[path = "run_logger_tests.rs"]
mod tests;
