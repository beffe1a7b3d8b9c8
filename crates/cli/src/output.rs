// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console rendering: live script output and the final run report.

use std::io::Write;

use clap::ValueEnum;
use sbx_adapters::LogSink;
use sbx_core::{FinalState, LogLevel, RunResult, RunState, Stream};
use sbx_engine::RunError;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Echoes script output to the terminal.
///
/// In text mode stdout lines go to stdout; everything else goes to stderr
/// so that JSON reports own stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogSink {
    format: OutputFormat,
}

impl ConsoleLogSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl LogSink for ConsoleLogSink {
    fn log(&self, stream: Stream, level: LogLevel, message: &str) {
        let line = format_line(stream, level, message);
        // a closed pipe must not abort the run
        let _ = match (stream, self.format) {
            (Stream::StdOut, OutputFormat::Text) => writeln!(std::io::stdout().lock(), "{line}"),
            _ => writeln!(std::io::stderr().lock(), "{line}"),
        };
    }
}

/// Directive log entries carry their level as a prefix; plain lines print as-is.
pub fn format_line(stream: Stream, level: LogLevel, message: &str) -> String {
    if level == stream.default_level() {
        message.to_string()
    } else {
        format!("[{level}] {message}")
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    state: RunState,
    final_state: Option<FinalState>,
    #[serde(flatten)]
    result: &'a RunResult,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    state: RunState,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<RunReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial: Option<PartialCounts>,
}

#[derive(Serialize)]
struct PartialCounts {
    std_out_line_count: u64,
    std_err_line_count: u64,
}

fn report(result: &RunResult) -> RunReport<'_> {
    RunReport { state: result.run_state(), final_state: result.final_state(), result }
}

/// JSON document describing a finished run.
pub fn result_json(result: &RunResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&report(result))
}

/// JSON document describing a run that ended in an error.
pub fn error_json(err: &RunError) -> serde_json::Result<String> {
    let partial = match err {
        RunError::Timeout { partial, .. } => Some(PartialCounts {
            std_out_line_count: partial.std_out_line_count,
            std_err_line_count: partial.std_err_line_count,
        }),
        _ => None,
    };
    serde_json::to_string_pretty(&ErrorReport {
        state: RunState::Failed,
        error: err.kind().to_string(),
        message: err.to_string(),
        result: err.result().map(report),
        partial,
    })
}

/// Human summary of a finished run.
pub fn result_text(result: &RunResult) -> String {
    let mut out = format!(
        "{} {} {}",
        crate::color::header(result.run_id().as_str()),
        crate::color::state(result.run_state()),
        crate::color::muted(&format!(
            "(exit {}, {} stdout / {} stderr lines, {}ms)",
            result.exit_code(),
            result.std_out_line_count(),
            result.std_err_line_count(),
            result.duration().as_millis()
        )),
    );
    for (key, value) in result.outputs() {
        out.push_str(&format!("\n  output {key} = {value}"));
    }
    for metric in result.metrics() {
        out.push_str(&format!("\n  metric {} = {} ({})", metric.name, metric.value, metric.kind));
    }
    for (name, key) in result.output_files() {
        out.push_str(&format!("\n  file   {name} -> {key}"));
    }
    out
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
