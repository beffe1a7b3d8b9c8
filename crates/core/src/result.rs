// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run result and final-state derivation.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::directive::Metric;
use crate::id::RunId;

/// State override derived from a finished run.
///
/// Absence of an override means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FinalState {
    Warning,
    Failed,
}

crate::simple_display! {
    FinalState {
        Warning => "WARNING",
        Failed => "FAILED",
    }
}

/// Run state in the orchestration vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Success,
    Warning,
    Failed,
}

crate::simple_display! {
    RunState {
        Success => "success",
        Warning => "warning",
        Failed => "failed",
    }
}

impl From<Option<FinalState>> for RunState {
    fn from(state: Option<FinalState>) -> Self {
        match state {
            None => RunState::Success,
            Some(FinalState::Warning) => RunState::Warning,
            Some(FinalState::Failed) => RunState::Failed,
        }
    }
}

/// Snapshot of a log consumer's counters and accumulators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogStats {
    pub std_out_line_count: u64,
    pub std_err_line_count: u64,
    pub outputs: BTreeMap<String, String>,
    pub metrics: Vec<Metric>,
}

/// Terminal artifact of one run. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub(crate) run_id: RunId,
    pub(crate) exit_code: i32,
    pub(crate) std_out_line_count: u64,
    pub(crate) std_err_line_count: u64,
    pub(crate) outputs: BTreeMap<String, String>,
    pub(crate) metrics: Vec<Metric>,
    pub(crate) warning_on_stderr: bool,
    pub(crate) output_files: BTreeMap<String, String>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub(crate) duration: Duration,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl RunResult {
    pub fn new(run_id: RunId, exit_code: i32, stats: LogStats, warning_on_stderr: bool) -> Self {
        Self {
            run_id,
            exit_code,
            std_out_line_count: stats.std_out_line_count,
            std_err_line_count: stats.std_err_line_count,
            outputs: stats.outputs,
            metrics: stats.metrics,
            warning_on_stderr,
            output_files: BTreeMap::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Attach collected files (logical name to file-store key).
    pub fn with_output_files(mut self, files: BTreeMap<String, String>) -> Self {
        self.output_files = files;
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn std_out_line_count(&self) -> u64 {
        self.std_out_line_count
    }

    pub fn std_err_line_count(&self) -> u64 {
        self.std_err_line_count
    }

    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn warning_on_stderr(&self) -> bool {
        self.warning_on_stderr
    }

    pub fn output_files(&self) -> &BTreeMap<String, String> {
        &self.output_files
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Derived override: any non-zero exit fails; a clean exit with stderr
    /// lines warns when `warning_on_stderr` is set; otherwise no override.
    pub fn final_state(&self) -> Option<FinalState> {
        if self.exit_code != 0 {
            Some(FinalState::Failed)
        } else if self.warning_on_stderr && self.std_err_line_count > 0 {
            Some(FinalState::Warning)
        } else {
            None
        }
    }

    pub fn run_state(&self) -> RunState {
        self.final_state().into()
    }
}

crate::builder! {
    pub struct RunResultBuilder => RunResult {
        into {
            run_id: RunId = "run-test",
        }
        set {
            exit_code: i32 = 0,
            std_out_line_count: u64 = 0,
            std_err_line_count: u64 = 0,
            outputs: BTreeMap<String, String> = BTreeMap::new(),
            metrics: Vec<Metric> = Vec::new(),
            warning_on_stderr: bool = true,
            output_files: BTreeMap<String, String> = BTreeMap::new(),
            duration: Duration = Duration::ZERO,
        }
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
