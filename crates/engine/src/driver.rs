// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run driver: owns one execution from staging to result.
//!
//! Every exit path after `start` goes through `Execution::cleanup`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sbx_adapters::FileStore;
use sbx_core::{CommandSpec, RunId, RunResult};
use tracing::Instrument;

use crate::error::RunError;
use crate::log_consumer::LogConsumer;
use crate::runner::Runner;
use crate::staging::collect_outputs;

/// Per-run knobs that are not part of the command itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub warning_on_stderr: bool,
    /// How long stream readers may drain after a timeout kill.
    pub drain_grace: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { timeout: None, warning_on_stderr: true, drain_grace: Duration::from_secs(5) }
    }
}

impl RunOptions {
    sbx_core::setters! {
        set {
            warning_on_stderr: bool,
            drain_grace: Duration,
        }
        option {
            timeout: Duration,
        }
    }
}

/// Stage, start, wait (bounded by the timeout), clean up, collect outputs
/// and build the result.
///
/// A non-zero exit is returned as `Ok`; see [`RunResult::final_state`].
pub async fn execute(
    runner: &dyn Runner,
    run_id: &RunId,
    spec: &CommandSpec,
    consumer: Arc<LogConsumer>,
    store: &dyn FileStore,
    options: &RunOptions,
) -> Result<RunResult, RunError> {
    let span = tracing::info_span!("run", run_id = %run_id, runner = %runner.kind());
    execute_inner(runner, run_id, spec, consumer, store, options).instrument(span).await
}

async fn execute_inner(
    runner: &dyn Runner,
    run_id: &RunId,
    spec: &CommandSpec,
    consumer: Arc<LogConsumer>,
    store: &dyn FileStore,
    options: &RunOptions,
) -> Result<RunResult, RunError> {
    let started = Instant::now();
    runner.stage(spec).await?;
    let mut execution = runner.start(run_id, spec, Arc::clone(&consumer)).await?;

    let waited = match options.timeout {
        Some(limit) => tokio::time::timeout(limit, execution.wait()).await.ok(),
        None => Some(execution.wait().await),
    };
    let exit_code = match waited {
        Some(Ok(code)) => code,
        Some(Err(e)) => {
            execution.cleanup().await;
            return Err(e);
        }
        None => {
            let timeout = options.timeout.unwrap_or_default();
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "command timed out, killing");
            execution.terminate(options.drain_grace).await;
            execution.cleanup().await;
            let partial = consumer.stats();
            tracing::info!(
                stdout_lines = partial.std_out_line_count,
                stderr_lines = partial.std_err_line_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "run timed out"
            );
            return Err(RunError::Timeout { timeout, partial: Box::new(partial) });
        }
    };
    execution.cleanup().await;

    let result = RunResult::new(run_id.clone(), exit_code, consumer.stats(), options.warning_on_stderr)
        .with_duration(started.elapsed());
    let collected = match collect_outputs(spec, run_id, store).await {
        Ok(collected) => collected,
        Err(source) => {
            tracing::warn!(exit_code, error = %source, "output collection failed");
            return Err(RunError::Collection { source, result: Box::new(result) });
        }
    };
    let result = result.with_output_files(collected.files);

    tracing::info!(
        exit_code,
        stdout_lines = result.std_out_line_count(),
        stderr_lines = result.std_err_line_count(),
        outputs = result.outputs().len(),
        elapsed_ms = result.duration().as_millis() as u64,
        state = %result.run_state(),
        "run finished"
    );

    if !collected.missing.is_empty() {
        tracing::warn!(missing = ?collected.missing, "required outputs not produced");
        return Err(RunError::MissingOutputs { missing: collected.missing, result: Box::new(result) });
    }
    Ok(result)
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
