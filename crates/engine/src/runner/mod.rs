// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution backends.
//!
//! A [`Runner`] stages a [`CommandSpec`] and starts it, returning an
//! [`Execution`] handle. The run driver owns the handle: it waits (bounded
//! by the timeout), terminates on expiry, and always calls `cleanup`.

mod container;
mod process;

pub use container::{ContainerOptions, ContainerRunner, PullPolicy, DEFAULT_MOUNT_PATH};
pub use process::ProcessRunner;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sbx_core::{CommandSpec, RunId};
use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::log_consumer::LogConsumer;
use crate::staging::stage_inputs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    #[default]
    Process,
    Container,
}

sbx_core::simple_display! {
    RunnerKind {
        Process => "process",
        Container => "container",
    }
}

impl FromStr for RunnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" => Ok(RunnerKind::Process),
            "container" | "docker" => Ok(RunnerKind::Container),
            other => Err(format!("unknown runner `{other}` (expected process or container)")),
        }
    }
}

/// One execution backend.
#[async_trait]
pub trait Runner: Send + Sync {
    fn kind(&self) -> RunnerKind;

    /// Path of the working directory as the command sees it.
    fn execution_dir(&self, host_dir: &Path) -> String;

    /// Materialize inputs before `start`.
    async fn stage(&self, spec: &CommandSpec) -> Result<(), RunError> {
        stage_inputs(spec).await?;
        Ok(())
    }

    /// Start the command with both output streams wired into `consumer`.
    ///
    /// On error nothing is left running.
    async fn start(
        &self,
        run_id: &RunId,
        spec: &CommandSpec,
        consumer: Arc<LogConsumer>,
    ) -> Result<Box<dyn Execution>, RunError>;
}

/// Handle to a started command.
#[async_trait]
pub trait Execution: Send {
    /// Wait for termination and for both streams to drain; returns the
    /// exit code. Cancel-safe: dropping the future leaves the handle usable
    /// for `terminate` and `cleanup`.
    async fn wait(&mut self) -> Result<i32, RunError>;

    /// Forcibly stop the command, then let the stream readers drain for at
    /// most `grace`.
    async fn terminate(&mut self, grace: Duration);

    /// Release every handle. Idempotent; failures are logged only.
    async fn cleanup(&mut self);
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
