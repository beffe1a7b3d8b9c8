// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runner.
//!
//! Lifecycle: resolve image (pull per policy) → create with the working
//! directory bind-mounted → start → follow logs into the consumer → wait
//! for the runtime's exit status → remove.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sbx_adapters::{normalize_image, ContainerClient, ContainerSpec, LogChunk, Mount, ResourceLimits};
use sbx_core::{CommandSpec, RunId, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Execution, Runner, RunnerKind};
use crate::error::RunError;
use crate::log_consumer::{LineAssembler, LogConsumer};

/// Where the working directory appears inside the container.
pub const DEFAULT_MOUNT_PATH: &str = "/sbx/work";

/// When to pull the image before creating the container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

sbx_core::simple_display! {
    PullPolicy {
        Always => "always",
        IfNotPresent => "if-not-present",
        Never => "never",
    }
}

impl FromStr for PullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(PullPolicy::Always),
            "if-not-present" | "if_not_present" | "missing" => Ok(PullPolicy::IfNotPresent),
            "never" => Ok(PullPolicy::Never),
            other => Err(format!("unknown pull policy `{other}` (expected always, if-not-present or never)")),
        }
    }
}

/// Container-specific run options.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerOptions {
    /// Image reference; falls back to the task's default image.
    pub image: Option<String>,
    pub pull_policy: PullPolicy,
    pub limits: ResourceLimits,
    /// Target `os/arch`, e.g. `linux/amd64`.
    pub platform: Option<String>,
    pub network_mode: Option<String>,
    pub user: Option<String>,
    /// `None` clears the image entrypoint so the command list runs as given.
    pub entrypoint: Option<Vec<String>>,
    pub mount_path: String,
    pub delete_on_finish: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            image: None,
            pull_policy: PullPolicy::default(),
            limits: ResourceLimits::default(),
            platform: None,
            network_mode: None,
            user: None,
            entrypoint: None,
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            delete_on_finish: true,
        }
    }
}

impl ContainerOptions {
    sbx_core::setters! {
        set {
            pull_policy: PullPolicy,
            limits: ResourceLimits,
            delete_on_finish: bool,
        }
        option {
            image: String,
            platform: String,
            network_mode: String,
            user: String,
            entrypoint: Vec<String>,
        }
    }

    pub fn mount_path(mut self, path: impl Into<String>) -> Self {
        self.mount_path = path.into();
        self
    }
}

/// Runs the command list in a fresh container through an injected client.
pub struct ContainerRunner {
    client: Arc<dyn ContainerClient>,
    options: ContainerOptions,
}

impl ContainerRunner {
    pub fn new(client: Arc<dyn ContainerClient>, options: ContainerOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    async fn ensure_image(&self, image: &str) -> Result<(), RunError> {
        let platform = self.options.platform.as_deref();
        match self.options.pull_policy {
            PullPolicy::Always => self.client.pull_image(image, platform).await?,
            PullPolicy::IfNotPresent => {
                if !self.client.image_exists(image).await? {
                    self.client.pull_image(image, platform).await?;
                }
            }
            PullPolicy::Never => {
                if !self.client.image_exists(image).await? {
                    return Err(sbx_adapters::ContainerError::ImageNotPresent(image.to_string()).into());
                }
            }
        }
        Ok(())
    }

    fn container_spec(&self, run_id: &RunId, image: String, spec: &CommandSpec) -> ContainerSpec {
        let mut container = ContainerSpec::new(format!("sbx-{run_id}"), image, spec.commands().to_vec());
        container.entrypoint = Some(self.options.entrypoint.clone().unwrap_or_default());
        container.env = spec.env().clone();
        container.working_dir = Some(self.options.mount_path.clone());
        container.mounts.push(Mount {
            host: spec.working_dir().to_path_buf(),
            container: self.options.mount_path.clone(),
        });
        container.limits = self.options.limits;
        container.platform = self.options.platform.clone();
        container.network_mode = self.options.network_mode.clone();
        container.user = self.options.user.clone();
        container.labels = BTreeMap::from([("sbx.run-id".to_string(), run_id.to_string())]);
        container
    }
}

#[async_trait]
impl Runner for ContainerRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Container
    }

    fn execution_dir(&self, _host_dir: &Path) -> String {
        self.options.mount_path.clone()
    }

    async fn start(
        &self,
        run_id: &RunId,
        spec: &CommandSpec,
        consumer: Arc<LogConsumer>,
    ) -> Result<Box<dyn Execution>, RunError> {
        let image = self
            .options
            .image
            .as_deref()
            .map(normalize_image)
            .ok_or_else(|| RunError::Configuration("no container image configured".to_string()))?;
        self.ensure_image(&image).await?;

        let id = self.client.create(&self.container_spec(run_id, image.clone(), spec)).await?;
        tracing::info!(run_id = %run_id, container_id = %id, %image, "container created");

        let mut execution = ContainerExecution {
            run_id: run_id.clone(),
            client: Arc::clone(&self.client),
            id,
            pump: None,
            delete_on_finish: self.options.delete_on_finish,
            cleaned: false,
        };
        if let Err(e) = self.client.start(&execution.id).await {
            execution.cleanup().await;
            return Err(e.into());
        }
        // the log endpoint replays from container start, so attaching now misses nothing
        execution.pump = Some(spawn_log_pump(
            Arc::clone(&self.client),
            execution.id.clone(),
            run_id.clone(),
            consumer,
        ));
        tracing::info!(run_id = %run_id, container_id = %execution.id, "container started");
        Ok(Box::new(execution))
    }
}

/// Follow the container's log stream and feed complete lines to the
/// consumer. A broken stream is logged; the exit status still comes from
/// the runtime's wait call.
fn spawn_log_pump(
    client: Arc<dyn ContainerClient>,
    id: String,
    run_id: RunId,
    consumer: Arc<LogConsumer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::channel::<LogChunk>(64);
        let follow = client.follow_logs(&id, tx);
        let feed = async {
            let mut out = LineAssembler::new();
            let mut err = LineAssembler::new();
            while let Some(chunk) = rx.recv().await {
                let assembler = match chunk.stream {
                    Stream::StdOut => &mut out,
                    Stream::StdErr => &mut err,
                };
                for line in assembler.push(&chunk.bytes) {
                    consumer.accept_bytes(chunk.stream, &line);
                }
            }
            for (stream, assembler) in [(Stream::StdOut, &mut out), (Stream::StdErr, &mut err)] {
                if let Some(rest) = assembler.finish() {
                    consumer.accept_bytes(stream, &rest);
                }
            }
        };
        let (followed, ()) = tokio::join!(follow, feed);
        if let Err(e) = followed {
            tracing::warn!(run_id = %run_id, container_id = %id, error = %e, "log stream ended early");
        }
    })
}

struct ContainerExecution {
    run_id: RunId,
    client: Arc<dyn ContainerClient>,
    id: String,
    pump: Option<JoinHandle<()>>,
    delete_on_finish: bool,
    cleaned: bool,
}

impl ContainerExecution {
    async fn drain(&mut self) {
        if let Some(handle) = self.pump.as_mut() {
            if let Err(e) = handle.await {
                tracing::warn!(run_id = %self.run_id, error = %e, "log pump task failed");
            }
            self.pump = None;
        }
    }
}

#[async_trait]
impl Execution for ContainerExecution {
    async fn wait(&mut self) -> Result<i32, RunError> {
        let status = self.client.wait(&self.id).await?;
        self.drain().await;
        let code = i32::try_from(status).unwrap_or(-1);
        tracing::info!(run_id = %self.run_id, container_id = %self.id, exit_code = code, "container exited");
        Ok(code)
    }

    async fn terminate(&mut self, grace: Duration) {
        tracing::info!(run_id = %self.run_id, container_id = %self.id, "killing container");
        if let Err(e) = self.client.kill(&self.id).await {
            tracing::warn!(run_id = %self.run_id, container_id = %self.id, error = %e, "failed to kill container");
        }
        if tokio::time::timeout(grace, self.drain()).await.is_err() {
            tracing::warn!(
                run_id = %self.run_id,
                container_id = %self.id,
                grace_ms = grace.as_millis() as u64,
                "log stream still open after kill, abandoning"
            );
            if let Some(handle) = self.pump.take() {
                handle.abort();
            }
        }
    }

    async fn cleanup(&mut self) {
        if let Some(handle) = self.pump.take() {
            handle.abort();
        }
        if self.cleaned || !self.delete_on_finish {
            return;
        }
        self.cleaned = true;
        match self.client.remove(&self.id).await {
            Ok(()) => tracing::debug!(run_id = %self.run_id, container_id = %self.id, "container removed"),
            Err(e) => {
                tracing::warn!(run_id = %self.run_id, container_id = %self.id, error = %e, "container cleanup failed")
            }
        }
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
