// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime client.
//!
//! The engine drives the container lifecycle (pull, create, start, follow
//! logs, wait, kill, remove) through [`ContainerClient`]. The client is
//! constructed once by the caller and shared by every container run.

mod docker;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use docker::DockerClient;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ContainerCall, FakeBehavior, FakeContainerClient};

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use sbx_core::Stream;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from container runtime operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("cannot connect to container runtime: {0}")]
    Connect(String),

    #[error("image `{0}` is not present and pulling is disabled")]
    ImageNotPresent(String),

    #[error("failed to pull image `{image}`: {message}")]
    Pull { image: String, message: String },

    #[error("failed to create container: {0}")]
    Create(String),

    #[error("failed to start container {id}: {message}")]
    Start { id: String, message: String },

    #[error("log stream for container {id} broke: {message}")]
    Logs { id: String, message: String },

    #[error("failed to wait for container {id}: {message}")]
    Wait { id: String, message: String },

    #[error("failed to kill container {id}: {message}")]
    Kill { id: String, message: String },

    #[error("failed to remove container {id}: {message}")]
    Remove { id: String, message: String },
}

/// Bytes read from one of the container's output streams.
///
/// Frames do not respect line boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub stream: Stream,
    pub bytes: Vec<u8>,
}

impl LogChunk {
    pub fn new(stream: Stream, bytes: impl Into<Vec<u8>>) -> Self {
        Self { stream, bytes: bytes.into() }
    }
}

/// A host directory exposed inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
}

impl Mount {
    /// `host:container` bind specification.
    pub fn bind_spec(&self) -> String {
        format!("{}:{}", self.host.display(), self.container)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceLimits {
    /// Fractional CPU count.
    pub cpus: Option<f64>,
    pub memory_bytes: Option<u64>,
}

/// Everything needed to create one container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub cmd: Vec<String>,
    /// `None` keeps the image entrypoint; `Some(vec![])` clears it.
    pub entrypoint: Option<Vec<String>>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<String>,
    pub mounts: Vec<Mount>,
    pub limits: ResourceLimits,
    pub platform: Option<String>,
    pub network_mode: Option<String>,
    pub user: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, cmd: Vec<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            cmd,
            entrypoint: None,
            env: BTreeMap::new(),
            working_dir: None,
            mounts: Vec::new(),
            limits: ResourceLimits::default(),
            platform: None,
            network_mode: None,
            user: None,
            labels: BTreeMap::new(),
        }
    }

    /// `KEY=value` pairs in the runtime's environment format.
    pub fn env_list(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

/// Container runtime operations used by the container runner.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    /// Whether the image is available locally.
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError>;

    async fn pull_image(&self, image: &str, platform: Option<&str>) -> Result<(), ContainerError>;

    /// Create the container, returning its id.
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError>;

    async fn start(&self, id: &str) -> Result<(), ContainerError>;

    /// Follow the container's output until it closes, sending each frame
    /// to `tx`. Returns an error if the stream breaks before the end.
    async fn follow_logs(&self, id: &str, tx: mpsc::Sender<LogChunk>) -> Result<(), ContainerError>;

    /// Block until the container exits and return its exit status.
    async fn wait(&self, id: &str) -> Result<i64, ContainerError>;

    async fn kill(&self, id: &str) -> Result<(), ContainerError>;

    /// Force-remove the container and its anonymous volumes.
    async fn remove(&self, id: &str) -> Result<(), ContainerError>;
}

/// Add the `latest` tag to an image reference that has neither tag nor digest.
pub fn normalize_image(image: &str) -> String {
    let image = image.trim();
    if image.contains('@') {
        return image.to_string();
    }
    // a ':' after the last '/' is a tag; before it, a registry port
    let name = image.rsplit('/').next().unwrap_or(image);
    if name.contains(':') {
        image.to_string()
    } else {
        format!("{image}:latest")
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
