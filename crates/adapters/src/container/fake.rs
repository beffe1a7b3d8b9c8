// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted container client for tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sbx_core::Stream;
use tokio::sync::{mpsc, watch};

use super::{ContainerClient, ContainerError, ContainerSpec, LogChunk};

/// Recorded client call
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerCall {
    ImageExists(String),
    PullImage { image: String, platform: Option<String> },
    Create(ContainerSpec),
    Start(String),
    FollowLogs(String),
    Wait(String),
    Kill(String),
    Remove(String),
}

/// What the next container does once started.
#[derive(Debug, Clone, Default)]
pub struct FakeBehavior {
    /// Frames emitted by `follow_logs`, in order.
    pub chunks: Vec<LogChunk>,
    pub exit_code: i64,
    /// Keep the log stream open and `wait` blocked until `kill` is called.
    pub hang_until_killed: bool,
    /// Fail the log stream after this many frames.
    pub break_stream_after: Option<usize>,
    pub fail_pull: bool,
    pub fail_create: bool,
    pub fail_start: bool,
    pub fail_remove: bool,
}

impl FakeBehavior {
    pub fn exits(code: i64) -> Self {
        Self { exit_code: code, ..Default::default() }
    }

    pub fn chunk(mut self, stream: Stream, bytes: impl Into<Vec<u8>>) -> Self {
        self.chunks.push(LogChunk::new(stream, bytes));
        self
    }
}

struct FakeState {
    images: HashSet<String>,
    behavior: FakeBehavior,
    calls: Vec<ContainerCall>,
    next_id: u32,
}

/// Fake container client for testing
#[derive(Clone)]
pub struct FakeContainerClient {
    inner: Arc<Mutex<FakeState>>,
    killed: Arc<watch::Sender<bool>>,
}

impl Default for FakeContainerClient {
    fn default() -> Self {
        let (killed, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                images: HashSet::new(),
                behavior: FakeBehavior::default(),
                calls: Vec::new(),
                next_id: 0,
            })),
            killed: Arc::new(killed),
        }
    }
}

impl FakeContainerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an image as present locally.
    pub fn with_image(self, image: &str) -> Self {
        self.inner.lock().images.insert(image.to_string());
        self
    }

    pub fn with_behavior(self, behavior: FakeBehavior) -> Self {
        self.inner.lock().behavior = behavior;
        self
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ContainerCall> {
        self.inner.lock().calls.clone()
    }

    /// The spec of the most recently created container.
    pub fn created_spec(&self) -> Option<ContainerSpec> {
        self.inner.lock().calls.iter().rev().find_map(|c| match c {
            ContainerCall::Create(spec) => Some(spec.clone()),
            _ => None,
        })
    }

    pub fn was_removed(&self, id: &str) -> bool {
        self.inner.lock().calls.iter().any(|c| matches!(c, ContainerCall::Remove(r) if r == id))
    }

    pub fn was_killed(&self) -> bool {
        *self.killed.borrow()
    }

    fn record(&self, call: ContainerCall) -> FakeBehavior {
        let mut state = self.inner.lock();
        state.calls.push(call);
        state.behavior.clone()
    }
}

#[async_trait]
impl ContainerClient for FakeContainerClient {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        self.record(ContainerCall::ImageExists(image.to_string()));
        Ok(self.inner.lock().images.contains(image))
    }

    async fn pull_image(&self, image: &str, platform: Option<&str>) -> Result<(), ContainerError> {
        let behavior = self.record(ContainerCall::PullImage {
            image: image.to_string(),
            platform: platform.map(str::to_string),
        });
        if behavior.fail_pull {
            return Err(ContainerError::Pull {
                image: image.to_string(),
                message: "manifest unknown".to_string(),
            });
        }
        self.inner.lock().images.insert(image.to_string());
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let behavior = self.record(ContainerCall::Create(spec.clone()));
        if behavior.fail_create {
            return Err(ContainerError::Create("no such image".to_string()));
        }
        let mut state = self.inner.lock();
        state.next_id += 1;
        Ok(format!("fake-{}", state.next_id))
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        let behavior = self.record(ContainerCall::Start(id.to_string()));
        if behavior.fail_start {
            return Err(ContainerError::Start { id: id.to_string(), message: "exec format error".into() });
        }
        Ok(())
    }

    async fn follow_logs(&self, id: &str, tx: mpsc::Sender<LogChunk>) -> Result<(), ContainerError> {
        let behavior = self.record(ContainerCall::FollowLogs(id.to_string()));
        for (i, chunk) in behavior.chunks.into_iter().enumerate() {
            if behavior.break_stream_after == Some(i) {
                return Err(ContainerError::Logs {
                    id: id.to_string(),
                    message: "connection reset by peer".to_string(),
                });
            }
            if tx.send(chunk).await.is_err() {
                return Ok(());
            }
        }
        if behavior.hang_until_killed {
            let mut killed = self.killed.subscribe();
            let _ = killed.wait_for(|k| *k).await;
        }
        Ok(())
    }

    async fn wait(&self, id: &str) -> Result<i64, ContainerError> {
        let behavior = self.record(ContainerCall::Wait(id.to_string()));
        if behavior.hang_until_killed {
            let mut killed = self.killed.subscribe();
            let _ = killed.wait_for(|k| *k).await;
            return Ok(137);
        }
        Ok(behavior.exit_code)
    }

    async fn kill(&self, id: &str) -> Result<(), ContainerError> {
        self.record(ContainerCall::Kill(id.to_string()));
        self.killed.send_replace(true);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        let behavior = self.record(ContainerCall::Remove(id.to_string()));
        if behavior.fail_remove {
            return Err(ContainerError::Remove { id: id.to_string(), message: "device busy".into() });
        }
        Ok(())
    }
}
