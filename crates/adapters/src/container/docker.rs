// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker Engine API client (bollard).

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::StreamExt;
use sbx_core::Stream;
use tokio::sync::mpsc;

use super::{ContainerClient, ContainerError, ContainerSpec, LogChunk};

/// Seconds before a Docker API request times out.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Container client backed by a Docker-compatible daemon.
#[derive(Clone)]
pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Connect to the daemon at `socket`, or the platform default
    /// (`DOCKER_HOST`, then the local socket) when `None`.
    pub fn connect(socket: Option<&str>) -> Result<Self, ContainerError> {
        let docker = match socket {
            Some(path) => {
                Docker::connect_with_socket(path, REQUEST_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| ContainerError::Connect(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Check that the daemon answers.
    pub async fn ping(&self) -> Result<(), ContainerError> {
        self.docker.ping().await.map_err(|e| ContainerError::Connect(e.to_string()))?;
        Ok(())
    }
}

fn is_status(err: &DockerError, codes: &[u16]) -> bool {
    matches!(err, DockerError::DockerResponseServerError { status_code, .. } if codes.contains(status_code))
}

fn container_config(spec: &ContainerSpec) -> Config<String> {
    // Docker resets the image entrypoint only for [""]
    let entrypoint = spec.entrypoint.as_ref().map(|ep| {
        if ep.is_empty() {
            vec![String::new()]
        } else {
            ep.clone()
        }
    });
    let labels: HashMap<String, String> =
        spec.labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

    Config {
        image: Some(spec.image.clone()),
        cmd: Some(spec.cmd.clone()),
        entrypoint,
        env: Some(spec.env_list()),
        working_dir: spec.working_dir.clone(),
        user: spec.user.clone(),
        labels: Some(labels),
        host_config: Some(HostConfig {
            binds: Some(spec.mounts.iter().map(|m| m.bind_spec()).collect()),
            nano_cpus: spec.limits.cpus.map(|c| (c * 1_000_000_000.0).round() as i64),
            memory: spec.limits.memory_bytes.map(|m| i64::try_from(m).unwrap_or(i64::MAX)),
            network_mode: spec.network_mode.clone(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerClient for DockerClient {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) if is_status(&e, &[404]) => Ok(false),
            Err(e) => Err(ContainerError::Connect(e.to_string())),
        }
    }

    async fn pull_image(&self, image: &str, platform: Option<&str>) -> Result<(), ContainerError> {
        tracing::info!(image, "pulling image");
        let options = CreateImageOptions {
            from_image: image.to_string(),
            platform: platform.unwrap_or_default().to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(item) = stream.next().await {
            let info = item.map_err(|e| ContainerError::Pull {
                image: image.to_string(),
                message: e.to_string(),
            })?;
            if let Some(status) = info.status {
                tracing::debug!(image, %status, "pull progress");
            }
        }
        tracing::info!(image, "image pulled");
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let options = CreateContainerOptions { name: spec.name.clone(), platform: spec.platform.clone() };
        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| ContainerError::Create(e.to_string()))?;
        for warning in &response.warnings {
            tracing::warn!(container_id = %response.id, %warning, "container create warning");
        }
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| ContainerError::Start { id: id.to_string(), message: e.to_string() })
    }

    async fn follow_logs(&self, id: &str, tx: mpsc::Sender<LogChunk>) -> Result<(), ContainerError> {
        let options =
            LogsOptions::<String> { follow: true, stdout: true, stderr: true, ..Default::default() };
        let mut stream = self.docker.logs(id, Some(options));
        while let Some(item) = stream.next().await {
            let chunk = match item {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                    LogChunk::new(Stream::StdOut, message.to_vec())
                }
                Ok(LogOutput::StdErr { message }) => LogChunk::new(Stream::StdErr, message.to_vec()),
                Ok(LogOutput::StdIn { .. }) => continue,
                Err(e) => {
                    return Err(ContainerError::Logs { id: id.to_string(), message: e.to_string() })
                }
            };
            if tx.send(chunk).await.is_err() {
                // consumer is gone; nothing left to feed
                break;
            }
        }
        Ok(())
    }

    async fn wait(&self, id: &str) -> Result<i64, ContainerError> {
        let mut stream = self.docker.wait_container(id, None::<WaitContainerOptions<String>>);
        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code
            Some(Err(DockerError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(ContainerError::Wait { id: id.to_string(), message: e.to_string() }),
            None => Err(ContainerError::Wait {
                id: id.to_string(),
                message: "wait stream ended without a status".to_string(),
            }),
        }
    }

    async fn kill(&self, id: &str) -> Result<(), ContainerError> {
        match self.docker.kill_container(id, None::<KillContainerOptions<String>>).await {
            Ok(()) => Ok(()),
            // already stopped or gone
            Err(e) if is_status(&e, &[404, 409]) => Ok(()),
            Err(e) => Err(ContainerError::Kill { id: id.to_string(), message: e.to_string() }),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        let options = RemoveContainerOptions { force: true, v: true, ..Default::default() };
        match self.docker.remove_container(id, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if is_status(&e, &[404]) => Ok(()),
            Err(e) => Err(ContainerError::Remove { id: id.to_string(), message: e.to_string() }),
        }
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
