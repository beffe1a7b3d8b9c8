// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration file.
//!
//! ```toml
//! [defaults]
//! warning_on_stderr = true
//! timeout_secs = 600
//! env = { LANG = "C.UTF-8" }
//!
//! [container]
//! image = "python:3.12-slim"
//! pull_policy = "if-not-present"
//! memory = "512m"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env;
use sbx_adapters::ResourceLimits;

use crate::runner::{ContainerOptions, PullPolicy, DEFAULT_MOUNT_PATH};

/// Errors from loading or interpreting configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid size `{0}` (expected e.g. 512m, 2g, 1048576)")]
    InvalidSize(String),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    pub warning_on_stderr: bool,
    pub timeout_secs: Option<u64>,
    pub interpreter: Option<Vec<String>>,
    pub fail_fast: bool,
    pub keep_working_dir: bool,
    pub work_root: Option<PathBuf>,
    /// Environment applied to every run; task values override it.
    pub env: BTreeMap<String, String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            warning_on_stderr: true,
            timeout_secs: None,
            interpreter: None,
            fail_fast: true,
            keep_working_dir: false,
            work_root: None,
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerSection {
    pub image: Option<String>,
    pub pull_policy: PullPolicy,
    pub cpus: Option<f64>,
    /// Memory limit, e.g. `512m`.
    pub memory: Option<String>,
    pub platform: Option<String>,
    pub network_mode: Option<String>,
    pub user: Option<String>,
    pub mount_path: Option<String>,
    pub delete_on_finish: bool,
    pub socket: Option<String>,
}

impl Default for ContainerSection {
    fn default() -> Self {
        Self {
            image: None,
            pull_policy: PullPolicy::default(),
            cpus: None,
            memory: None,
            platform: None,
            network_mode: None,
            user: None,
            mount_path: None,
            delete_on_finish: true,
            socket: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub defaults: Defaults,
    pub container: ContainerSection,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path or `SBX_CONFIG` must exist; the default location
    /// is optional and yields defaults when absent.
    pub fn load(explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>), ConfigError> {
        let (path, required) = match explicit.map(Path::to_path_buf).or_else(env::config_path) {
            Some(path) => (path, true),
            None => match env::default_config_path() {
                Some(path) => (path, false),
                None => return Ok((Config::default(), None)),
            },
        };
        if !required && !path.exists() {
            return Ok((Config::default(), None));
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        let config = Config::parse(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.clone(), source },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok((config, Some(path)))
    }

    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: PathBuf::from("<inline>"), source })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(cpus) = self.container.cpus {
            if !(cpus.is_finite() && cpus > 0.0) {
                return Err(ConfigError::Invalid(format!("container.cpus must be positive, got {cpus}")));
            }
        }
        self.memory_bytes()?;
        if matches!(&self.defaults.interpreter, Some(i) if i.is_empty()) {
            return Err(ConfigError::Invalid("defaults.interpreter must not be empty".into()));
        }
        Ok(())
    }

    pub fn memory_bytes(&self) -> Result<Option<u64>, ConfigError> {
        self.container.memory.as_deref().map(parse_byte_size).transpose()
    }

    /// Effective timeout: `SBX_TIMEOUT_MS` wins over `defaults.timeout_secs`.
    pub fn timeout(&self) -> Option<Duration> {
        env::timeout().or(self.defaults.timeout_secs.map(Duration::from_secs))
    }

    /// Effective image: `container.image`, then `SBX_DEFAULT_IMAGE`.
    pub fn image(&self) -> Option<String> {
        self.container.image.clone().or_else(env::default_image)
    }

    /// Effective docker socket: `SBX_DOCKER_SOCKET`, then `container.socket`.
    pub fn docker_socket(&self) -> Option<String> {
        env::docker_socket().or_else(|| self.container.socket.clone())
    }

    pub fn work_root(&self) -> Option<PathBuf> {
        env::work_root().or_else(|| self.defaults.work_root.clone())
    }

    /// Container runner options as configured. The image is left unset so
    /// task-level defaults can still apply; see [`Config::image`].
    pub fn container_options(&self) -> Result<ContainerOptions, ConfigError> {
        let section = &self.container;
        Ok(ContainerOptions {
            image: None,
            pull_policy: section.pull_policy,
            limits: ResourceLimits { cpus: section.cpus, memory_bytes: self.memory_bytes()? },
            platform: section.platform.clone(),
            network_mode: section.network_mode.clone(),
            user: section.user.clone(),
            entrypoint: None,
            mount_path: section.mount_path.clone().unwrap_or_else(|| DEFAULT_MOUNT_PATH.to_string()),
            delete_on_finish: section.delete_on_finish,
        })
    }
}

/// Parse a byte size with an optional binary unit suffix: `1024`, `64k`,
/// `512m`, `2g`, `1t` (`b`/`ib` suffixes and case are ignored).
pub fn parse_byte_size(s: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidSize(s.to_string());
    let lower = s.trim().to_ascii_lowercase();
    let trimmed = lower.strip_suffix("ib").or_else(|| lower.strip_suffix('b')).unwrap_or(lower.as_str());
    let split = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let shift = match unit {
        "" => 0,
        "k" => 10,
        "m" => 20,
        "g" => 30,
        "t" => 40,
        _ => return Err(invalid()),
    };
    value.checked_mul(1u64 << shift).ok_or_else(invalid)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
