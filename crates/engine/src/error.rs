// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run failure classification.

use std::time::Duration;

use sbx_adapters::{ContainerError, RenderError, StoreError};
use sbx_core::{CommandError, LogStats, RunResult};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors from materializing inputs or collecting outputs.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("failed to create working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("invalid file name `{name}`: {source}")]
    InvalidPath {
        name: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to stage input `{name}`: {source}")]
    Input {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect output `{name}`: {source}")]
    Output {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid output pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse failure category, used for exit-code mapping and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Staging,
    Timeout,
    Infrastructure,
}

sbx_core::simple_display! {
    ErrorKind {
        Configuration => "configuration",
        Staging => "staging",
        Timeout => "timeout",
        Infrastructure => "infrastructure",
    }
}

/// Why a run did not produce a plain [`RunResult`].
///
/// A non-zero exit is not an error: it is carried in the result and
/// classified by [`RunResult::final_state`].
#[derive(Debug, Error)]
pub enum RunError {
    /// Invalid or incompatible options; nothing was executed.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("staging error: {0}")]
    Staging(#[from] StagingError),

    /// The command ran to completion but its outputs could not be
    /// collected. The recorded exit code is kept in `result`.
    #[error("failed to collect outputs: {source}")]
    Collection {
        #[source]
        source: StagingError,
        result: Box<RunResult>,
    },

    /// The command ran to completion but mandatory outputs are missing.
    #[error("required output(s) not produced: {}", .missing.join(", "))]
    MissingOutputs { missing: Vec<String>, result: Box<RunResult> },

    /// The command was killed at the deadline. Carries the output
    /// statistics gathered before termination.
    #[error("command timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration, partial: Box<LogStats> },

    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Configuration(_) => ErrorKind::Configuration,
            RunError::Staging(_) | RunError::Collection { .. } | RunError::MissingOutputs { .. } => {
                ErrorKind::Staging
            }
            RunError::Timeout { .. } => ErrorKind::Timeout,
            RunError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// The completed result, when the command itself ran to completion.
    pub fn result(&self) -> Option<&RunResult> {
        match self {
            RunError::Collection { result, .. } | RunError::MissingOutputs { result, .. } => Some(result),
            _ => None,
        }
    }
}

impl From<CommandError> for RunError {
    fn from(e: CommandError) -> Self {
        RunError::Configuration(e.to_string())
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Configuration(e.to_string())
    }
}

impl From<RenderError> for RunError {
    fn from(e: RenderError) -> Self {
        RunError::Configuration(e.to_string())
    }
}

impl From<ContainerError> for RunError {
    fn from(e: ContainerError) -> Self {
        RunError::Infrastructure(e.to_string())
    }
}
