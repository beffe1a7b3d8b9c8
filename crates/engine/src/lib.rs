// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sbx-engine: runs a command specification and produces a result.

pub mod config;
pub mod driver;
pub mod env;
pub mod error;
pub mod log_consumer;
pub mod runner;
pub mod staging;
pub mod task;
pub mod workdir;

pub use config::{parse_byte_size, Config, ConfigError, ContainerSection, Defaults};
pub use driver::{execute, RunOptions};
pub use error::{ErrorKind, RunError, StagingError};
pub use log_consumer::{LineAssembler, LogConsumer};
pub use runner::{
    ContainerOptions, ContainerRunner, Execution, ProcessRunner, PullPolicy, Runner, RunnerKind,
    DEFAULT_MOUNT_PATH,
};
pub use staging::{collect_outputs, stage_inputs, Collected};
pub use task::{RunContext, ScriptTask, WORKING_DIR_ENV};
pub use workdir::WorkingDir;
