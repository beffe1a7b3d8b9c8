// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sbx-adapters: collaborators the execution engine talks to.
//!
//! Each collaborator is a trait with one real implementation and, behind the
//! `test-support` feature, a recording fake.

pub mod container;
pub mod file_store;
pub mod log_sink;
pub mod metric_sink;
pub mod run_logger;
pub mod template;

pub use container::{
    normalize_image, ContainerClient, ContainerError, ContainerSpec, DockerClient, LogChunk,
    Mount, ResourceLimits,
};
pub use file_store::{FileStore, LocalFileStore, StoreError, StoredFile};
pub use log_sink::{FanoutLogSink, LogSink, TracingLogSink};
pub use metric_sink::{MetricSink, TracingMetricSink};
pub use run_logger::RunLogSink;
pub use template::{RenderError, TemplateRenderer, VarsRenderer};

#[cfg(any(test, feature = "test-support"))]
pub use container::{ContainerCall, FakeBehavior, FakeContainerClient};
#[cfg(any(test, feature = "test-support"))]
pub use log_sink::{FakeLogSink, LogRecord};
#[cfg(any(test, feature = "test-support"))]
pub use metric_sink::FakeMetricSink;
