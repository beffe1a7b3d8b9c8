// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sbx-core: data model and pure logic for the scriptbox execution core.
//!
//! Nothing in this crate performs I/O. Runners, sinks and staging live in
//! `sbx-adapters` and `sbx-engine`.

pub mod macros;

pub mod command;
pub mod directive;
pub mod id;
pub mod result;
pub mod script;
pub mod stream;

pub use command::{resolve_within, CommandError, CommandSpec, CommandSpecBuilder, InputSource, OutputDecl};
pub use directive::{parse_line, Directive, DirectiveLog, Metric, MetricKind, ParsedLine};
pub use id::{short, RunId};
pub use result::{FinalState, LogStats, RunResult, RunState};
#[cfg(any(test, feature = "test-support"))]
pub use result::RunResultBuilder;
pub use script::{ScriptCommands, DEFAULT_INTERPRETER};
pub use stream::{LogLevel, Stream};
