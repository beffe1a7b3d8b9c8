// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time destination for forwarded script output.

use std::sync::Arc;

use sbx_core::{LogLevel, RunId, Stream};

/// Accepts forwarded lines as they are produced.
///
/// Called from both stream readers concurrently; implementations must not
/// block for long and must never fail the run.
pub trait LogSink: Send + Sync {
    fn log(&self, stream: Stream, level: LogLevel, message: &str);
}

/// Emits script output as `tracing` events under the `sbx::script` target.
#[derive(Debug, Clone)]
pub struct TracingLogSink {
    run_id: RunId,
}

impl TracingLogSink {
    pub fn new(run_id: RunId) -> Self {
        Self { run_id }
    }
}

impl LogSink for TracingLogSink {
    fn log(&self, stream: Stream, level: LogLevel, message: &str) {
        let run_id = self.run_id.as_str();
        match level {
            LogLevel::Trace => {
                tracing::trace!(target: "sbx::script", run_id, %stream, "{message}")
            }
            LogLevel::Debug => {
                tracing::debug!(target: "sbx::script", run_id, %stream, "{message}")
            }
            LogLevel::Info => tracing::info!(target: "sbx::script", run_id, %stream, "{message}"),
            LogLevel::Warn => tracing::warn!(target: "sbx::script", run_id, %stream, "{message}"),
            LogLevel::Error => {
                tracing::error!(target: "sbx::script", run_id, %stream, "{message}")
            }
        }
    }
}

/// Forwards every record to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutLogSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for FanoutLogSink {
    fn log(&self, stream: Stream, level: LogLevel, message: &str) {
        for sink in &self.sinks {
            sink.log(stream, level, message);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::LogSink;
    use parking_lot::Mutex;
    use sbx_core::{LogLevel, Stream};
    use std::sync::Arc;

    /// Recorded log record
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LogRecord {
        pub stream: Stream,
        pub level: LogLevel,
        pub message: String,
    }

    /// Fake log sink for testing
    #[derive(Clone, Default)]
    pub struct FakeLogSink {
        records: Arc<Mutex<Vec<LogRecord>>>,
    }

    impl FakeLogSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded lines
        pub fn records(&self) -> Vec<LogRecord> {
            self.records.lock().clone()
        }

        /// Messages forwarded from one stream, in order
        pub fn messages(&self, stream: Stream) -> Vec<String> {
            self.records
                .lock()
                .iter()
                .filter(|r| r.stream == stream)
                .map(|r| r.message.clone())
                .collect()
        }
    }

    impl LogSink for FakeLogSink {
        fn log(&self, stream: Stream, level: LogLevel, message: &str) {
            self.records.lock().push(LogRecord { stream, level, message: message.to_string() });
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLogSink, LogRecord};

#[cfg(test)]
#[path = "log_sink_tests.rs"]
mod tests;
