// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destination for metrics emitted by scripts.

use sbx_core::{Metric, RunId};

/// Accepts metric records, either parsed from directives or recorded
/// directly by a task wrapper.
pub trait MetricSink: Send + Sync {
    fn record(&self, metric: &Metric);
}

/// Emits each metric as an `info` event under the `sbx::metric` target.
#[derive(Debug, Clone)]
pub struct TracingMetricSink {
    run_id: RunId,
}

impl TracingMetricSink {
    pub fn new(run_id: RunId) -> Self {
        Self { run_id }
    }
}

impl MetricSink for TracingMetricSink {
    fn record(&self, metric: &Metric) {
        let tags = metric
            .tags
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        tracing::info!(
            target: "sbx::metric",
            run_id = %self.run_id,
            name = %metric.name,
            value = metric.value,
            kind = %metric.kind,
            tags,
            "metric"
        );
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::MetricSink;
    use parking_lot::Mutex;
    use sbx_core::Metric;
    use std::sync::Arc;

    /// Fake metric sink for testing
    #[derive(Clone, Default)]
    pub struct FakeMetricSink {
        metrics: Arc<Mutex<Vec<Metric>>>,
    }

    impl FakeMetricSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded metrics
        pub fn metrics(&self) -> Vec<Metric> {
            self.metrics.lock().clone()
        }
    }

    impl MetricSink for FakeMetricSink {
        fn record(&self, metric: &Metric) {
            self.metrics.lock().push(metric.clone());
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeMetricSink;
