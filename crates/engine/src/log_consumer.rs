// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented consumer of a running command's output.
//!
//! Counts lines per stream, forwards each line to the log sink, and
//! accumulates outputs and metrics from `::{json}::` directives.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sbx_adapters::{LogSink, MetricSink};
use sbx_core::{parse_line, LogStats, Metric, Stream};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Default)]
struct SideTable {
    outputs: BTreeMap<String, String>,
    metrics: Vec<Metric>,
}

/// Per-run consumer shared by the stdout and stderr readers.
///
/// Counters are per-stream atomics; only the outputs/metrics side table
/// sits behind a lock.
pub struct LogConsumer {
    std_out_count: AtomicU64,
    std_err_count: AtomicU64,
    side: Mutex<SideTable>,
    log_sink: Arc<dyn LogSink>,
    metric_sink: Option<Arc<dyn MetricSink>>,
}

impl LogConsumer {
    pub fn new(log_sink: Arc<dyn LogSink>) -> Self {
        Self {
            std_out_count: AtomicU64::new(0),
            std_err_count: AtomicU64::new(0),
            side: Mutex::new(SideTable::default()),
            log_sink,
            metric_sink: None,
        }
    }

    pub fn with_metric_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.metric_sink = Some(sink);
        self
    }

    fn counter(&self, stream: Stream) -> &AtomicU64 {
        match stream {
            Stream::StdOut => &self.std_out_count,
            Stream::StdErr => &self.std_err_count,
        }
    }

    /// Handle one complete line (without its terminator).
    pub fn accept_line(&self, stream: Stream, line: &str) {
        self.counter(stream).fetch_add(1, Ordering::Relaxed);

        let Some(parsed) = parse_line(line) else {
            self.log_sink.log(stream, stream.default_level(), line);
            return;
        };

        if let Some(text) = &parsed.text {
            self.log_sink.log(stream, stream.default_level(), text);
        }
        let directive = parsed.directive;
        for entry in &directive.logs {
            self.log_sink.log(stream, entry.level, &entry.message);
        }
        if let Some(sink) = &self.metric_sink {
            for metric in &directive.metrics {
                sink.record(metric);
            }
        }
        if directive.outputs.is_empty() && directive.metrics.is_empty() {
            return;
        }
        let mut side = self.side.lock();
        side.outputs.extend(directive.outputs);
        side.metrics.extend(directive.metrics);
    }

    /// Handle one raw line. A trailing `\n` or `\r\n` is stripped and
    /// invalid UTF-8 is replaced.
    pub fn accept_bytes(&self, stream: Stream, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        self.accept_line(stream, &String::from_utf8_lossy(raw));
    }

    /// Read `reader` to the end, one line at a time. A final line without a
    /// terminator is still delivered.
    pub async fn consume<R>(&self, stream: Stream, reader: R) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }
            self.accept_bytes(stream, &buf);
        }
    }

    pub fn std_out_count(&self) -> u64 {
        self.std_out_count.load(Ordering::Relaxed)
    }

    pub fn std_err_count(&self) -> u64 {
        self.std_err_count.load(Ordering::Relaxed)
    }

    /// Snapshot of counters and accumulators.
    pub fn stats(&self) -> LogStats {
        let side = self.side.lock();
        LogStats {
            std_out_line_count: self.std_out_count(),
            std_err_line_count: self.std_err_count(),
            outputs: side.outputs.clone(),
            metrics: side.metrics.clone(),
        }
    }
}

/// Reassembles lines from frames that split them at arbitrary points.
#[derive(Debug, Default)]
pub struct LineAssembler {
    partial: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a frame; returns every line it completes, terminators included.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut rest = bytes;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (line, tail) = rest.split_at(pos + 1);
            self.partial.extend_from_slice(line);
            lines.push(std::mem::take(&mut self.partial));
            rest = tail;
        }
        self.partial.extend_from_slice(rest);
        lines
    }

    /// Flush the unterminated remainder, if any.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.partial.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.partial))
        }
    }
}

#[cfg(test)]
#[path = "log_consumer_tests.rs"]
mod tests;
