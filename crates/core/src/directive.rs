// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `::{json}::` output/metric directive embedded in script output.
//!
//! A directive is a JSON object wrapped in `::` markers:
//!
//! ```text
//! ::{"outputs":{"key":"value"},"metrics":[{"name":"n","value":1,"tags":{}}]}::
//! ```
//!
//! Parsing is a pure per-line function. Lines whose payload does not parse
//! are plain text; nothing here returns an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stream::LogLevel;

const START: &str = "::{";
const END: &str = "}::";

/// Kind of a metric record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    #[default]
    Counter,
    /// Value is a duration in seconds.
    Timer,
}

crate::simple_display! {
    MetricKind {
        Counter => "counter",
        Timer => "timer",
    }
}

/// One metric emitted by a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    #[serde(default, rename = "type")]
    pub kind: MetricKind,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Metric {
    pub fn counter(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), value, kind: MetricKind::Counter, tags: BTreeMap::new() }
    }

    pub fn timer(name: impl Into<String>, seconds: f64) -> Self {
        Self { name: name.into(), value: seconds, kind: MetricKind::Timer, tags: BTreeMap::new() }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// A log record a script asked to have emitted at a given level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveLog {
    pub level: LogLevel,
    pub message: String,
}

/// Structured content of one directive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directive {
    pub outputs: BTreeMap<String, String>,
    pub metrics: Vec<Metric>,
    pub logs: Vec<DirectiveLog>,
}

impl Directive {
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.metrics.is_empty() && self.logs.is_empty()
    }
}

/// A line that carried a directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub directive: Directive,
    /// Free text outside the directive span, if any.
    pub text: Option<String>,
}

#[derive(Deserialize)]
struct RawDirective {
    #[serde(default)]
    outputs: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    metrics: Option<Vec<RawMetric>>,
    #[serde(default)]
    logs: Option<Vec<RawLog>>,
}

#[derive(Deserialize)]
struct RawMetric {
    name: String,
    value: f64,
    #[serde(default, rename = "type")]
    kind: MetricKind,
    #[serde(default)]
    tags: Option<serde_json::Map<String, Value>>,
}

#[derive(Deserialize)]
struct RawLog {
    #[serde(default)]
    level: Option<String>,
    message: String,
}

/// Scan one line for a directive.
///
/// The span runs from the first `::{` to the last `}::`. Returns `None`
/// when the line has no span or the span is not a valid directive object.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let start = line.find(START)?;
    let end = line.rfind(END)?;
    // '{' sits at start + 2 and '}' at end
    if end < start + 3 {
        return None;
    }
    let payload = &line[start + 2..=end];
    let raw: RawDirective = serde_json::from_str(payload).ok()?;

    let directive = Directive {
        outputs: raw
            .outputs
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, value_text(v)))
            .collect(),
        metrics: raw
            .metrics
            .unwrap_or_default()
            .into_iter()
            .map(|m| Metric {
                name: m.name,
                value: m.value,
                kind: m.kind,
                tags: m
                    .tags
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, v)| (k, value_text(v)))
                    .collect(),
            })
            .collect(),
        logs: raw
            .logs
            .unwrap_or_default()
            .into_iter()
            .map(|l| DirectiveLog {
                level: l.level.as_deref().and_then(LogLevel::parse).unwrap_or(LogLevel::Info),
                message: l.message,
            })
            .collect(),
    };

    Some(ParsedLine { directive, text: remainder(&line[..start], &line[end + END.len()..]) })
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn remainder(before: &str, after: &str) -> Option<String> {
    let before = before.trim();
    let after = after.trim();
    match (before.is_empty(), after.is_empty()) {
        (true, true) => None,
        (false, true) => Some(before.to_string()),
        (true, false) => Some(after.to_string()),
        (false, false) => Some(format!("{before} {after}")),
    }
}

#[cfg(test)]
#[path = "directive_tests.rs"]
mod tests;
