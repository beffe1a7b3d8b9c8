// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{{ name }}` placeholder rendering for script and command text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Regex pattern for {{ name }} or {{ namespace.name }}
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_-]*)*)\s*\}\}")
        .expect("constant regex pattern is valid")
});

/// Errors from template rendering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("unknown template variable(s): {}", .0.join(", "))]
    UnknownVariables(Vec<String>),
}

/// Resolves placeholders in text before it is executed.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, vars: &BTreeMap<String, String>) -> Result<String, RenderError>;
}

/// Substitutes `{{ name }}` from a flat variable map.
///
/// Unknown names are left as-is unless the renderer is strict, in which
/// case every unknown name is reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarsRenderer {
    strict: bool,
}

impl VarsRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }
}

impl TemplateRenderer for VarsRenderer {
    fn render(&self, template: &str, vars: &BTreeMap<String, String>) -> Result<String, RenderError> {
        let mut unknown = Vec::new();
        let rendered = PLACEHOLDER
            .replace_all(template, |caps: &regex::Captures| match vars.get(&caps[1]) {
                Some(val) => val.clone(),
                None => {
                    if !unknown.iter().any(|name| name == &caps[1]) {
                        unknown.push(caps[1].to_string());
                    }
                    caps[0].to_string()
                }
            })
            .into_owned();

        if self.strict && !unknown.is_empty() {
            return Err(RenderError::UnknownVariables(unknown));
        }
        Ok(rendered)
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
