// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turning script lines into an argv command list.

use serde::{Deserialize, Serialize};

/// Interpreter used when a script does not name one.
pub const DEFAULT_INTERPRETER: [&str; 2] = ["/bin/sh", "-c"];

/// Script lines as a task wrapper supplies them.
///
/// With an interpreter the lines are joined into one script argument
/// (`interpreter ++ [script]`); without one the lines are already argv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptCommands {
    #[serde(default = "default_interpreter")]
    pub interpreter: Option<Vec<String>>,
    #[serde(default)]
    pub before_commands: Vec<String>,
    pub commands: Vec<String>,
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
}

fn default_interpreter() -> Option<Vec<String>> {
    Some(DEFAULT_INTERPRETER.iter().map(|s| s.to_string()).collect())
}

fn default_fail_fast() -> bool {
    true
}

impl ScriptCommands {
    /// Script run by the default interpreter with fail-fast enabled.
    pub fn shell<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interpreter: default_interpreter(),
            before_commands: Vec::new(),
            commands: commands.into_iter().map(Into::into).collect(),
            fail_fast: true,
        }
    }

    /// Commands passed through untouched as argv.
    pub fn argv<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interpreter: None,
            before_commands: Vec::new(),
            commands: commands.into_iter().map(Into::into).collect(),
            fail_fast: false,
        }
    }

    crate::setters! {
        set { fail_fast: bool }
        option { interpreter: Vec<String> }
    }

    pub fn with_before_commands<I, S>(mut self, before: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before_commands = before.into_iter().map(Into::into).collect();
        self
    }

    /// The joined script body, or `None` when there is nothing to run.
    pub fn script(&self) -> Option<String> {
        let lines: Vec<&str> = self
            .before_commands
            .iter()
            .chain(&self.commands)
            .map(String::as_str)
            .filter(|l| !l.trim().is_empty())
            .collect();
        if lines.is_empty() {
            return None;
        }
        let mut script = String::new();
        if self.fail_fast {
            script.push_str("set -e\n");
        }
        script.push_str(&lines.join("\n"));
        Some(script)
    }

    /// Produce the argv handed to a runner. Empty when there is nothing to run.
    pub fn to_argv(&self) -> Vec<String> {
        match &self.interpreter {
            Some(interpreter) if !interpreter.is_empty() => match self.script() {
                Some(script) => interpreter.iter().cloned().chain([script]).collect(),
                None => Vec::new(),
            },
            _ => self
                .before_commands
                .iter()
                .chain(&self.commands)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
