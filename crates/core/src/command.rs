// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command specification: what to run, where, and with which files.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from building a [`CommandSpec`] or resolving a path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command list is empty")]
    EmptyCommands,

    #[error("path `{path}` must be relative to the working directory")]
    AbsolutePath { path: String },

    #[error("path `{path}` escapes the working directory")]
    EscapesWorkingDir { path: String },

    #[error("empty file name")]
    EmptyName,
}

/// Where the content of a staged input file comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Literal file content.
    Inline(String),
    /// A file on the host, copied into the working directory.
    File(PathBuf),
}

impl InputSource {
    pub fn inline(content: impl Into<String>) -> Self {
        InputSource::Inline(content.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        InputSource::File(path.into())
    }
}

/// A file (or glob pattern) to collect from the working directory after the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputDecl {
    pub pattern: String,
    /// A required output that was not produced fails the run with a staging error.
    #[serde(default)]
    pub required: bool,
}

impl OutputDecl {
    pub fn optional(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), required: false }
    }

    pub fn required(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), required: true }
    }

    /// True when the pattern contains glob metacharacters.
    pub fn is_glob(&self) -> bool {
        self.pattern.contains(['*', '?', '['])
    }
}

/// Immutable description of one command execution.
///
/// Built with [`CommandSpec::builder`]; the only validation performed is
/// non-empty commands and working-directory containment of every staged
/// or collected path. Runner-specific option compatibility is checked by
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    commands: Vec<String>,
    working_dir: PathBuf,
    env: BTreeMap<String, String>,
    input_files: BTreeMap<String, InputSource>,
    output_files: Vec<OutputDecl>,
}

impl CommandSpec {
    /// Start a specification rooted at `working_dir` with an empty
    /// environment and no staged files.
    pub fn builder(working_dir: impl Into<PathBuf>) -> CommandSpecBuilder {
        CommandSpecBuilder {
            commands: Vec::new(),
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
            input_files: BTreeMap::new(),
            output_files: Vec::new(),
        }
    }

    /// Argv-style command list (never empty).
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn program(&self) -> &str {
        // build() guarantees at least one element
        self.commands.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.commands.get(1..).unwrap_or_default()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn input_files(&self) -> &BTreeMap<String, InputSource> {
        &self.input_files
    }

    pub fn output_files(&self) -> &[OutputDecl] {
        &self.output_files
    }

    /// Resolve a logical file name to an absolute path inside the working directory.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, CommandError> {
        resolve_within(&self.working_dir, name)
    }

    /// Derive a builder from this spec, e.g. to layer task values over runner defaults.
    pub fn to_builder(&self) -> CommandSpecBuilder {
        CommandSpecBuilder {
            commands: self.commands.clone(),
            working_dir: self.working_dir.clone(),
            env: self.env.clone(),
            input_files: self.input_files.clone(),
            output_files: self.output_files.clone(),
        }
    }
}

/// Builder for [`CommandSpec`]. Later calls override earlier values for the
/// same environment key or input file name.
#[derive(Debug, Clone)]
pub struct CommandSpecBuilder {
    commands: Vec<String>,
    working_dir: PathBuf,
    env: BTreeMap<String, String>,
    input_files: BTreeMap<String, InputSource>,
    output_files: Vec<OutputDecl>,
}

impl CommandSpecBuilder {
    /// Replace the command list.
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Merge environment variables; keys already present are overwritten.
    pub fn with_environment<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env.extend(env.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_input_files<I, K>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = (K, InputSource)>,
        K: Into<String>,
    {
        self.input_files.extend(files.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn with_input_file(mut self, name: impl Into<String>, source: InputSource) -> Self {
        self.input_files.insert(name.into(), source);
        self
    }

    pub fn with_output_files<I>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = OutputDecl>,
    {
        for decl in outputs {
            self = self.with_output(decl);
        }
        self
    }

    /// Declare an output; re-declaring a pattern keeps the stricter `required` flag.
    pub fn with_output(mut self, decl: OutputDecl) -> Self {
        match self.output_files.iter_mut().find(|d| d.pattern == decl.pattern) {
            Some(existing) => existing.required |= decl.required,
            None => self.output_files.push(decl),
        }
        self
    }

    pub fn build(self) -> Result<CommandSpec, CommandError> {
        if self.commands.is_empty() {
            return Err(CommandError::EmptyCommands);
        }
        for name in self.input_files.keys() {
            resolve_within(&self.working_dir, name)?;
        }
        for decl in &self.output_files {
            resolve_within(&self.working_dir, &decl.pattern)?;
        }
        Ok(CommandSpec {
            commands: self.commands,
            working_dir: self.working_dir,
            env: self.env,
            input_files: self.input_files,
            output_files: self.output_files,
        })
    }
}

/// Lexically resolve `name` against `base`, rejecting absolute paths and
/// any `..` that would climb above `base`.
///
/// Purely lexical: symlinks are not inspected here. Output collection
/// checks the real location of every file it copies.
pub fn resolve_within(base: &Path, name: &str) -> Result<PathBuf, CommandError> {
    if name.trim().is_empty() {
        return Err(CommandError::EmptyName);
    }
    let mut depth = 0usize;
    let mut resolved = base.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(CommandError::EscapesWorkingDir { path: name.to_string() });
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(CommandError::AbsolutePath { path: name.to_string() });
            }
        }
    }
    if depth == 0 {
        return Err(CommandError::EscapesWorkingDir { path: name.to_string() });
    }
    Ok(resolved)
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
