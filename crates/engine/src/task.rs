// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task facade: what a workflow task hands over, and how it becomes a run.
//!
//! A [`ScriptTask`] is declarative (script lines, files, runner choice). A
//! [`RunContext`] carries the host-side collaborators for one run. Running
//! the task allocates a working directory, renders placeholders, builds the
//! [`CommandSpec`], picks the runner and drives the execution.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sbx_adapters::{
    ContainerClient, FileStore, LogSink, MetricSink, TemplateRenderer, TracingLogSink, VarsRenderer,
};
use sbx_core::{CommandSpec, InputSource, OutputDecl, RunId, RunResult, ScriptCommands};

use crate::driver::{self, RunOptions};
use crate::error::RunError;
use crate::log_consumer::LogConsumer;
use crate::runner::{ContainerOptions, ContainerRunner, ProcessRunner, Runner, RunnerKind};
use crate::workdir::WorkingDir;

/// Environment variable exposing the working directory to the command.
pub const WORKING_DIR_ENV: &str = "WORKING_DIR";

/// One script execution as a workflow task declares it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptTask {
    pub script: ScriptCommands,
    pub runner: RunnerKind,
    /// Task environment; wins over the context's base environment.
    pub env: BTreeMap<String, String>,
    pub input_files: BTreeMap<String, InputSource>,
    pub output_files: Vec<OutputDecl>,
    pub warning_on_stderr: bool,
    pub timeout: Option<Duration>,
    /// Only valid with [`RunnerKind::Container`].
    pub container: Option<ContainerOptions>,
    /// Image the task wrapper prefers when the container options name none.
    pub default_image: Option<String>,
    pub keep_working_dir: bool,
}

impl ScriptTask {
    pub fn new(script: ScriptCommands) -> Self {
        Self {
            script,
            runner: RunnerKind::Process,
            env: BTreeMap::new(),
            input_files: BTreeMap::new(),
            output_files: Vec::new(),
            warning_on_stderr: true,
            timeout: None,
            container: None,
            default_image: None,
            keep_working_dir: false,
        }
    }

    sbx_core::setters! {
        set {
            runner: RunnerKind,
            warning_on_stderr: bool,
            keep_working_dir: bool,
        }
        option {
            timeout: Duration,
            container: ContainerOptions,
            default_image: String,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn input_file(mut self, name: impl Into<String>, source: InputSource) -> Self {
        self.input_files.insert(name.into(), source);
        self
    }

    pub fn output(mut self, decl: OutputDecl) -> Self {
        self.output_files.push(decl);
        self
    }

    /// Cross-check runner selection against runner-specific options.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.container.is_some() && self.runner != RunnerKind::Container {
            return Err(RunError::Configuration(format!(
                "container options are only valid with the container runner (runner is `{}`)",
                self.runner
            )));
        }
        if self.script.commands.iter().all(|c| c.trim().is_empty()) {
            return Err(RunError::Configuration("no commands to run".to_string()));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(RunError::Configuration("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }

    fn select_runner(&self, ctx: &RunContext) -> Result<Box<dyn Runner>, RunError> {
        match self.runner {
            RunnerKind::Process => Ok(Box::new(ProcessRunner::new())),
            RunnerKind::Container => {
                let client = ctx.container_client.clone().ok_or_else(|| {
                    RunError::Configuration("the container runner needs a container client".to_string())
                })?;
                let mut options = self.container.clone().unwrap_or_default();
                if options.image.is_none() {
                    options.image = self.default_image.clone().or_else(|| ctx.default_image.clone());
                }
                Ok(Box::new(ContainerRunner::new(client, options)))
            }
        }
    }

    fn render_script(&self, ctx: &RunContext, vars: &BTreeMap<String, String>) -> Result<ScriptCommands, RunError> {
        let render_all = |lines: &[String]| -> Result<Vec<String>, RunError> {
            lines.iter().map(|line| ctx.renderer.render(line, vars).map_err(RunError::from)).collect()
        };
        let mut script = self.script.clone();
        script.before_commands = render_all(&self.script.before_commands)?;
        script.commands = render_all(&self.script.commands)?;
        Ok(script)
    }

    /// Execute the task within `ctx`.
    ///
    /// The working directory is removed afterwards unless
    /// `keep_working_dir` is set.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunResult, RunError> {
        self.validate()?;
        let runner = self.select_runner(ctx)?;
        let workdir = WorkingDir::create(ctx.work_root.as_deref(), &ctx.run_id, self.keep_working_dir)?;
        let execution_dir = runner.execution_dir(workdir.path());

        let mut vars = ctx.vars.clone();
        vars.insert("workingDir".to_string(), execution_dir.clone());
        vars.insert("runId".to_string(), ctx.run_id.to_string());

        let argv = self.render_script(ctx, &vars)?.to_argv();
        let mut env = ctx.base_env.clone();
        env.insert(WORKING_DIR_ENV.to_string(), execution_dir);
        for (key, value) in &self.env {
            env.insert(key.clone(), ctx.renderer.render(value, &vars)?);
        }

        let spec = CommandSpec::builder(workdir.path())
            .with_commands(argv)
            .with_environment(env)
            .with_input_files(self.input_files.clone())
            .with_output_files(self.output_files.clone())
            .build()?;

        let mut consumer = LogConsumer::new(Arc::clone(&ctx.log_sink));
        if let Some(sink) = &ctx.metric_sink {
            consumer = consumer.with_metric_sink(Arc::clone(sink));
        }
        let options = RunOptions {
            timeout: self.timeout,
            warning_on_stderr: self.warning_on_stderr,
            drain_grace: ctx.drain_grace,
        };

        let outcome = driver::execute(
            runner.as_ref(),
            &ctx.run_id,
            &spec,
            Arc::new(consumer),
            ctx.file_store.as_ref(),
            &options,
        )
        .await;
        if workdir.is_kept() {
            tracing::info!(run_id = %ctx.run_id, path = %workdir.path().display(), "kept working directory");
        }
        outcome
    }
}

/// Host-side collaborators and defaults for one run.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: RunId,
    /// Parent of the working directory; the system temp dir when unset.
    pub work_root: Option<PathBuf>,
    pub renderer: Arc<dyn TemplateRenderer>,
    /// Extra template variables (`workingDir` and `runId` are always set).
    pub vars: BTreeMap<String, String>,
    pub log_sink: Arc<dyn LogSink>,
    pub metric_sink: Option<Arc<dyn MetricSink>>,
    pub file_store: Arc<dyn FileStore>,
    pub container_client: Option<Arc<dyn ContainerClient>>,
    /// Configured default image, the last image fallback.
    pub default_image: Option<String>,
    /// Environment applied before the task's own.
    pub base_env: BTreeMap<String, String>,
    pub drain_grace: Duration,
}

impl RunContext {
    /// Context with tracing sinks, a lenient renderer and no container client.
    pub fn new(run_id: RunId, file_store: Arc<dyn FileStore>) -> Self {
        Self {
            log_sink: Arc::new(TracingLogSink::new(run_id.clone())),
            run_id,
            work_root: None,
            renderer: Arc::new(VarsRenderer::new()),
            vars: BTreeMap::new(),
            metric_sink: None,
            file_store,
            container_client: None,
            default_image: None,
            base_env: BTreeMap::new(),
            drain_grace: crate::env::drain_grace(),
        }
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    pub fn with_metric_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.metric_sink = Some(sink);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_container_client(mut self, client: Arc<dyn ContainerClient>) -> Self {
        self.container_client = Some(client);
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_base_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.base_env = env;
        self
    }

    sbx_core::setters! {
        set {
            drain_grace: Duration,
        }
        option {
            work_root: PathBuf,
            default_image: String,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
