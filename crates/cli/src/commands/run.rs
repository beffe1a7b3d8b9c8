// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sbx run`: execute a script or command list and report the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use sbx_adapters::{
    DockerClient, FanoutLogSink, LocalFileStore, LogSink, ResourceLimits, RunLogSink, TracingLogSink,
    TracingMetricSink,
};
use sbx_core::{InputSource, OutputDecl, RunId, RunResult, RunState, ScriptCommands};
use sbx_engine::{env, parse_byte_size, Config, ContainerOptions, PullPolicy, RunContext, RunError, RunnerKind, ScriptTask};

use super::parse_key_val;
use crate::exit_error::{codes, ExitError};
use crate::output::{self, ConsoleLogSink, OutputFormat};

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Execution backend
    #[arg(long)]
    pub runner: Option<RunnerKind>,

    /// Container image (container runner)
    #[arg(long)]
    pub image: Option<String>,

    /// When to pull the image: always, if-not-present, never
    #[arg(long, value_name = "POLICY")]
    pub pull_policy: Option<PullPolicy>,

    /// CPU limit, fractional
    #[arg(long)]
    pub cpus: Option<f64>,

    /// Memory limit, e.g. 512m
    #[arg(long, value_name = "SIZE")]
    pub memory: Option<String>,

    /// Target platform, e.g. linux/amd64
    #[arg(long, value_name = "OS/ARCH")]
    pub platform: Option<String>,

    /// Container network mode, e.g. none
    #[arg(long = "network", value_name = "MODE")]
    pub network_mode: Option<String>,

    /// Environment variable for the command
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,

    /// Template variable for `{{ name }}` placeholders
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// Host file staged into the working directory
    #[arg(long = "input", value_name = "NAME=PATH", value_parser = parse_key_val)]
    pub inputs: Vec<(String, String)>,

    /// Optional output file or glob, collected after the run
    #[arg(long = "output", value_name = "PATTERN")]
    pub outputs: Vec<String>,

    /// Output file or glob that must be produced
    #[arg(long = "require-output", value_name = "PATTERN")]
    pub required_outputs: Vec<String>,

    /// Kill the command after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not turn stderr output into a warning
    #[arg(long)]
    pub no_warning_on_stderr: bool,

    /// Treat COMMANDS as argv instead of script lines
    #[arg(long)]
    pub argv: bool,

    /// Keep the working directory after the run
    #[arg(long = "keep-workdir")]
    pub keep_workdir: bool,

    /// Write a per-run log file and a daily rolling sbx log here
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Do not echo script output; forward it to the tracing log instead
    #[arg(short, long)]
    pub quiet: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Script lines, or argv with --argv
    #[arg(last = true, required = true, value_name = "COMMANDS")]
    pub commands: Vec<String>,
}

impl RunArgs {
    fn has_container_flags(&self) -> bool {
        self.image.is_some()
            || self.pull_policy.is_some()
            || self.cpus.is_some()
            || self.memory.is_some()
            || self.platform.is_some()
            || self.network_mode.is_some()
    }
}

pub async fn handle(args: RunArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let (config, _) = Config::load(config_path).map_err(|e| ExitError::configuration(e.to_string()))?;
    let task = build_task(&args, &config)?;
    task.validate().map_err(|e| ExitError::new(ExitError::code_for(e.kind()), e.to_string()))?;

    let run_id = RunId::new();
    let ctx = build_context(&args, &config, &task, run_id.clone())?;
    tracing::info!(run_id = %run_id, runner = %task.runner, "starting run");

    let outcome = task.run(&ctx).await;
    finish(outcome, args.format)
}

/// Merge flags over the config file into a task.
pub fn build_task(args: &RunArgs, config: &Config) -> Result<ScriptTask, ExitError> {
    let script = if args.argv {
        ScriptCommands::argv(args.commands.iter().cloned())
    } else {
        let script = ScriptCommands::shell(args.commands.iter().cloned()).fail_fast(config.defaults.fail_fast);
        match &config.defaults.interpreter {
            Some(interpreter) => script.interpreter(interpreter.clone()),
            None => script,
        }
    };

    let runner = args.runner.unwrap_or_default();
    let mut task = ScriptTask::new(script)
        .runner(runner)
        .warning_on_stderr(config.defaults.warning_on_stderr && !args.no_warning_on_stderr)
        .keep_working_dir(config.defaults.keep_working_dir || args.keep_workdir);

    if let Some(timeout) = args.timeout.map(Duration::from_secs).or_else(|| config.timeout()) {
        task = task.timeout(timeout);
    }
    for (key, value) in &args.env {
        task = task.env(key, value);
    }
    for (name, path) in &args.inputs {
        task = task.input_file(name.clone(), InputSource::file(path));
    }
    for pattern in &args.outputs {
        task = task.output(OutputDecl::optional(pattern));
    }
    for pattern in &args.required_outputs {
        task = task.output(OutputDecl::required(pattern));
    }
    if runner == RunnerKind::Container || args.has_container_flags() {
        task = task.container(container_options(args, config)?);
    }
    Ok(task)
}

fn container_options(args: &RunArgs, config: &Config) -> Result<ContainerOptions, ExitError> {
    let mut options = config.container_options().map_err(|e| ExitError::configuration(e.to_string()))?;
    let memory_bytes = match &args.memory {
        Some(size) => Some(parse_byte_size(size).map_err(|e| ExitError::configuration(e.to_string()))?),
        None => options.limits.memory_bytes,
    };
    if let Some(cpus) = args.cpus {
        if !(cpus.is_finite() && cpus > 0.0) {
            return Err(ExitError::configuration(format!("--cpus must be positive, got {cpus}")));
        }
    }
    options.limits = ResourceLimits { cpus: args.cpus.or(options.limits.cpus), memory_bytes };
    options.image = args.image.clone();
    if let Some(policy) = args.pull_policy {
        options.pull_policy = policy;
    }
    options.platform = args.platform.clone().or(options.platform);
    options.network_mode = args.network_mode.clone().or(options.network_mode);
    Ok(options)
}

fn build_context(args: &RunArgs, config: &Config, task: &ScriptTask, run_id: RunId) -> Result<RunContext, ExitError> {
    let store = LocalFileStore::new(env::store_dir());
    let mut ctx = RunContext::new(run_id.clone(), Arc::new(store))
        .with_log_sink(log_sink(args, &run_id))
        .with_metric_sink(Arc::new(TracingMetricSink::new(run_id)))
        .with_base_env(config.defaults.env.clone());
    for (key, value) in &args.vars {
        ctx = ctx.with_var(key, value);
    }
    if let Some(root) = config.work_root() {
        ctx = ctx.work_root(root);
    }
    if let Some(image) = config.image() {
        ctx = ctx.default_image(image);
    }
    if task.runner == RunnerKind::Container {
        let client = DockerClient::connect(config.docker_socket().as_deref())
            .map_err(|e| ExitError::new(codes::INFRASTRUCTURE, e.to_string()))?;
        ctx = ctx.with_container_client(Arc::new(client));
    }
    Ok(ctx)
}

fn log_sink(args: &RunArgs, run_id: &RunId) -> Arc<dyn LogSink> {
    let mut sinks = FanoutLogSink::new();
    sinks = if args.quiet {
        sinks.with(Arc::new(TracingLogSink::new(run_id.clone())))
    } else {
        sinks.with(Arc::new(ConsoleLogSink::new(args.format)))
    };
    if let Some(dir) = &args.log_dir {
        sinks = sinks.with(Arc::new(RunLogSink::new(dir, run_id.clone())));
    }
    Arc::new(sinks)
}

/// Print the report and map the outcome onto the process exit code.
fn finish(outcome: Result<RunResult, RunError>, format: OutputFormat) -> anyhow::Result<()> {
    match outcome {
        Ok(result) => {
            match format {
                OutputFormat::Text => eprintln!("{}", output::result_text(&result)),
                OutputFormat::Json => println!("{}", output::result_json(&result)?),
            }
            if result.run_state() == RunState::Failed {
                return Err(ExitError::silent(ExitError::code_for_exit(result.exit_code())).into());
            }
            Ok(())
        }
        Err(err) => {
            match format {
                OutputFormat::Text => {
                    if let Some(result) = err.result() {
                        eprintln!("{}", output::result_text(result));
                    }
                }
                OutputFormat::Json => println!("{}", output::error_json(&err)?),
            }
            Err(ExitError::new(ExitError::code_for(err.kind()), err.to_string()).into())
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
