// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sbx check-config`: validate the configuration and show effective values.

use std::path::{Path, PathBuf};

use clap::Args;
use sbx_engine::{env, Config};
use serde::Serialize;

use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Args, Debug, Clone, Default)]
pub struct CheckConfigArgs {
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// Settings after environment overrides are applied.
#[derive(Debug, Serialize)]
pub struct Effective {
    pub source: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub image: Option<String>,
    pub docker_socket: Option<String>,
    pub work_root: Option<PathBuf>,
    pub store_dir: PathBuf,
    pub drain_grace_ms: u64,
    pub memory_bytes: Option<u64>,
}

pub fn effective(config: &Config, source: Option<PathBuf>) -> Result<Effective, ExitError> {
    Ok(Effective {
        source,
        timeout_ms: config.timeout().map(|t| t.as_millis() as u64),
        image: config.image(),
        docker_socket: config.docker_socket(),
        work_root: config.work_root(),
        store_dir: env::store_dir(),
        drain_grace_ms: env::drain_grace().as_millis() as u64,
        memory_bytes: config.memory_bytes().map_err(|e| ExitError::configuration(e.to_string()))?,
    })
}

pub fn handle(args: CheckConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let (config, source) = Config::load(config_path).map_err(|e| ExitError::configuration(e.to_string()))?;
    let effective = effective(&config, source)?;

    match args.format {
        OutputFormat::Json => {
            let doc = serde_json::json!({ "config": config, "effective": effective });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            match &effective.source {
                Some(path) => println!("config: {} (ok)", path.display()),
                None => println!("config: none found, using defaults"),
            }
            println!("{}", render_text(&effective));
        }
    }
    Ok(())
}

fn render_text(effective: &Effective) -> String {
    let or_unset = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    [
        ("timeout", or_unset(effective.timeout_ms.map(|ms| format!("{ms}ms")))),
        ("image", or_unset(effective.image.clone())),
        ("docker socket", or_unset(effective.docker_socket.clone())),
        ("work root", or_unset(effective.work_root.as_ref().map(|p| p.display().to_string()))),
        ("store dir", effective.store_dir.display().to_string()),
        ("drain grace", format!("{}ms", effective.drain_grace_ms)),
        ("memory limit", or_unset(effective.memory_bytes.map(|b| b.to_string()))),
    ]
    .iter()
    .map(|(label, value)| format!("  {label:<14}{value}"))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
#[path = "check_config_tests.rs"]
mod tests;
