// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sbx: run scripts in a process or container and report the result.

mod color;
mod commands;
mod exit_error;
mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::commands::{check_config, run};
use crate::exit_error::ExitError;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "sbx", version = VERSION, about, styles = color::styles())]
struct Cli {
    /// Config file (default: $SBX_CONFIG, then <config dir>/sbx/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script or command list
    Run(run::RunArgs),
    /// Validate the config file and show effective settings
    CheckConfig(check_config::CheckConfigArgs),
}

fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(sbx_engine::env::log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false).compact();

    match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "sbx.log"));
            let file = fmt::layer().with_writer(writer).with_ansi(false);
            let _ = tracing_subscriber::registry().with(filter).with(stderr).with(file).try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry().with(filter).with(stderr).try_init();
            None
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => run::handle(args, config).await,
        Commands::CheckConfig(args) => check_config::handle(args, config),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_dir = match &cli.command {
        Commands::Run(args) => args.log_dir.clone(),
        Commands::CheckConfig(_) => None,
    };
    let guard = init_tracing(log_dir.as_deref());

    let code = match dispatch(cli).await {
        Ok(()) => exit_error::codes::SUCCESS,
        Err(e) => match e.downcast_ref::<ExitError>() {
            Some(exit) => {
                if !exit.message.is_empty() {
                    eprintln!("error: {}", exit.message);
                }
                exit.code
            }
            None => {
                eprintln!("error: {e:#}");
                exit_error::codes::FAILURE
            }
        },
    };
    drop(guard);
    std::process::exit(code);
}
