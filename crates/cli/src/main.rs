// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet`: a thin CLI/debug driver over [`fleet_orchestrator`].
//!
//! Loads configuration, starts an orchestrator against a crunch's control
//! channel, waits for the initial membership snapshot, and either prints
//! the live worker set (`status`) or fans a single call out to it
//! (`call`). Not a production supervisor — for local inspection and
//! scripted smoke-checks against a running control plane.

mod color;
mod exit_error;
mod output;

use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use fleet_core::{Argument, Variant};
use fleet_orchestrator::{Config, InvocationResult, Orchestrator};
use output::OutputFormat;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "fleet", version, about = "Debug driver for a fleet orchestrator", styles = color::styles())]
struct Cli {
    /// Path to a TOML config file (falls through to defaults + FLEET_* env vars).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// How long to wait for the initial membership snapshot before giving up.
    #[arg(long, global = true, default_value_t = 5)]
    wait_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current live worker set.
    Status,
    /// Fan a call out to every live worker and print per-worker outcomes.
    Call {
        method: String,
        /// Positional string argument, repeatable.
        #[arg(long = "arg")]
        args: Vec<String>,
    },
}

#[derive(Serialize)]
struct WorkerRow {
    worker_id: String,
    host: String,
    port: u16,
    consecutive_failures: u32,
    consecutive_timeouts: u32,
}

#[derive(Serialize)]
struct InvocationRow {
    worker_id: String,
    status: &'static str,
    result: Option<String>,
    error: Option<String>,
    exec_time_us: u64,
}

fn invocation_row(worker_id: &fleet_core::WorkerId, result: &InvocationResult) -> InvocationRow {
    InvocationRow {
        worker_id: worker_id.as_str().to_string(),
        status: match result.status {
            fleet_orchestrator::CallStatus::Success => "SUCCESS",
            fleet_orchestrator::CallStatus::Failed => "FAILED",
            fleet_orchestrator::CallStatus::Timeout => "TIMEOUT",
        },
        result: result.result.as_ref().map(|v| format!("{v:?}")),
        error: result.error.clone(),
        exec_time_us: result.exec_time_us,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        let code = err.downcast_ref::<ExitError>().map(|e| e.code).unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(cli.config.as_deref())
        .map_err(|e| ExitError::new(2, format!("failed to load config: {e}")))?;

    let mut orchestrator = Orchestrator::new(&config);
    let cluster = orchestrator.cluster().clone();
    tokio::spawn(async move { orchestrator.run().await });

    wait_for_first_snapshot(&cluster, Duration::from_secs(cli.wait_secs)).await;

    match cli.command {
        Command::Status => {
            let rows: Vec<WorkerRow> = cluster
                .snapshot()
                .iter()
                .map(|h| WorkerRow {
                    worker_id: h.id.as_str().to_string(),
                    host: h.host.clone(),
                    port: h.port,
                    consecutive_failures: h.consecutive_failures(),
                    consecutive_timeouts: h.consecutive_timeouts(),
                })
                .collect();
            output::handle_list(cli.output, &rows, "no live workers", |rows, out| {
                for row in rows {
                    let _ = writeln!(
                        out,
                        "{}  {}:{}  failures={} timeouts={}",
                        color::header(&row.worker_id),
                        row.host,
                        row.port,
                        row.consecutive_failures,
                        row.consecutive_timeouts
                    );
                }
            })?;
        }
        Command::Call { method, args } => {
            let policy = fleet_orchestrator::FanoutPolicy {
                per_call_timeout: config.timeout,
                max_consecutive_failures: config.max_consecutive_failures,
                max_consecutive_timeouts: config.max_consecutive_timeouts,
                max_consecutive_timeouts_for_skip: config.max_consecutive_timeouts_for_skip,
            };
            let executor = fleet_orchestrator::FanoutExecutor::new(cluster.clone(), policy);
            let call_args: Vec<Argument> =
                args.into_iter().map(|a| Argument::positional(Variant::String(a))).collect();
            let results = executor.call(&method, &call_args).await;
            executor.enforce_thresholds(&results).await;

            let rows: Vec<InvocationRow> =
                results.iter().map(|(id, result)| invocation_row(id, result)).collect();
            output::handle_list(cli.output, &rows, "no workers to call", |rows, out| {
                for row in rows {
                    let detail = row.error.as_deref().or(row.result.as_deref()).unwrap_or("-");
                    let _ = writeln!(
                        out,
                        "{}  {}  {}us  {}",
                        color::header(&row.worker_id),
                        row.status,
                        row.exec_time_us,
                        detail
                    );
                }
            })?;
        }
    }

    Ok(())
}

/// The control channel's first `init` is delivered asynchronously; give it
/// a little room before a `status`/`call` runs against an empty cluster.
async fn wait_for_first_snapshot(cluster: &fleet_orchestrator::ClusterState, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while cluster.is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
