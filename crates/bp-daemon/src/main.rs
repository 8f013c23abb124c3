// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blueprint Orchestration Daemon (bpd)
//!
//! Background HTTP service owning the Store, the Blueprint Queue, and the
//! startup/ongoing recovery supervisor. Started by hand and otherwise left
//! alone — it listens on `127.0.0.1` for the routes wired in
//! [`routes::build_router`].

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Duration;

use bp_daemon::config::{Config, ConfigError};
use bp_daemon::lifecycle::{self, LifecycleError};
use bp_daemon::state::AppState;
use bp_store::Store;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;
const STARTUP_MARKER_PREFIX: &str = "--- bpd: starting (pid: ";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("bpd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("bpd {}", env!("CARGO_PKG_VERSION"));
                println!("Blueprint Orchestration Daemon - owns the Store, the per-blueprint");
                println!("task queue, and startup/ongoing execution recovery.");
                println!();
                println!("USAGE:");
                println!("    bpd");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: bpd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;

    let lock = match lifecycle::acquire_lock(&config) {
        Ok(lock) => lock,
        Err(LifecycleError::LockFailed(_)) => {
            lifecycle::report_already_running(&config);
            std::process::exit(1);
        }
        Err(err) => {
            write_startup_error(&config, &err);
            return Err(err.into());
        }
    };

    let log_guard = lifecycle::setup_logging(&config.log_path)?;
    info!("starting blueprint orchestration daemon");

    let store = Arc::new(Store::open(&config.db_path)?);
    let token = config.load_or_create_token()?;
    let state = AppState::new(store, config.agent_binary.clone(), config.base_url(), token);

    let outcome = state.recovery.startup_recover()?;
    info!(
        alive = outcome.alive_count,
        silently_completed = outcome.silently_completed_count,
        dead = outcome.dead_count,
        orphaned = outcome.orphaned_queued_nodes.len(),
        "startup recovery complete"
    );
    for node_id in outcome.orphaned_queued_nodes {
        let Some(node) = state.store.get_node(&node_id)? else { continue };
        let blueprint_id = node.blueprint_id.clone();
        let executor = state.executor.clone();
        let bp = blueprint_id.clone();
        let nid = node_id.clone();
        state.queue.enqueue(&blueprint_id, bp_engine::TaskKind::Run, Some(node_id), move || async move {
            if let Err(err) = executor.run(&bp, &nid).await {
                warn!(node_id = %nid, %err, "re-enqueued orphan run failed");
            }
        });
    }

    let monitor_recovery = state.recovery.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(bp_engine::MONITOR_TICK_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if monitor_recovery.is_idle() {
                continue;
            }
            match monitor_recovery.tick() {
                Ok(remaining) if remaining == 0 => info!("background recovery monitor drained"),
                Ok(_) => {}
                Err(err) => error!(%err, "recovery monitor tick failed"),
            }
        }
    });

    let app = bp_daemon::routes::build_router(state);
    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("daemon ready, listening on {addr}");
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
        })
        .await?;

    info!("daemon stopped");
    drop(lock);
    drop(log_guard);
    Ok(())
}

fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn write_startup_marker(config: &Config) -> Result<(), ConfigError> {
    use std::io::Write;
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io { path: parent.to_path_buf(), source })?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .map_err(|source| ConfigError::Io { path: config.log_path.clone(), source })?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())
        .map_err(|source| ConfigError::Io { path: config.log_path.clone(), source })?;
    Ok(())
}

fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;
    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {error}");
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
