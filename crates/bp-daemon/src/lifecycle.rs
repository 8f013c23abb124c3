// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance lock acquisition, PID/version bookkeeping, and the
//! logging stack (§4A), grounded on the teacher's `daemon::lifecycle`
//! module — here simplified to one `fs2` advisory file lock since the
//! Store (not a WAL/snapshot pair) is this service's durability layer.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Holds the lock file open for the daemon's lifetime; dropping this
/// releases the advisory lock.
pub struct LockGuard {
    #[allow(dead_code)]
    file: File,
}

/// Acquires the single-instance lock, writing this process's PID into it
/// only once the lock is held (never truncate before locking — that would
/// wipe a running daemon's PID out from under it).
pub fn acquire_lock(config: &Config) -> Result<LockGuard, LifecycleError> {
    let file = OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    Ok(LockGuard { file })
}

/// Prints the "already running" message the teacher's `ojd` prints on a
/// failed lock acquisition: the PID and version of the incumbent daemon,
/// read straight from the files it maintains.
pub fn report_already_running(config: &Config) {
    let pid = std::fs::read_to_string(&config.lock_path).unwrap_or_default().trim().to_string();
    let version = std::fs::read_to_string(&config.version_path).unwrap_or_default().trim().to_string();

    eprintln!("bpd is already running");
    if !pid.is_empty() {
        eprintln!("  pid: {pid}");
    }
    if !version.is_empty() {
        let current = env!("CARGO_PKG_VERSION");
        if version == current {
            eprintln!("  version: {version}");
        } else {
            eprintln!("  version: {version} (outdated — current: {current})");
        }
    }
}

/// Sets up the non-blocking rolling file logger, `RUST_LOG`-compatible
/// (default `info`), exactly the teacher's `setup_logging` stack.
pub fn setup_logging(log_path: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("daemon.log"));
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
